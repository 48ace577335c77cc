//! Fetch-then-aggregate operations over a single provider.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, instrument};

use crate::{
    Config,
    aggregate::{daily_forecast, hourly_outlook, period_statistics},
    alert::{Alert, AlertThresholds, evaluate_alerts},
    error::FetchError,
    model::{CurrentConditions, ForecastDay, Location, Observation, Period, PeriodStatistics},
    provider::{ProviderId, WeatherProvider, default_provider_from_config, provider_from_config},
    retry::RetryPolicy,
};

/// A provider plus the caller-side policy around it: retries, forecast
/// horizon, alert thresholds.
#[derive(Debug)]
pub struct WeatherService {
    provider: Box<dyn WeatherProvider>,
    retry: RetryPolicy,
    forecast_days: u32,
    thresholds: AlertThresholds,
}

impl WeatherService {
    pub fn new(provider: Box<dyn WeatherProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            forecast_days: 5,
            thresholds: AlertThresholds::default(),
        }
    }

    /// Build from config, using `provider` or the configured default.
    pub fn from_config(config: &Config, provider: Option<ProviderId>) -> anyhow::Result<Self> {
        let provider = match provider {
            Some(id) => provider_from_config(id, config)?,
            None => default_provider_from_config(config)?,
        };

        Ok(Self {
            provider,
            retry: config.fetch.retry,
            forecast_days: config.fetch.forecast_days,
            thresholds: config.alerts,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_forecast_days(mut self, days: u32) -> Self {
        self.forecast_days = days;
        self
    }

    pub fn provider_id(&self) -> ProviderId {
        self.provider.id()
    }

    pub fn forecast_days(&self) -> u32 {
        self.forecast_days
    }

    pub async fn current(&self, location: &Location) -> Result<CurrentConditions, FetchError> {
        self.retry.run(|| self.provider.current(location)).await
    }

    async fn forecast_samples(
        &self,
        location: &Location,
        days: u32,
    ) -> Result<Vec<Observation>, FetchError> {
        self.retry.run(|| self.provider.forecast(location, days)).await
    }

    /// Up to `days` daily summaries starting today.
    #[instrument(skip(self), fields(provider = %self.provider.id()))]
    pub async fn daily_forecast(
        &self,
        location: &Location,
        days: u32,
    ) -> Result<Vec<ForecastDay>, FetchError> {
        let samples = self.forecast_samples(location, days).await?;
        let days = daily_forecast(&samples, days as usize);
        info!(days = days.len(), "forecast ready");
        Ok(days)
    }

    /// The next `count` forecast samples from now on.
    pub async fn hourly(
        &self,
        location: &Location,
        count: usize,
    ) -> Result<Vec<Observation>, FetchError> {
        self.hourly_from(location, count, Utc::now()).await
    }

    /// The first `count` forecast samples at or after `now`.
    pub async fn hourly_from(
        &self,
        location: &Location,
        count: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Observation>, FetchError> {
        // Today is partly in the past, so ask for one extra day.
        let days = u32::try_from(count.div_ceil(24) + 1).unwrap_or(u32::MAX);
        let samples = self.forecast_samples(location, days).await?;
        Ok(hourly_outlook(&samples, now, count))
    }

    async fn history_samples(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>, FetchError> {
        self.retry.run(|| self.provider.history(location, start, end)).await
    }

    /// Day-by-day look-back over the inclusive range.
    #[instrument(skip(self), fields(provider = %self.provider.id()))]
    pub async fn history(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ForecastDay>, FetchError> {
        let samples = self.history_samples(location, start, end).await?;
        let period = Period::new(start, end);
        let in_range: Vec<Observation> =
            samples.into_iter().filter(|o| period.contains(o.date())).collect();
        Ok(daily_forecast(&in_range, period.days() as usize))
    }

    #[instrument(skip(self), fields(provider = %self.provider.id()))]
    pub async fn statistics(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PeriodStatistics, FetchError> {
        let samples = self.history_samples(location, start, end).await?;
        let stats = period_statistics(&samples, start, end);
        info!(samples = stats.samples, "statistics ready");
        Ok(stats)
    }

    /// Current conditions and the configured forecast horizon, run through the alert rules.
    #[instrument(skip(self), fields(provider = %self.provider.id()))]
    pub async fn alerts(&self, location: &Location) -> Result<Vec<Alert>, FetchError> {
        let current = self.current(location).await?;
        let forecast = self.daily_forecast(location, self.forecast_days).await?;
        let alerts = evaluate_alerts(&current, &forecast, &self.thresholds);
        info!(alerts = alerts.len(), "alert rules evaluated");
        Ok(alerts)
    }
}
