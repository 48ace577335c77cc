use crate::{
    Config, CurrentConditions, Location, Observation,
    error::{FetchError, truncate_body},
    provider::{openweather::OpenWeatherProvider, weatherapi::WeatherApiProvider},
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::{convert::TryFrom, fmt::Debug, time::Duration};
use tracing::debug;

pub mod openweather;
pub mod weatherapi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    WeatherApi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::WeatherApi => "weatherapi",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::WeatherApi]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, weatherapi."
            )),
        }
    }
}

/// Everything an adapter needs, handed over at construction time.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    /// Overrides the provider's public endpoint, e.g. for a proxy or a mock server.
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl ProviderSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub(crate) fn http_client(&self) -> anyhow::Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))
    }

    pub(crate) fn base_url_or(&self, default: &str) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}

/// A weather source normalized to canonical [`Observation`]s.
///
/// Adapters own all provider quirks (field names, units, time zones); the
/// aggregators never see provider-specific data.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn current(&self, location: &Location) -> Result<CurrentConditions, FetchError>;

    /// Forward-looking samples covering roughly `days` days.
    async fn forecast(&self, location: &Location, days: u32)
    -> Result<Vec<Observation>, FetchError>;

    /// Past samples for the inclusive date range.
    async fn history(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>, FetchError>;
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let settings = config.provider_settings(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `agrialert configure {id}` and enter your API key."
        )
    })?;

    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::OpenWeather => Box::new(OpenWeatherProvider::new(settings)?),
        ProviderId::WeatherApi => Box::new(WeatherApiProvider::new(settings)?),
    };

    Ok(boxed)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config)
}

/// GET `url` and decode the JSON body, mapping every failure to a [`FetchError`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &Client,
    provider: &'static str,
    endpoint: &'static str,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, FetchError> {
    debug!(provider, endpoint, url, "sending request");

    let res = http
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|source| FetchError::Network { provider, source })?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|source| FetchError::Network { provider, source })?;

    if !status.is_success() {
        return Err(FetchError::Status {
            provider,
            endpoint,
            status,
            body: truncate_body(&body),
        });
    }

    serde_json::from_str(&body).map_err(|source| FetchError::Parse {
        provider,
        endpoint,
        source,
    })
}

pub(crate) fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

pub(crate) fn unix_to_local(ts: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    unix_to_utc(ts).map(|utc| utc.with_timezone(&offset))
}
