use anyhow::Result;
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    condition::Condition,
    error::FetchError,
    model::{CurrentConditions, Location, Observation},
    provider::{ProviderId, ProviderSettings, get_json, unix_to_local, unix_to_utc},
};

use super::WeatherProvider;

const PROVIDER: &str = "weatherapi";
const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";
const MAX_FORECAST_DAYS: u32 = 14;

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        Ok(Self {
            http: settings.http_client()?,
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            api_key: settings.api_key,
        })
    }

    fn query(&self, location: &Location) -> Vec<(&'static str, String)> {
        vec![("key", self.api_key.clone()), ("q", location.to_string())]
    }

    /// One `history.json` call covers exactly one calendar day.
    async fn history_day(
        &self,
        location: &Location,
        day: NaiveDate,
    ) -> Result<Vec<Observation>, FetchError> {
        let url = format!("{}/history.json", self.base_url);
        let mut query = self.query(location);
        query.push(("dt", day.format("%Y-%m-%d").to_string()));

        let parsed: WaForecastResponse =
            get_json(&self.http, PROVIDER, "history", &url, &query).await?;

        let offset = local_offset(&parsed.location);
        let observations = parsed
            .forecast
            .forecastday
            .iter()
            .flat_map(|d| day_observations(d, offset))
            .collect::<Vec<_>>();

        if observations.is_empty() {
            warn!(%day, "WeatherAPI history returned no data for day");
        }

        Ok(observations)
    }
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
    localtime_epoch: Option<i64>,
    /// Local wall-clock time, e.g. "2024-06-01 13:05".
    localtime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: f64,
    wind_kph: f64,
    pressure_mb: f64,
    vis_km: Option<f64>,
    condition: WaCondition,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

#[derive(Debug, Deserialize)]
struct WaForecastHour {
    time_epoch: i64,
    temp_c: f64,
    humidity: f64,
    wind_kph: f64,
    pressure_mb: Option<f64>,
    precip_mm: Option<f64>,
    chance_of_rain: Option<f64>,
    chance_of_snow: Option<f64>,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaDaySummary {
    maxtemp_c: f64,
    mintemp_c: f64,
    avgtemp_c: Option<f64>,
    maxwind_kph: Option<f64>,
    totalprecip_mm: Option<f64>,
    avghumidity: Option<f64>,
    daily_chance_of_rain: Option<f64>,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: NaiveDate,
    day: WaDaySummary,
    #[serde(default)]
    hour: Vec<WaForecastHour>,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    location: WaLocation,
    forecast: WaForecast,
}

/// The payload only carries local wall-clock time next to an epoch; their
/// difference, rounded to a quarter hour, is the location's UTC offset.
fn local_offset(location: &WaLocation) -> FixedOffset {
    let local = location
        .localtime
        .as_deref()
        .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").ok());
    let utc = location.localtime_epoch.and_then(unix_to_utc);

    match (local, utc) {
        (Some(local), Some(utc)) => {
            let secs = (local - utc.naive_utc()).num_seconds();
            let rounded = (secs + 450).div_euclid(900) * 900;
            i32::try_from(rounded)
                .ok()
                .and_then(FixedOffset::east_opt)
                .unwrap_or_else(|| Utc.fix())
        }
        _ => Utc.fix(),
    }
}

fn hour_observation(hour: &WaForecastHour, offset: FixedOffset) -> Option<Observation> {
    let time = unix_to_local(hour.time_epoch, offset)?;

    let chance = match (hour.chance_of_rain, hour.chance_of_snow) {
        (Some(rain), Some(snow)) => Some(rain.max(snow)),
        (rain, snow) => rain.or(snow),
    };

    Some(Observation {
        time,
        temperature_c: Some(hour.temp_c),
        temp_min_c: None,
        temp_max_c: None,
        humidity_pct: Some(hour.humidity),
        wind_speed_kph: Some(hour.wind_kph),
        wind_max_kph: None,
        pressure_hpa: hour.pressure_mb,
        condition: Condition::from_description(&hour.condition.text),
        precipitation_chance_pct: chance,
        precipitation_mm: hour.precip_mm,
        description: hour.condition.text.clone(),
    })
}

/// A day's samples, or a single daily summary when hourly data is missing.
fn day_observations(day: &WaForecastDay, offset: FixedOffset) -> Vec<Observation> {
    if !day.hour.is_empty() {
        return day.hour.iter().filter_map(|h| hour_observation(h, offset)).collect();
    }

    let Some(time) = day
        .date
        .and_hms_opt(12, 0, 0)
        .and_then(|noon| noon.and_local_timezone(offset).single())
    else {
        return Vec::new();
    };

    let summary = &day.day;
    vec![Observation {
        time,
        temperature_c: summary.avgtemp_c,
        temp_min_c: Some(summary.mintemp_c),
        temp_max_c: Some(summary.maxtemp_c),
        humidity_pct: summary.avghumidity,
        wind_speed_kph: None,
        wind_max_kph: summary.maxwind_kph,
        pressure_hpa: None,
        condition: Condition::from_description(&summary.condition.text),
        precipitation_chance_pct: summary.daily_chance_of_rain,
        precipitation_mm: summary.totalprecip_mm,
        description: summary.condition.text.clone(),
    }]
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WeatherApi
    }

    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn current(&self, location: &Location) -> Result<CurrentConditions, FetchError> {
        let url = format!("{}/current.json", self.base_url);
        let parsed: WaResponse =
            get_json(&self.http, PROVIDER, "current", &url, &self.query(location)).await?;

        let offset = local_offset(&parsed.location);
        let ts = parsed.current.last_updated_epoch.or(parsed.location.localtime_epoch);
        let observation_time = ts
            .and_then(|ts| unix_to_local(ts, offset))
            .unwrap_or_else(|| Utc::now().with_timezone(&offset));

        let location_name = format!("{}, {}", parsed.location.name, parsed.location.country);

        Ok(CurrentConditions {
            provider: PROVIDER.to_string(),
            location_name,
            observation_time,
            temperature_c: parsed.current.temp_c,
            feels_like_c: parsed.current.feelslike_c,
            humidity_pct: parsed.current.humidity,
            wind_speed_kph: parsed.current.wind_kph,
            pressure_hpa: parsed.current.pressure_mb,
            visibility_km: parsed.current.vis_km,
            sunrise: None,
            sunset: None,
            condition: Condition::from_description(&parsed.current.condition.text),
            description: parsed.current.condition.text,
        })
    }

    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn forecast(
        &self,
        location: &Location,
        days: u32,
    ) -> Result<Vec<Observation>, FetchError> {
        let days = days.clamp(1, MAX_FORECAST_DAYS);
        let url = format!("{}/forecast.json", self.base_url);
        let mut query = self.query(location);
        query.push(("days", days.to_string()));
        query.push(("aqi", "no".to_string()));
        query.push(("alerts", "no".to_string()));

        let parsed: WaForecastResponse =
            get_json(&self.http, PROVIDER, "forecast", &url, &query).await?;

        if parsed.forecast.forecastday.is_empty() {
            return Err(FetchError::Empty { provider: PROVIDER, what: "forecastday data" });
        }

        let offset = local_offset(&parsed.location);
        let observations: Vec<Observation> = parsed
            .forecast
            .forecastday
            .iter()
            .flat_map(|d| day_observations(d, offset))
            .collect();

        debug!(samples = observations.len(), "WeatherAPI forecast decoded");
        Ok(observations)
    }

    /// Issues one request per calendar day, in order; the first failure aborts.
    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn history(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>, FetchError> {
        let mut observations = Vec::new();

        for day in start.iter_days().take_while(|d| *d <= end) {
            observations.extend(self.history_day(location, day).await?);
        }

        debug!(samples = observations.len(), "WeatherAPI history collected");
        Ok(observations)
    }
}
