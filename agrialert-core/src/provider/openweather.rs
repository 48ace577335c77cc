use anyhow::Result;
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    condition::Condition,
    error::FetchError,
    model::{CurrentConditions, Location, Observation},
    provider::{ProviderId, ProviderSettings, get_json, unix_to_local, unix_to_utc},
};

use super::WeatherProvider;

const PROVIDER: &str = "openweather";
const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
/// The free forecast endpoint covers five days in 3-hour steps.
const MAX_FORECAST_DAYS: u32 = 5;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        Ok(Self {
            http: settings.http_client()?,
            base_url: settings.base_url_or(DEFAULT_BASE_URL),
            api_key: settings.api_key,
        })
    }

    fn query(&self, location: &Location) -> Vec<(&'static str, String)> {
        let mut query = match location {
            Location::Coordinates { latitude, longitude } => {
                vec![("lat", latitude.to_string()), ("lon", longitude.to_string())]
            }
            Location::Place(name) => vec![("q", name.clone())],
        };
        query.push(("units", "metric".to_string()));
        query.push(("appid", self.api_key.clone()));
        query
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    temp_min: Option<f64>,
    #[serde(default)]
    temp_max: Option<f64>,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: i64,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    /// Metres per second with `units=metric`.
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    #[serde(default)]
    timezone: i32,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    /// Metres.
    visibility: Option<f64>,
    sys: Option<OwSys>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    country: String,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwRain {
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    /// Probability of precipitation, 0..1.
    pop: Option<f64>,
    rain: Option<OwRain>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

fn mps_to_kph(mps: f64) -> f64 {
    mps * 3.6
}

/// Shift from UTC in seconds, as reported by the provider.
fn offset(seconds: i32) -> FixedOffset {
    FixedOffset::east_opt(seconds).unwrap_or_else(|| Utc.fix())
}

fn condition_of(weather: &[OwWeather]) -> (Condition, String) {
    weather
        .first()
        .map(|w| (Condition::from_code(w.id), w.description.clone()))
        .unwrap_or_else(|| (Condition::default(), "Unknown".to_string()))
}

fn to_observation(entry: &OwForecastEntry, offset: FixedOffset) -> Option<Observation> {
    let time = unix_to_local(entry.dt, offset)?;
    let (condition, description) = condition_of(&entry.weather);

    Some(Observation {
        time,
        temperature_c: Some(entry.main.temp),
        temp_min_c: entry.main.temp_min,
        temp_max_c: entry.main.temp_max,
        humidity_pct: Some(entry.main.humidity),
        wind_speed_kph: Some(mps_to_kph(entry.wind.speed)),
        wind_max_kph: None,
        pressure_hpa: Some(entry.main.pressure),
        condition,
        precipitation_chance_pct: entry.pop.map(|p| (p * 100.0).round()),
        precipitation_mm: Some(entry.rain.as_ref().and_then(|r| r.three_hours).unwrap_or(0.0)),
        description,
    })
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn current(&self, location: &Location) -> Result<CurrentConditions, FetchError> {
        let url = format!("{}/weather", self.base_url);
        let parsed: OwCurrentResponse =
            get_json(&self.http, PROVIDER, "weather", &url, &self.query(location)).await?;

        let offset = offset(parsed.timezone);
        let observation_time =
            unix_to_local(parsed.dt, offset).unwrap_or_else(|| Utc::now().with_timezone(&offset));
        let (condition, description) = condition_of(&parsed.weather);
        let sys = parsed.sys.as_ref();

        Ok(CurrentConditions {
            provider: PROVIDER.to_string(),
            location_name: parsed.name,
            observation_time,
            temperature_c: parsed.main.temp,
            feels_like_c: parsed.main.feels_like,
            humidity_pct: parsed.main.humidity,
            wind_speed_kph: mps_to_kph(parsed.wind.speed),
            pressure_hpa: parsed.main.pressure,
            visibility_km: parsed.visibility.map(|m| m / 1000.0),
            sunrise: sys.and_then(|s| s.sunrise).and_then(unix_to_utc),
            sunset: sys.and_then(|s| s.sunset).and_then(unix_to_utc),
            condition,
            description,
        })
    }

    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn forecast(
        &self,
        location: &Location,
        days: u32,
    ) -> Result<Vec<Observation>, FetchError> {
        if days > MAX_FORECAST_DAYS {
            debug!(days, "OpenWeather forecast is limited to {MAX_FORECAST_DAYS} days");
        }

        let url = format!("{}/forecast", self.base_url);
        let parsed: OwForecastResponse =
            get_json(&self.http, PROVIDER, "forecast", &url, &self.query(location)).await?;

        if parsed.list.is_empty() {
            return Err(FetchError::Empty { provider: PROVIDER, what: "forecast data" });
        }

        let offset = offset(parsed.city.timezone);
        let observations: Vec<Observation> =
            parsed.list.iter().filter_map(|e| to_observation(e, offset)).collect();

        debug!(
            city = %format!("{}, {}", parsed.city.name, parsed.city.country),
            samples = observations.len(),
            "OpenWeather forecast decoded"
        );

        Ok(observations)
    }

    async fn history(
        &self,
        _location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>, FetchError> {
        Err(FetchError::Unsupported(format!(
            "Historical weather ({start} .. {end}) is not supported by the free OpenWeather API.\n\
             Only current weather and up to {MAX_FORECAST_DAYS} days of forecast are available."
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::daily_forecast;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CURRENT_FIXTURE: &str = include_str!("../../tests/fixtures/openweather_current.json");
    const FORECAST_FIXTURE: &str = include_str!("../../tests/fixtures/openweather_forecast.json");

    fn provider(server: &MockServer) -> OpenWeatherProvider {
        OpenWeatherProvider::new(ProviderSettings::new("test_key").with_base_url(server.uri()))
            .unwrap()
    }

    fn manila() -> Location {
        Location::Coordinates { latitude: 14.5995, longitude: 120.9842 }
    }

    #[tokio::test]
    async fn current_normalizes_units() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "metric"))
            .and(query_param("lat", "14.5995"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CURRENT_FIXTURE))
            .mount(&server)
            .await;

        let current = provider(&server).current(&manila()).await.unwrap();

        assert_eq!(current.location_name, "Manila");
        assert_eq!(current.temperature_c, 31.2);
        assert_eq!(current.humidity_pct, 70.0);
        assert!((current.wind_speed_kph - 18.0).abs() < 1e-9);
        assert_eq!(current.pressure_hpa, 1008.0);
        assert_eq!(current.visibility_km, Some(10.0));
        assert_eq!(current.condition, Condition::Cloudy);
        assert_eq!(current.description, "broken clouds");
        assert_eq!(current.observation_time.offset().local_minus_utc(), 8 * 3600);
        assert!(current.sunrise.is_some());
    }

    #[tokio::test]
    async fn place_names_use_q_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Manila"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CURRENT_FIXTURE))
            .mount(&server)
            .await;

        let current = provider(&server).current(&Location::Place("Manila".into())).await;
        assert!(current.is_ok());
    }

    #[tokio::test]
    async fn forecast_maps_probability_and_rain() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_FIXTURE))
            .mount(&server)
            .await;

        let obs = provider(&server).forecast(&manila(), 5).await.unwrap();

        assert_eq!(obs.len(), 4);
        assert_eq!(obs[1].precipitation_chance_pct, Some(70.0));
        assert_eq!(obs[1].precipitation_mm, Some(2.5));
        assert_eq!(obs[1].condition, Condition::Rainy);
        assert_eq!(obs[0].precipitation_mm, Some(0.0));
        assert_eq!(obs[3].condition, Condition::Stormy);
        assert!(obs.iter().all(|o| o.time.offset().local_minus_utc() == 8 * 3600));
    }

    #[tokio::test]
    async fn forecast_rolls_up_by_local_day() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FORECAST_FIXTURE))
            .mount(&server)
            .await;

        let obs = provider(&server).forecast(&manila(), 5).await.unwrap();
        let days = daily_forecast(&obs, 5);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(days[0].high_c, 30.0);
        assert_eq!(days[0].low_c, 25.0);
        assert_eq!(days[0].precipitation_chance_pct, 70.0);
    }

    #[tokio::test]
    async fn unauthorized_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"cod":401,"message":"Invalid API key"}"#),
            )
            .mount(&server)
            .await;

        let err = provider(&server).forecast(&manila(), 5).await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status, .. } if status.as_u16() == 401));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[tokio::test]
    async fn malformed_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"name\": 5"))
            .mount(&server)
            .await;

        let err = provider(&server).current(&manila()).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }

    #[tokio::test]
    async fn empty_forecast_list_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "city": {"name": "Manila", "country": "PH", "timezone": 28800},
                "list": []
            })))
            .mount(&server)
            .await;

        let err = provider(&server).forecast(&manila(), 5).await.unwrap_err();
        assert!(matches!(err, FetchError::Empty { .. }));
    }

    #[tokio::test]
    async fn history_is_unsupported() {
        let server = MockServer::start().await;
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let err = provider(&server).history(&manila(), day, day).await.unwrap_err();
        assert!(matches!(err, FetchError::Unsupported(_)));
        assert!(err.to_string().contains("not supported"));
    }
}
