use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Where to fetch weather for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Coordinates { latitude: f64, longitude: f64 },
    Place(String),
}

impl Location {
    /// Parse `"lat,lon"` as coordinates, anything else as a place name.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if let Some((lat, lon)) = trimmed.split_once(',') {
            if let (Ok(latitude), Ok(longitude)) = (lat.trim().parse(), lon.trim().parse()) {
                return Location::Coordinates { latitude, longitude };
            }
        }
        Location::Place(trimmed.to_string())
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Coordinates { latitude, longitude } => write!(f, "{latitude},{longitude}"),
            Location::Place(name) => f.write_str(name),
        }
    }
}

/// One point-in-time reading, normalized to °C, km/h, hPa, mm and %.
///
/// Numeric fields are optional because providers omit them freely; the
/// aggregators also treat non-finite values as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Sample time in the location's local offset; grouping uses its date.
    pub time: DateTime<FixedOffset>,
    pub temperature_c: Option<f64>,
    /// Lowest temperature covered by the sample, when the provider reports one.
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub wind_speed_kph: Option<f64>,
    /// Strongest wind covered by the sample, for daily summaries.
    pub wind_max_kph: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub condition: Condition,
    /// Chance of precipitation, 0-100.
    pub precipitation_chance_pct: Option<f64>,
    /// Measured or expected precipitation depth.
    pub precipitation_mm: Option<f64>,
    pub description: String,
}

impl Observation {
    pub fn new(time: DateTime<FixedOffset>, condition: Condition) -> Self {
        Self {
            time,
            temperature_c: None,
            temp_min_c: None,
            temp_max_c: None,
            humidity_pct: None,
            wind_speed_kph: None,
            wind_max_kph: None,
            pressure_hpa: None,
            condition,
            precipitation_chance_pct: None,
            precipitation_mm: None,
            description: String::new(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.time.date_naive()
    }

    /// Temperature standing in for the whole sample: the reading itself, or
    /// the midpoint of min/max for daily summaries.
    pub fn representative_temp(&self) -> Option<f64> {
        finite(self.temperature_c).or_else(|| {
            match (finite(self.temp_min_c), finite(self.temp_max_c)) {
                (Some(lo), Some(hi)) => Some((lo + hi) / 2.0),
                (lo, hi) => lo.or(hi),
            }
        })
    }

    /// Highest temperature this sample contributes to a daily high.
    pub fn high_temp(&self) -> Option<f64> {
        finite(self.temp_max_c).or_else(|| finite(self.temperature_c))
    }

    /// Lowest temperature this sample contributes to a daily low.
    pub fn low_temp(&self) -> Option<f64> {
        finite(self.temp_min_c).or_else(|| finite(self.temperature_c))
    }

    /// Strongest wind this sample contributes to a period maximum.
    pub fn peak_wind(&self) -> Option<f64> {
        finite(self.wind_max_kph).or_else(|| finite(self.wind_speed_kph))
    }
}

/// Drop missing and non-finite values in one place.
pub(crate) fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Daily roll-up of observations sharing a calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    /// Short weekday name, e.g. "Sat".
    pub label: String,
    pub date: NaiveDate,
    pub high_c: f64,
    pub low_c: f64,
    pub condition: Condition,
    pub description: String,
    /// Highest chance of precipitation seen during the day.
    pub precipitation_chance_pct: f64,
    /// Total precipitation over the day's samples.
    pub precipitation_mm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TemperatureStats {
    pub avg_c: f64,
    pub min_c: f64,
    pub max_c: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PrecipitationStats {
    pub total_mm: f64,
    pub days_with_rain: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HumidityStats {
    pub avg_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindStats {
    pub avg_kph: f64,
    pub max_kph: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Inclusive number of calendar days, zero for an inverted range.
    pub fn days(&self) -> u32 {
        let span = (self.end - self.start).num_days() + 1;
        u32::try_from(span).unwrap_or(0)
    }
}

/// Roll-up over a requested date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStatistics {
    pub temperature: TemperatureStats,
    pub precipitation: PrecipitationStats,
    pub humidity: HumidityStats,
    pub wind: WindStats,
    pub period: Period,
    pub predominant_condition: Condition,
    /// Observations inside the period that fed the statistics.
    pub samples: usize,
}

/// Snapshot of the weather right now at a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub provider: String,
    pub location_name: String,
    pub observation_time: DateTime<FixedOffset>,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_kph: f64,
    pub pressure_hpa: f64,
    pub visibility_km: Option<f64>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub condition: Condition,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn location_parses_coordinates() {
        assert_eq!(
            Location::parse("14.5995, 120.9842"),
            Location::Coordinates { latitude: 14.5995, longitude: 120.9842 }
        );
    }

    #[test]
    fn location_falls_back_to_place() {
        assert_eq!(Location::parse(" Manila "), Location::Place("Manila".into()));
        assert_eq!(
            Location::parse("Springfield, IL"),
            Location::Place("Springfield, IL".into())
        );
    }

    #[test]
    fn date_uses_local_offset() {
        // 23:30 local on the 1st is already the 2nd in UTC.
        let obs = Observation::new(at("2024-06-01T23:30:00-05:00"), Condition::Sunny);
        assert_eq!(obs.date(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn representative_temp_prefers_reading_then_midpoint() {
        let mut obs = Observation::new(at("2024-06-01T12:00:00Z"), Condition::Sunny);
        obs.temp_min_c = Some(10.0);
        obs.temp_max_c = Some(20.0);
        assert_eq!(obs.representative_temp(), Some(15.0));

        obs.temperature_c = Some(18.0);
        assert_eq!(obs.representative_temp(), Some(18.0));

        obs.temperature_c = Some(f64::NAN);
        assert_eq!(obs.representative_temp(), Some(15.0));
    }

    #[test]
    fn high_low_fall_back_to_reading() {
        let mut obs = Observation::new(at("2024-06-01T12:00:00Z"), Condition::Sunny);
        obs.temperature_c = Some(21.0);
        assert_eq!(obs.high_temp(), Some(21.0));
        assert_eq!(obs.low_temp(), Some(21.0));

        obs.temp_max_c = Some(f64::INFINITY);
        assert_eq!(obs.high_temp(), Some(21.0));
    }

    #[test]
    fn period_days_is_inclusive() {
        let p = Period::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
        );
        assert_eq!(p.days(), 7);
        assert!(p.contains(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()));
        assert!(!p.contains(NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()));

        let inverted = Period::new(p.end, p.start);
        assert_eq!(inverted.days(), 0);
    }
}
