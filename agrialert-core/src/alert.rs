//! Crop-protection alerts derived from current conditions and the daily forecast.

use serde::{Deserialize, Serialize};

use crate::model::{CurrentConditions, ForecastDay};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Severe,
    Emergency,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Severe => "severe",
            AlertLevel::Emergency => "emergency",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub description: String,
    pub level: AlertLevel,
}

/// Limits above which an alert fires. All comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub heat_c: f64,
    pub rain_chance_pct: f64,
    pub wind_kph: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            heat_c: 35.0,
            rain_chance_pct: 70.0,
            wind_kph: 30.0,
        }
    }
}

/// Evaluate every rule; alerts come back in rule order.
pub fn evaluate_alerts(
    current: &CurrentConditions,
    forecast: &[ForecastDay],
    thresholds: &AlertThresholds,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if current.temperature_c > thresholds.heat_c {
        alerts.push(Alert {
            title: "Extreme Heat Warning".into(),
            description: format!(
                "Current temperature is {:.0}°C. Take measures to protect crops from heat stress.",
                current.temperature_c
            ),
            level: AlertLevel::Severe,
        });
    }

    if let Some(day) = forecast
        .iter()
        .find(|d| d.precipitation_chance_pct > thresholds.rain_chance_pct)
    {
        alerts.push(Alert {
            title: "Heavy Rainfall Expected".into(),
            description: format!(
                "Heavy rainfall expected on {} with {:.0}% probability. Prepare drainage systems.",
                day.label, day.precipitation_chance_pct
            ),
            level: AlertLevel::Warning,
        });
    }

    if current.wind_speed_kph > thresholds.wind_kph {
        alerts.push(Alert {
            title: "Strong Wind Alert".into(),
            description: format!(
                "Current wind speed is {:.0} km/h. Secure structures and protect sensitive crops.",
                current.wind_speed_kph
            ),
            level: AlertLevel::Emergency,
        });
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use chrono::{DateTime, NaiveDate};

    fn current(temp: f64, wind: f64) -> CurrentConditions {
        CurrentConditions {
            provider: "openweather".into(),
            location_name: "Manila".into(),
            observation_time: DateTime::parse_from_rfc3339("2024-06-01T12:00:00+08:00").unwrap(),
            temperature_c: temp,
            feels_like_c: temp,
            humidity_pct: 60.0,
            wind_speed_kph: wind,
            pressure_hpa: 1010.0,
            visibility_km: None,
            sunrise: None,
            sunset: None,
            condition: Condition::Sunny,
            description: "clear sky".into(),
        }
    }

    fn day(d: u32, chance: f64) -> ForecastDay {
        let date = NaiveDate::from_ymd_opt(2024, 6, d).unwrap();
        ForecastDay {
            label: date.format("%a").to_string(),
            date,
            high_c: 30.0,
            low_c: 22.0,
            condition: Condition::Rainy,
            description: "rain".into(),
            precipitation_chance_pct: chance,
            precipitation_mm: 0.0,
        }
    }

    #[test]
    fn calm_weather_raises_nothing() {
        let thresholds = AlertThresholds::default();
        let alerts = evaluate_alerts(&current(30.0, 10.0), &[day(1, 20.0)], &thresholds);
        assert!(alerts.is_empty());
    }

    #[test]
    fn thresholds_are_strict() {
        let thresholds = AlertThresholds::default();
        let alerts = evaluate_alerts(&current(35.0, 30.0), &[day(1, 70.0)], &thresholds);
        assert!(alerts.is_empty());
    }

    #[test]
    fn all_rules_fire_in_order() {
        let forecast = [day(1, 40.0), day(2, 80.0), day(3, 95.0)];
        let alerts = evaluate_alerts(&current(38.4, 45.0), &forecast, &AlertThresholds::default());

        let levels: Vec<_> = alerts.iter().map(|a| a.level).collect();
        assert_eq!(levels, vec![AlertLevel::Severe, AlertLevel::Warning, AlertLevel::Emergency]);
        assert!(alerts[0].description.contains("38°C"));
        // first qualifying day, 2024-06-02 is a Sunday
        assert!(alerts[1].description.contains("Sun with 80%"));
        assert!(alerts[2].description.contains("45 km/h"));
    }

    #[test]
    fn custom_thresholds() {
        let thresholds = AlertThresholds { heat_c: 25.0, ..AlertThresholds::default() };
        let alerts = evaluate_alerts(&current(28.0, 0.0), &[], &thresholds);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].title, "Extreme Heat Warning");
    }
}
