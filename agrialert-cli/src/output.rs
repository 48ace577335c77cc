//! Plain-text rendering for terminal output.

use std::fmt::{self, Write};

use agrialert_core::{Alert, CurrentConditions, ForecastDay, Observation, PeriodStatistics};

pub fn current(c: &CurrentConditions) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let offset = c.observation_time.offset();
    let observed = c.observation_time.format("%Y-%m-%d %H:%M");

    writeln!(out, "{} ({}), {observed}", c.location_name, c.provider)?;
    writeln!(out, "  {} - {}", c.condition, c.description)?;
    writeln!(
        out,
        "  Temperature  {:.0}°C (feels like {:.0}°C)",
        c.temperature_c, c.feels_like_c
    )?;
    writeln!(out, "  Humidity     {:.0}%", c.humidity_pct)?;
    writeln!(out, "  Wind         {:.0} km/h", c.wind_speed_kph)?;
    writeln!(out, "  Pressure     {:.0} hPa", c.pressure_hpa)?;
    if let Some(km) = c.visibility_km {
        writeln!(out, "  Visibility   {km:.0} km")?;
    }
    if let (Some(rise), Some(set)) = (c.sunrise, c.sunset) {
        writeln!(
            out,
            "  Sun          {} / {}",
            rise.with_timezone(offset).format("%H:%M"),
            set.with_timezone(offset).format("%H:%M"),
        )?;
    }

    Ok(out)
}

/// One row per day; shared by forecast and history output.
pub fn forecast(days: &[ForecastDay]) -> Result<String, fmt::Error> {
    if days.is_empty() {
        return Ok("No data for the requested days.\n".to_string());
    }

    let mut out = String::new();
    for d in days {
        writeln!(
            out,
            "{} {}  {:>3.0}°C / {:>3.0}°C  {:<7} {:>3.0}% {:>5.1} mm  {}",
            d.label,
            d.date,
            d.high_c,
            d.low_c,
            d.condition,
            d.precipitation_chance_pct,
            d.precipitation_mm,
            d.description,
        )?;
    }
    Ok(out)
}

pub fn hourly(samples: &[Observation]) -> Result<String, fmt::Error> {
    if samples.is_empty() {
        return Ok("No upcoming forecast samples.\n".to_string());
    }

    let mut out = String::new();
    for o in samples {
        let temp = o
            .representative_temp()
            .map(|t| format!("{t:.0}°C"))
            .unwrap_or_else(|| "--".to_string());
        let chance = o
            .precipitation_chance_pct
            .map(|p| format!("{p:.0}%"))
            .unwrap_or_else(|| "--".to_string());
        writeln!(
            out,
            "{}  {:>5}  {:<7} {:>4}  {}",
            o.time.format("%a %H:%M"),
            temp,
            o.condition,
            chance,
            o.description,
        )?;
    }
    Ok(out)
}

pub fn statistics(s: &PeriodStatistics) -> Result<String, fmt::Error> {
    let mut out = String::new();

    writeln!(out, "{} to {} ({} samples)", s.period.start, s.period.end, s.samples)?;
    if s.samples == 0 {
        writeln!(out, "  No observations in this period.")?;
        return Ok(out);
    }
    writeln!(
        out,
        "  Temperature  avg {:.0}°C, min {:.0}°C, max {:.0}°C",
        s.temperature.avg_c, s.temperature.min_c, s.temperature.max_c
    )?;
    writeln!(
        out,
        "  Rain         {:.1} mm over {} day(s)",
        s.precipitation.total_mm, s.precipitation.days_with_rain
    )?;
    writeln!(out, "  Humidity     avg {:.0}%", s.humidity.avg_pct)?;
    writeln!(
        out,
        "  Wind         avg {:.0} km/h, max {:.0} km/h",
        s.wind.avg_kph, s.wind.max_kph
    )?;
    writeln!(out, "  Mostly       {}", s.predominant_condition)?;

    Ok(out)
}

pub fn alerts(alerts: &[Alert]) -> Result<String, fmt::Error> {
    if alerts.is_empty() {
        return Ok("No alerts. Conditions look fine for your crops.\n".to_string());
    }

    let mut out = String::new();
    for a in alerts {
        writeln!(out, "[{}] {}", a.level.to_string().to_uppercase(), a.title)?;
        writeln!(out, "  {}", a.description)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrialert_core::{AlertLevel, Condition, Period, period_statistics};
    use chrono::NaiveDate;

    #[test]
    fn empty_statistics_say_so() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let stats = period_statistics(&[], start, end);
        assert_eq!(stats.period, Period::new(start, end));

        let text = statistics(&stats).unwrap();
        assert!(text.starts_with("2024-01-01 to 2024-01-07 (0 samples)"));
        assert!(text.contains("No observations"));
    }

    #[test]
    fn forecast_rows_are_rounded() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let day = ForecastDay {
            label: "Sat".into(),
            date,
            high_c: 26.4,
            low_c: 21.6,
            condition: Condition::Rainy,
            description: "light rain".into(),
            precipitation_chance_pct: 70.0,
            precipitation_mm: 2.5,
        };

        let text = forecast(&[day]).unwrap();
        assert!(text.starts_with("Sat 2024-06-01"));
        assert!(text.contains(" 26°C /  22°C"));
        assert!(text.contains("rainy  "));
        assert!(text.contains("70%"));
    }

    #[test]
    fn alerts_show_level() {
        let text = alerts(&[Alert {
            title: "Strong Wind Alert".into(),
            description: "Secure structures.".into(),
            level: AlertLevel::Emergency,
        }])
        .unwrap();
        assert!(text.starts_with("[EMERGENCY] Strong Wind Alert"));
        assert!(alerts(&[]).unwrap().starts_with("No alerts"));
    }
}
