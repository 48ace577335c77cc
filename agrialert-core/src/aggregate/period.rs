use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use super::RunningStat;
use crate::condition::Condition;
use crate::model::{
    HumidityStats, Observation, Period, PeriodStatistics, PrecipitationStats, TemperatureStats,
    WindStats, finite,
};

/// Reduce observations dated within `start..=end` into [`PeriodStatistics`].
///
/// Accepts hourly samples as well as per-day summaries that only carry
/// min/max temperatures. Samples outside the window are ignored. With no
/// samples every figure is zero, the predominant condition is sunny, and the
/// period still echoes the requested bounds.
pub fn period_statistics(
    observations: &[Observation],
    start: NaiveDate,
    end: NaiveDate,
) -> PeriodStatistics {
    let period = Period::new(start, end);

    let mut temp_avg = RunningStat::default();
    let mut temp_range = RunningStat::default();
    let mut humidity = RunningStat::default();
    let mut wind = RunningStat::default();
    let mut wind_peak = RunningStat::default();
    let mut rain_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut tally = [0usize; Condition::ALL.len()];
    let mut samples = 0;

    for obs in observations {
        let date = obs.date();
        if !period.contains(date) {
            debug!(%date, "ignoring observation outside requested period");
            continue;
        }
        samples += 1;

        temp_avg.push(obs.representative_temp());
        temp_range.push(obs.low_temp());
        temp_range.push(obs.high_temp());
        humidity.push(obs.humidity_pct);
        wind.push(obs.wind_speed_kph);
        wind_peak.push(obs.peak_wind());

        if let Some(mm) = finite(obs.precipitation_mm).filter(|mm| *mm >= 0.0) {
            *rain_by_day.entry(date).or_default() += mm;
        }

        tally[obs.condition.index()] += 1;
    }

    let total_mm: f64 = rain_by_day.values().sum();
    let days_with_rain = rain_by_day.values().filter(|mm| **mm > 0.0).count();

    PeriodStatistics {
        temperature: TemperatureStats {
            avg_c: temp_avg.mean(),
            min_c: temp_range.min(),
            max_c: temp_range.max(),
        },
        precipitation: PrecipitationStats {
            total_mm,
            days_with_rain: u32::try_from(days_with_rain).unwrap_or(u32::MAX),
        },
        humidity: HumidityStats { avg_pct: humidity.mean() },
        wind: WindStats {
            avg_kph: wind.mean(),
            max_kph: wind_peak.max(),
        },
        period,
        predominant_condition: predominant(&tally),
        samples,
    }
}

/// Highest count wins; ties go to the earlier [`Condition::ALL`] entry.
fn predominant(tally: &[usize; Condition::ALL.len()]) -> Condition {
    let mut best = Condition::default();
    let mut best_count = 0;
    for (condition, &count) in Condition::ALL.iter().zip(tally) {
        if count > best_count {
            best = *condition;
            best_count = count;
        }
    }
    best
}
