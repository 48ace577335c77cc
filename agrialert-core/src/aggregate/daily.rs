use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use tracing::debug;

use super::RunningStat;
use crate::model::{ForecastDay, Observation, finite};

/// Fold observations into one [`ForecastDay`] per local calendar date.
///
/// Input order does not matter. Days come back in ascending date order,
/// truncated to the first `max_days`. The representative condition is taken
/// from the sample closest to local noon, the earlier one on a tie.
pub fn daily_forecast(observations: &[Observation], max_days: usize) -> Vec<ForecastDay> {
    let mut days: BTreeMap<NaiveDate, DayFold<'_>> = BTreeMap::new();

    for obs in observations {
        days.entry(obs.date()).or_default().add(obs);
    }

    days.into_iter()
        .filter_map(|(date, fold)| {
            let day = fold.finish(date);
            if day.is_none() {
                debug!(%date, "skipping day without a usable temperature");
            }
            day
        })
        .take(max_days)
        .collect()
}

/// The first `count` samples at or after `now`, in time order.
pub fn hourly_outlook(
    observations: &[Observation],
    now: DateTime<Utc>,
    count: usize,
) -> Vec<Observation> {
    let mut upcoming: Vec<Observation> = observations
        .iter()
        .filter(|o| o.time.with_timezone(&Utc) >= now)
        .cloned()
        .collect();
    upcoming.sort_by_key(|o| o.time);
    upcoming.truncate(count);
    upcoming
}

#[derive(Default)]
struct DayFold<'a> {
    high: RunningStat,
    low: RunningStat,
    chance: RunningStat,
    amount: RunningStat,
    representative: Option<&'a Observation>,
}

impl<'a> DayFold<'a> {
    fn add(&mut self, obs: &'a Observation) {
        self.high.push(obs.high_temp());
        self.low.push(obs.low_temp());
        self.chance.push(obs.precipitation_chance_pct);
        // Negative amounts are dropped per sample, matching period statistics.
        self.amount.push(finite(obs.precipitation_mm).filter(|mm| *mm >= 0.0));

        let closer = match self.representative {
            None => true,
            Some(current) => {
                let key = |o: &Observation| (seconds_from_noon(o), o.time);
                key(obs) < key(current)
            }
        };
        if closer {
            self.representative = Some(obs);
        }
    }

    fn finish(self, date: NaiveDate) -> Option<ForecastDay> {
        if self.high.is_empty() || self.low.is_empty() {
            return None;
        }
        let rep = self.representative?;

        // A sample's max can sit below another sample's min only when the
        // provider contradicts itself; never emit high < low.
        let high = self.high.max();
        let low = self.low.min().min(high);

        Some(ForecastDay {
            label: date.format("%a").to_string(),
            date,
            high_c: high,
            low_c: low,
            condition: rep.condition,
            description: rep.description.clone(),
            precipitation_chance_pct: self.chance.max().clamp(0.0, 100.0),
            precipitation_mm: self.amount.sum(),
        })
    }
}

fn seconds_from_noon(obs: &Observation) -> u32 {
    const NOON: u32 = 12 * 60 * 60;
    obs.time.time().num_seconds_from_midnight().abs_diff(NOON)
}
