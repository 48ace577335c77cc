//! Pure reductions over normalized observations.
//!
//! Nothing here talks to a provider: adapters hand over fully collected
//! [`Observation`](crate::model::Observation) slices and get plain values back.

pub mod daily;
pub mod period;

pub use daily::{daily_forecast, hourly_outlook};
pub use period::period_statistics;

/// Running min/max/sum/count over the finite values pushed into it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunningStat {
    sum: f64,
    count: usize,
    min: f64,
    max: f64,
}

impl Default for RunningStat {
    fn default() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RunningStat {
    /// Missing and non-finite values are skipped.
    pub(crate) fn push(&mut self, value: Option<f64>) {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return;
        };
        self.sum += v;
        self.count += 1;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub(crate) fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub(crate) fn sum(&self) -> f64 {
        self.sum
    }

    pub(crate) fn min(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.min }
    }

    pub(crate) fn max(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stat_reports_zeroes() {
        let stat = RunningStat::default();
        assert!(stat.is_empty());
        assert_eq!(stat.mean(), 0.0);
        assert_eq!(stat.min(), 0.0);
        assert_eq!(stat.max(), 0.0);
        assert_eq!(stat.sum(), 0.0);
    }

    #[test]
    fn skips_missing_and_non_finite() {
        let mut stat = RunningStat::default();
        stat.push(Some(10.0));
        stat.push(None);
        stat.push(Some(f64::NAN));
        stat.push(Some(f64::NEG_INFINITY));
        stat.push(Some(20.0));

        assert_eq!(stat.mean(), 15.0);
        assert_eq!(stat.min(), 10.0);
        assert_eq!(stat.max(), 20.0);
        assert_eq!(stat.sum(), 30.0);
    }
}
