//! Token throughput estimate over time-bucketed observations.

use std::collections::VecDeque;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// Default bucket width in milliseconds.
pub const DEFAULT_ROUND_MS: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bucket {
    at: DateTime<Utc>,
    count: u64,
}

/// Estimates a rate (units per second) from timestamped increments.
///
/// Observations are truncated to a multiple of `round`. An observation that
/// lands in (or before) the newest bucket is merged into it, so bucket
/// timestamps stay strictly increasing even when events arrive out of order.
#[derive(Debug, Clone)]
pub struct RateMeter {
    buckets: VecDeque<Bucket>,
    round: TimeDelta,
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new(TimeDelta::milliseconds(DEFAULT_ROUND_MS))
    }
}

impl RateMeter {
    pub fn new(round: TimeDelta) -> Self {
        Self {
            buckets: VecDeque::new(),
            round,
        }
    }

    /// Records one unit at `at`.
    pub fn observe(&mut self, at: DateTime<Utc>) {
        self.observe_n(at, 1);
    }

    /// Records `amount` units at `at`.
    pub fn observe_n(&mut self, at: DateTime<Utc>, amount: u64) {
        let at = self.truncate(at);
        if let Some(last) = self.buckets.back_mut() {
            if at <= last.at {
                last.count += amount;
                return;
            }
        }
        self.buckets.push_back(Bucket { at, count: amount });
    }

    /// Units per second between the first and last bucket; 0 with fewer than two buckets.
    pub fn rate(&self) -> f64 {
        let (Some(first), Some(last)) = (self.buckets.front(), self.buckets.back()) else {
            return 0.0;
        };
        if self.buckets.len() < 2 {
            return 0.0;
        }

        let total: u64 = self.buckets.iter().map(|b| b.count).sum();
        let span_us = (last.at - first.at).num_microseconds().unwrap_or(i64::MAX);
        if span_us <= 0 {
            return 0.0;
        }
        total as f64 * 1_000_000.0 / span_us as f64
    }

    pub fn reset(&mut self) {
        self.buckets.clear();
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn truncate(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        if self.round <= TimeDelta::zero() {
            return at;
        }
        at.duration_trunc(self.round).unwrap_or(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_millis(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000 + ms).expect("valid timestamp")
    }

    #[test]
    fn rate_is_zero_without_two_buckets() {
        let mut meter = RateMeter::default();
        assert_eq!(meter.rate(), 0.0);
        meter.observe(at_millis(0));
        assert_eq!(meter.rate(), 0.0);
    }

    #[test]
    fn rate_divides_total_by_bucket_span() {
        let mut meter = RateMeter::new(TimeDelta::seconds(1));
        meter.observe_n(at_millis(0), 3);
        meter.observe_n(at_millis(2_000), 7);
        assert_eq!(meter.rate(), 5.0);
    }

    #[test]
    fn same_interval_observations_share_a_bucket() {
        let mut meter = RateMeter::new(TimeDelta::milliseconds(100));
        meter.observe(at_millis(0));
        meter.observe(at_millis(40));
        meter.observe(at_millis(99));
        assert_eq!(meter.bucket_count(), 1);
        meter.observe(at_millis(100));
        assert_eq!(meter.bucket_count(), 2);
    }

    #[test]
    fn rate_ignores_gaps_between_first_and_last_bucket() {
        let mut meter = RateMeter::new(TimeDelta::milliseconds(100));
        for i in 0..39 {
            meter.observe(at_millis(i * 10));
        }
        meter.observe(at_millis(3_400));
        let rate = meter.rate();
        assert!((rate - 40.0 / 3.4).abs() < 1e-9, "rate was {rate}");
    }

    #[test]
    fn zero_round_keeps_raw_timestamps() {
        let mut meter = RateMeter::new(TimeDelta::zero());
        meter.observe(at_millis(0));
        meter.observe(at_millis(1));
        assert_eq!(meter.bucket_count(), 2);
    }

    #[test]
    fn late_observation_merges_into_newest_bucket() {
        let mut meter = RateMeter::new(TimeDelta::milliseconds(100));
        meter.observe(at_millis(0));
        meter.observe(at_millis(1_000));
        meter.observe(at_millis(500));
        assert_eq!(meter.bucket_count(), 2);
        assert_eq!(meter.rate(), 3.0);
    }

    #[test]
    fn sub_millisecond_span_still_yields_rate() {
        let mut meter = RateMeter::new(TimeDelta::zero());
        let start = at_millis(0);
        meter.observe(start);
        meter.observe(start + TimeDelta::microseconds(500));
        assert_eq!(meter.bucket_count(), 2);
        assert_eq!(meter.rate(), 4_000.0);
    }

    #[test]
    fn reset_clears_buckets() {
        let mut meter = RateMeter::default();
        meter.observe(at_millis(0));
        meter.observe(at_millis(500));
        meter.reset();
        assert_eq!(meter.bucket_count(), 0);
        assert_eq!(meter.rate(), 0.0);
    }
}
