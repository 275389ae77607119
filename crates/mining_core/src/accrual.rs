//! crates/mining_core/src/accrual.rs
//!
//! The mining accrual calculator. Everything here is a pure function of
//! the stored session timestamps and a caller-supplied `now`, so the same
//! inputs always produce the same output and the display path can poll it
//! freely without drift.
//!
//! Completion follows the wall-clock rule: a session is complete once
//! `session_duration` has elapsed. The linear accrual rate is derived so
//! that `accrued(session_duration) == max_mineable` exactly, which keeps
//! the "reached max tokens" view in agreement by construction.

use chrono::{DateTime, Duration, Utc};

/// Tunables for the accrual model.
#[derive(Debug, Clone)]
pub struct AccrualConfig {
    /// Wall-clock length of one mining session.
    pub session_duration: Duration,
    /// Tokens yielded per hashrate unit over a full session.
    pub tokens_per_hashrate: f64,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            session_duration: Duration::hours(24),
            tokens_per_hashrate: 1.0,
        }
    }
}

impl AccrualConfig {
    /// The cap a full session yields at the given hashrate.
    pub fn max_mineable(&self, hashrate: f64) -> f64 {
        hashrate * self.tokens_per_hashrate
    }
}

/// Snapshot of an in-flight (or finished) session's accrual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accrual {
    /// Tokens accrued so far, capped at the session maximum.
    pub accrued: f64,
    /// Fraction of the session elapsed, in `[0, 1]`.
    pub progress: f64,
    /// True once the session duration has fully elapsed.
    pub is_complete: bool,
}

/// Computes accrued tokens for a session that started at `start`.
///
/// Elapsed time is clamped to zero so a client clock slightly ahead of the
/// stored start time cannot produce a negative accrual.
pub fn compute(
    config: &AccrualConfig,
    hashrate: f64,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Accrual {
    let duration_ms = config.session_duration.num_milliseconds().max(1) as f64;
    let elapsed_ms = (now - start).num_milliseconds().max(0) as f64;

    let progress = (elapsed_ms / duration_ms).min(1.0);
    let max = config.max_mineable(hashrate);

    Accrual {
        accrued: max * progress,
        progress,
        is_complete: elapsed_ms >= duration_ms,
    }
}

/// Milliseconds of wall-clock time left before the session completes.
pub fn remaining_ms(config: &AccrualConfig, start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let elapsed = (now - start).num_milliseconds().max(0);
    (config.session_duration.num_milliseconds() - elapsed).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn halfway_through_a_session_accrues_half_the_cap() {
        let cfg = AccrualConfig::default();
        let acc = compute(&cfg, 100.0, t0(), t0() + Duration::hours(12));
        assert!((acc.accrued - 50.0).abs() < 1e-9);
        assert!((acc.progress - 0.5).abs() < 1e-9);
        assert!(!acc.is_complete);
    }

    #[test]
    fn a_full_session_accrues_exactly_the_cap() {
        let cfg = AccrualConfig::default();
        let acc = compute(&cfg, 100.0, t0(), t0() + Duration::hours(24));
        assert_eq!(acc.accrued, 100.0);
        assert_eq!(acc.progress, 1.0);
        assert!(acc.is_complete);
    }

    #[test]
    fn accrual_is_monotonic_in_now() {
        let cfg = AccrualConfig::default();
        let mut previous = f64::MIN;
        for minutes in (0..=30 * 60).step_by(17) {
            let acc = compute(&cfg, 42.0, t0(), t0() + Duration::minutes(minutes as i64));
            assert!(acc.accrued >= previous);
            assert!(acc.accrued <= cfg.max_mineable(42.0));
            previous = acc.accrued;
        }
    }

    #[test]
    fn accrual_is_capped_once_complete() {
        let cfg = AccrualConfig::default();
        let at_24h = compute(&cfg, 100.0, t0(), t0() + Duration::hours(24));
        let at_72h = compute(&cfg, 100.0, t0(), t0() + Duration::hours(72));
        assert_eq!(at_24h.accrued, at_72h.accrued);
        assert!(at_72h.is_complete);
        assert_eq!(at_72h.progress, 1.0);
    }

    #[test]
    fn elapsed_time_is_clamped_to_zero() {
        let cfg = AccrualConfig::default();
        let acc = compute(&cfg, 100.0, t0(), t0() - Duration::minutes(5));
        assert_eq!(acc.accrued, 0.0);
        assert_eq!(acc.progress, 0.0);
        assert!(!acc.is_complete);
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let cfg = AccrualConfig::default();
        let now = t0() + Duration::hours(7);
        assert_eq!(compute(&cfg, 33.0, t0(), now), compute(&cfg, 33.0, t0(), now));
    }

    #[test]
    fn remaining_ms_counts_down_and_floors_at_zero() {
        let cfg = AccrualConfig::default();
        assert_eq!(
            remaining_ms(&cfg, t0(), t0() + Duration::hours(23)),
            Duration::hours(1).num_milliseconds()
        );
        assert_eq!(remaining_ms(&cfg, t0(), t0() + Duration::hours(25)), 0);
    }
}
