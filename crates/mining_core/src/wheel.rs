//! crates/mining_core/src/wheel.rs
//!
//! Weighted-random selection over the fixed reward wheel. The segment
//! table and its order are part of the product definition; weights sum
//! to 100 so each weight reads as a percentage.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// One wheel segment: land on it, win `reward` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelSegment {
    pub reward: u32,
    pub weight: u32,
}

/// The fixed wheel, in display order.
pub const SEGMENTS: [WheelSegment; 6] = [
    WheelSegment { reward: 0, weight: 20 },
    WheelSegment { reward: 10, weight: 30 },
    WheelSegment { reward: 20, weight: 25 },
    WheelSegment { reward: 50, weight: 15 },
    WheelSegment { reward: 100, weight: 8 },
    WheelSegment { reward: 200, weight: 2 },
];

/// Sum of all segment weights.
pub fn total_weight() -> u32 {
    SEGMENTS.iter().map(|s| s.weight).sum()
}

/// Draws one reward: a uniform value in `[0, total_weight)` walked through
/// the segments in fixed order by cumulative weight.
pub fn select<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    let draw = rng.gen_range(0..total_weight());
    let mut cumulative = 0;
    for segment in &SEGMENTS {
        cumulative += segment.weight;
        if draw < cumulative {
            return segment.reward;
        }
    }
    // Unreachable: the draw is strictly below the total weight.
    0
}

/// Seconds until the next UTC midnight, reported to a user who already
/// spun today.
pub fn seconds_until_reset(now: DateTime<Utc>) -> i64 {
    let next_midnight = (now.date_naive() + Duration::days(1))
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc();
    (next_midnight - now).num_seconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn weights_sum_to_one_hundred() {
        assert_eq!(total_weight(), 100);
    }

    #[test]
    fn every_draw_lands_on_a_configured_segment() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let reward = select(&mut rng);
            assert!(SEGMENTS.iter().any(|s| s.reward == reward));
        }
    }

    #[test]
    fn empirical_frequencies_match_weights() {
        const TRIALS: u32 = 100_000;
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for _ in 0..TRIALS {
            *counts.entry(select(&mut rng)).or_default() += 1;
        }

        for segment in &SEGMENTS {
            let observed = *counts.get(&segment.reward).unwrap_or(&0) as f64 / TRIALS as f64;
            let expected = segment.weight as f64 / 100.0;
            assert!(
                (observed - expected).abs() < 0.015,
                "reward {} observed {:.4}, expected {:.4}",
                segment.reward,
                observed,
                expected
            );
        }
    }

    #[test]
    fn reset_countdown_ends_at_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 23, 0, 0).unwrap();
        assert_eq!(seconds_until_reset(now), 3600);

        let just_after_midnight = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 1).unwrap();
        assert_eq!(seconds_until_reset(just_after_midnight), 86_399);
    }
}
