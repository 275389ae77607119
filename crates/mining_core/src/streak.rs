//! crates/mining_core/src/streak.rs
//!
//! Daily-login streak tracking, rank derivation, and milestone payouts.
//! All calendar math is done on UTC days; callers resolve `Utc::now()` to
//! a `NaiveDate` before calling in.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::UserStreak;
use crate::errors::{CoreError, CoreResult};

/// A streak milestone: reach `days` consecutive logins, earn `reward`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Milestone {
    pub days: u32,
    pub rank: &'static str,
    pub reward: f64,
}

/// Rank held before the first milestone is reached.
pub const BASE_RANK: &str = "Bronze";

/// Fixed milestone table, ordered by day-threshold ascending.
pub const MILESTONES: [Milestone; 5] = [
    Milestone { days: 7, rank: "Bronze", reward: 10.0 },
    Milestone { days: 14, rank: "Gold", reward: 50.0 },
    Milestone { days: 21, rank: "Emerald", reward: 100.0 },
    Milestone { days: 30, rank: "Diamond", reward: 500.0 },
    Milestone { days: 60, rank: "Universal Ambassador", reward: 1000.0 },
];

/// Applies today's login to the streak record.
///
/// Same day: no-op. Exactly one day later: increment, tracking the highest
/// watermark. A gap of two or more days: reset to 1 with a new start date.
/// No prior record: a fresh streak of 1. Paid milestones survive resets.
pub fn touch(existing: Option<UserStreak>, user_id: Uuid, today: NaiveDate) -> UserStreak {
    let Some(mut streak) = existing else {
        return UserStreak {
            user_id,
            current_streak: 1,
            highest_streak: 1,
            start_date: today,
            last_login: today,
            achieved_milestones: Vec::new(),
        };
    };

    let days_since = (today - streak.last_login).num_days();
    if days_since <= 0 {
        return streak;
    }

    if days_since == 1 {
        streak.current_streak += 1;
        streak.highest_streak = streak.highest_streak.max(streak.current_streak);
    } else {
        streak.current_streak = 1;
        streak.start_date = today;
    }
    streak.last_login = today;
    streak
}

/// The rank for a streak length: highest milestone threshold reached, or
/// the base rank.
pub fn current_rank(current_streak: u32) -> &'static str {
    MILESTONES
        .iter()
        .rev()
        .find(|m| current_streak >= m.days)
        .map(|m| m.rank)
        .unwrap_or(BASE_RANK)
}

/// Milestones reached by the streak but not yet paid out.
pub fn unclaimed_milestones(streak: &UserStreak) -> Vec<Milestone> {
    MILESTONES
        .iter()
        .filter(|m| {
            streak.current_streak >= m.days && !streak.achieved_milestones.contains(&m.days)
        })
        .copied()
        .collect()
}

/// The next threshold the streak has not yet reached.
pub fn next_milestone(current_streak: u32) -> Option<Milestone> {
    MILESTONES.iter().find(|m| current_streak < m.days).copied()
}

/// Payout produced by a successful streak claim.
#[derive(Debug, Clone, PartialEq)]
pub struct StreakClaim {
    pub milestones: Vec<Milestone>,
    pub total_reward: f64,
}

/// Pays out every eligible unpaid milestone and marks each threshold as
/// achieved. Thresholds are only ever added, so a replayed claim finds
/// nothing new to pay and fails.
pub fn claim(streak: &mut UserStreak) -> CoreResult<StreakClaim> {
    let eligible = unclaimed_milestones(streak);
    if eligible.is_empty() {
        return Err(CoreError::NoUnclaimedRewards);
    }

    let total_reward = eligible.iter().map(|m| m.reward).sum();
    for milestone in &eligible {
        streak.achieved_milestones.push(milestone.days);
    }

    Ok(StreakClaim {
        milestones: eligible,
        total_reward,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn first_touch_creates_a_fresh_streak() {
        let streak = touch(None, Uuid::new_v4(), day(1));
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.highest_streak, 1);
        assert_eq!(streak.start_date, day(1));
        assert_eq!(streak.last_login, day(1));
        assert!(streak.achieved_milestones.is_empty());
    }

    #[test]
    fn same_day_touch_is_a_no_op() {
        let first = touch(None, Uuid::new_v4(), day(1));
        let second = touch(Some(first.clone()), first.user_id, day(1));
        assert_eq!(first, second);
    }

    #[test]
    fn consecutive_day_increments_by_exactly_one() {
        let uid = Uuid::new_v4();
        let mut streak = touch(None, uid, day(1));
        for d in 2..=6 {
            streak = touch(Some(streak), uid, day(d));
        }
        assert_eq!(streak.current_streak, 6);
        assert_eq!(streak.highest_streak, 6);
        assert_eq!(streak.start_date, day(1));
    }

    #[test]
    fn a_gap_of_two_or_more_days_resets_to_one() {
        let uid = Uuid::new_v4();
        let mut streak = touch(None, uid, day(1));
        for d in 2..=10 {
            streak = touch(Some(streak), uid, day(d));
        }
        assert_eq!(streak.current_streak, 10);

        let streak = touch(Some(streak), uid, day(13));
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.highest_streak, 10);
        assert_eq!(streak.start_date, day(13));
        assert_eq!(streak.last_login, day(13));
    }

    #[test]
    fn ranks_follow_the_milestone_table() {
        assert_eq!(current_rank(0), "Bronze");
        assert_eq!(current_rank(6), "Bronze");
        assert_eq!(current_rank(7), "Bronze");
        assert_eq!(current_rank(14), "Gold");
        assert_eq!(current_rank(29), "Emerald");
        assert_eq!(current_rank(30), "Diamond");
        assert_eq!(current_rank(75), "Universal Ambassador");
    }

    #[test]
    fn claim_pays_all_eligible_then_rejects_replay() {
        let mut streak = UserStreak {
            user_id: Uuid::new_v4(),
            current_streak: 15,
            highest_streak: 15,
            start_date: day(1),
            last_login: day(15),
            achieved_milestones: Vec::new(),
        };

        let payout = claim(&mut streak).unwrap();
        assert_eq!(payout.total_reward, 60.0); // 10 + 50
        assert_eq!(streak.achieved_milestones, vec![7, 14]);

        let err = claim(&mut streak).unwrap_err();
        assert!(matches!(err, CoreError::NoUnclaimedRewards));
    }

    #[test]
    fn paid_milestones_are_not_paid_again_after_a_reset() {
        let mut streak = UserStreak {
            user_id: Uuid::new_v4(),
            current_streak: 8,
            highest_streak: 8,
            start_date: day(1),
            last_login: day(8),
            achieved_milestones: vec![7],
        };

        // Streak broke and regrew past the 7-day threshold.
        let uid = streak.user_id;
        streak = touch(Some(streak), uid, day(20));
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.achieved_milestones, vec![7]);
        streak.current_streak = 9; // regrown

        let err = claim(&mut streak).unwrap_err();
        assert!(matches!(err, CoreError::NoUnclaimedRewards));
    }

    #[test]
    fn next_milestone_tracks_progress() {
        assert_eq!(next_milestone(1).unwrap().days, 7);
        assert_eq!(next_milestone(7).unwrap().days, 14);
        assert_eq!(next_milestone(59).unwrap().days, 60);
        assert!(next_milestone(60).is_none());
    }
}
