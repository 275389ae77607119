//! crates/mining_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Default hashrate assigned to a freshly provisioned account.
pub const DEFAULT_HASHRATE: f64 = 10.0;

/// Lowest hashrate the legacy importer (or an upgrade) may set.
pub const MIN_HASHRATE: f64 = 10.0;

/// Tokens credited to the referrer when a referral code is redeemed.
pub const REFERRAL_BONUS: f64 = 10.0;

// Represents a user account - used throughout app
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
    pub is_ambassador: bool,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// The mining-relevant slice of a user record.
///
/// Invariant: `is_mining` is true exactly when `mining_start_time` is set.
/// `balance` is only ever mutated by claim operations and never goes
/// negative.
#[derive(Debug, Clone, PartialEq)]
pub struct UserMiningState {
    pub user_id: Uuid,
    pub balance: f64,
    pub hashrate: f64,
    pub is_mining: bool,
    pub mining_start_time: Option<DateTime<Utc>>,
    pub last_claim_time: Option<DateTime<Utc>>,
    pub last_spin_date: Option<DateTime<Utc>>,
}

impl UserMiningState {
    /// Zero-state defaults for a brand new account.
    pub fn fresh(user_id: Uuid) -> Self {
        Self {
            user_id,
            balance: 0.0,
            hashrate: DEFAULT_HASHRATE,
            is_mining: false,
            mining_start_time: None,
            last_claim_time: None,
            last_spin_date: None,
        }
    }

    /// Builds an initial state from a legacy snapshot, falling back to the
    /// zero-state defaults wherever the snapshot is out of range.
    pub fn from_snapshot(user_id: Uuid, snapshot: &LegacySnapshot) -> Self {
        let mut state = Self::fresh(user_id);
        if snapshot.balance >= 0.0 {
            state.balance = snapshot.balance;
        }
        if snapshot.hashrate >= MIN_HASHRATE {
            state.hashrate = snapshot.hashrate;
        }
        state
    }
}

/// Historical record of one mining session. Immutable once closed; used
/// for history and analytics, never for re-deriving current accrual.
#[derive(Debug, Clone)]
pub struct MiningSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub hash_rate: f64,
    pub tokens_earned: f64,
    pub claimed_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Daily-login continuity record. Calendar days are UTC days throughout.
///
/// `achieved_milestones` holds day-thresholds that have already been paid
/// out; entries are never removed, even when the streak resets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStreak {
    pub user_id: Uuid,
    pub current_streak: u32,
    pub highest_streak: u32,
    pub start_date: NaiveDate,
    pub last_login: NaiveDate,
    pub achieved_milestones: Vec<u32>,
}

/// One wheel spin. At most one per user per UTC calendar day.
#[derive(Debug, Clone)]
pub struct UserSpin {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reward: u32,
    pub spin_date: DateTime<Utc>,
}

/// Which credit path produced a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditKind {
    MiningClaim,
    StreakClaim,
    SpinReward,
    ReferralBonus,
}

impl CreditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditKind::MiningClaim => "MINING_CLAIM",
            CreditKind::StreakClaim => "STREAK_CLAIM",
            CreditKind::SpinReward => "SPIN_REWARD",
            CreditKind::ReferralBonus => "REFERRAL_BONUS",
        }
    }
}

/// One credited event. Written in the same transaction as the balance
/// mutation it records.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: CreditKind,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

/// Initial balance/hashrate snapshot supplied by the one-time legacy
/// importer on first login.
#[derive(Debug, Clone)]
pub struct LegacySnapshot {
    pub balance: f64,
    pub hashrate: f64,
    pub is_ambassador: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_with_valid_fields_is_kept() {
        let snap = LegacySnapshot {
            balance: 420.5,
            hashrate: 50.0,
            is_ambassador: false,
            created_at: None,
        };
        let state = UserMiningState::from_snapshot(Uuid::new_v4(), &snap);
        assert_eq!(state.balance, 420.5);
        assert_eq!(state.hashrate, 50.0);
        assert!(!state.is_mining);
    }

    #[test]
    fn snapshot_out_of_range_falls_back_to_defaults() {
        let snap = LegacySnapshot {
            balance: -3.0,
            hashrate: 1.0,
            is_ambassador: false,
            created_at: None,
        };
        let state = UserMiningState::from_snapshot(Uuid::new_v4(), &snap);
        assert_eq!(state.balance, 0.0);
        assert_eq!(state.hashrate, DEFAULT_HASHRATE);
    }
}
