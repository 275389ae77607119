//! crates/mining_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    LedgerEntry, LegacySnapshot, MiningSession, UserAccount, UserCredentials, UserMiningState,
    UserStreak,
};
use crate::errors::CoreResult;
use crate::session::ClaimOutcome;
use crate::streak::StreakClaim;

/// Result of a paid streak claim, as committed by the store.
#[derive(Debug, Clone)]
pub struct StreakClaimOutcome {
    pub claim: StreakClaim,
    pub streak: UserStreak,
    pub new_balance: f64,
}

/// Result of a committed spin.
#[derive(Debug, Clone)]
pub struct SpinOutcome {
    pub spin_id: Uuid,
    pub reward: u32,
    pub new_balance: f64,
}

/// Result of a committed referral redemption.
#[derive(Debug, Clone)]
pub struct ReferralOutcome {
    pub referrer_id: Uuid,
    pub bonus: f64,
}

/// A user's own referral code plus how many signups it has produced.
#[derive(Debug, Clone)]
pub struct ReferralStats {
    pub referral_code: String,
    pub referred_count: u64,
}

/// The persistence port. Every mutating operation is atomic: the balance
/// change and the record that marks the event as paid commit together, and
/// concurrent requests for the same user serialize, so no credit path can
/// pay the same logical event twice.
#[async_trait]
pub trait MiningStore: Send + Sync {
    // --- Account & Auth ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        legacy: Option<LegacySnapshot>,
    ) -> CoreResult<UserAccount>;

    async fn get_user_by_email(&self, email: &str) -> CoreResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> CoreResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> CoreResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> CoreResult<()>;

    async fn get_account(&self, user_id: Uuid) -> CoreResult<UserAccount>;

    // --- Mining Sessions ---
    async fn mining_state(&self, user_id: Uuid) -> CoreResult<UserMiningState>;

    async fn start_mining(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<UserMiningState>;

    async fn stop_mining(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<UserMiningState>;

    async fn claim_mining(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<ClaimOutcome>;

    async fn set_hashrate(&self, user_id: Uuid, hashrate: f64) -> CoreResult<UserMiningState>;

    async fn mining_history(&self, user_id: Uuid) -> CoreResult<Vec<MiningSession>>;

    // --- Streaks ---
    async fn touch_streak(&self, user_id: Uuid, today: NaiveDate) -> CoreResult<UserStreak>;

    async fn claim_streak(&self, user_id: Uuid) -> CoreResult<StreakClaimOutcome>;

    // --- Spins ---
    /// Records a spin and credits the reward. The one-spin-per-UTC-day rule
    /// is enforced by the store's uniqueness guarantee, not check-then-act.
    async fn record_spin(
        &self,
        user_id: Uuid,
        reward: u32,
        now: DateTime<Utc>,
    ) -> CoreResult<SpinOutcome>;

    // --- Referrals ---
    async fn redeem_referral(&self, user_id: Uuid, code: &str) -> CoreResult<ReferralOutcome>;

    async fn referral_stats(&self, user_id: Uuid) -> CoreResult<ReferralStats>;

    // --- Ledger ---
    async fn ledger(&self, user_id: Uuid, limit: i64) -> CoreResult<Vec<LedgerEntry>>;
}

/// An injected throttling capability. Auxiliary guard only: it may be
/// approximate, but it must fail closed when its own state is ambiguous.
pub trait RateLimiter: Send + Sync {
    /// Returns `Ok(())` when the attempt is allowed, or
    /// `Err(retry_after_secs)` when throttled.
    fn check(&self, key: &str, limit: u32, window: std::time::Duration) -> Result<(), i64>;
}
