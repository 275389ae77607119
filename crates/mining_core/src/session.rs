//! crates/mining_core/src/session.rs
//!
//! The mining session state machine: Idle -> Mining -> Claimable -> Idle.
//!
//! The transitions here are pure functions over `UserMiningState`; store
//! implementations run them inside a per-user serializable transaction so
//! that concurrent duplicate requests observe the post-transition state
//! instead of double-applying.

use chrono::{DateTime, Utc};

use crate::accrual::{self, AccrualConfig};
use crate::domain::{MiningSession, UserMiningState, MIN_HASHRATE};
use crate::errors::{CoreError, CoreResult};

/// Where a user's session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningPhase {
    /// Not mining, nothing to claim.
    Idle,
    /// Session open, accrual in progress.
    Mining,
    /// Session complete, accrual capped, awaiting claim.
    Claimable,
}

/// Derives the current phase from persisted state and the clock.
pub fn phase(config: &AccrualConfig, state: &UserMiningState, now: DateTime<Utc>) -> MiningPhase {
    match state.mining_start_time {
        None => MiningPhase::Idle,
        Some(start) => {
            if accrual::compute(config, state.hashrate, start, now).is_complete {
                MiningPhase::Claimable
            } else {
                MiningPhase::Mining
            }
        }
    }
}

/// Opens a new session. Fails if one is already open or awaiting claim.
pub fn start(
    config: &AccrualConfig,
    state: &mut UserMiningState,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    match phase(config, state, now) {
        MiningPhase::Idle => {
            state.is_mining = true;
            state.mining_start_time = Some(now);
            Ok(())
        }
        MiningPhase::Mining | MiningPhase::Claimable => Err(CoreError::AlreadyMining),
    }
}

/// Cancels an in-progress session, forfeiting the accrued-but-unclaimed
/// amount. A complete session cannot be stopped, only claimed; this keeps
/// a finished reward from being thrown away by a stray stop request.
pub fn stop(
    config: &AccrualConfig,
    state: &mut UserMiningState,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    match phase(config, state, now) {
        MiningPhase::Mining => {
            state.is_mining = false;
            state.mining_start_time = None;
            Ok(())
        }
        MiningPhase::Idle => Err(CoreError::NoActiveSession),
        MiningPhase::Claimable => Err(CoreError::SessionComplete),
    }
}

/// Changes the user's hashrate. Rejected while a session is open or
/// awaiting claim: the rate a session runs at is the rate it pays out at,
/// so an upgrade cannot retroactively inflate an accrued reward.
pub fn set_hashrate(state: &mut UserMiningState, hashrate: f64) -> CoreResult<()> {
    if !hashrate.is_finite() || hashrate < MIN_HASHRATE {
        return Err(CoreError::InvalidInput(format!(
            "hashrate must be at least {}",
            MIN_HASHRATE
        )));
    }
    if state.mining_start_time.is_some() {
        return Err(CoreError::AlreadyMining);
    }
    state.hashrate = hashrate;
    Ok(())
}

/// Result of a successful claim: the credited amount plus the closed
/// session record to append to history.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub tokens_earned: f64,
    pub new_balance: f64,
    pub session: MiningSession,
}

/// Claims a completed session as a single atomic unit: credit the capped
/// accrual, close the session, stamp `last_claim_time`.
///
/// The credited amount is the cap frozen by the hashrate that ran the
/// session, not a re-evaluation at claim time, so a delayed claim can
/// never accrue extra.
pub fn claim(
    config: &AccrualConfig,
    state: &mut UserMiningState,
    now: DateTime<Utc>,
) -> CoreResult<ClaimOutcome> {
    match phase(config, state, now) {
        MiningPhase::Idle => Err(CoreError::NoActiveSession),
        MiningPhase::Mining => Err(CoreError::NotClaimable),
        MiningPhase::Claimable => {
            // Phase is Claimable, so mining_start_time is set.
            let start_time = state
                .mining_start_time
                .ok_or_else(|| CoreError::Unexpected("claimable session without start time".into()))?;

            let tokens_earned = config.max_mineable(state.hashrate);
            let end_time = start_time + config.session_duration;

            state.balance += tokens_earned;
            state.is_mining = false;
            state.mining_start_time = None;
            state.last_claim_time = Some(now);

            Ok(ClaimOutcome {
                tokens_earned,
                new_balance: state.balance,
                session: MiningSession {
                    id: uuid::Uuid::new_v4(),
                    user_id: state.user_id,
                    start_time,
                    end_time: Some(end_time),
                    hash_rate: state.hashrate,
                    tokens_earned,
                    claimed_at: Some(now),
                    is_active: false,
                },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn state_with_hashrate(hashrate: f64) -> UserMiningState {
        let mut state = UserMiningState::fresh(Uuid::new_v4());
        state.hashrate = hashrate;
        state
    }

    #[test]
    fn start_then_wait_then_claim_credits_the_cap() {
        let cfg = AccrualConfig::default();
        let mut state = state_with_hashrate(100.0);
        state.balance = 7.0;

        start(&cfg, &mut state, t0()).unwrap();
        assert!(state.is_mining);

        let claim_time = t0() + Duration::hours(24);
        let outcome = claim(&cfg, &mut state, claim_time).unwrap();

        assert_eq!(outcome.tokens_earned, 100.0);
        assert_eq!(state.balance, 107.0);
        assert_eq!(phase(&cfg, &state, claim_time), MiningPhase::Idle);
        assert_eq!(state.last_claim_time, Some(claim_time));
        assert_eq!(outcome.session.tokens_earned, 100.0);
        assert!(!outcome.session.is_active);
    }

    #[test]
    fn second_claim_sees_idle_and_fails() {
        let cfg = AccrualConfig::default();
        let mut state = state_with_hashrate(100.0);
        start(&cfg, &mut state, t0()).unwrap();

        let claim_time = t0() + Duration::hours(25);
        claim(&cfg, &mut state, claim_time).unwrap();
        let balance_after_first = state.balance;

        let err = claim(&cfg, &mut state, claim_time).unwrap_err();
        assert!(matches!(err, CoreError::NoActiveSession));
        assert_eq!(state.balance, balance_after_first);
    }

    #[test]
    fn claim_before_completion_is_rejected() {
        let cfg = AccrualConfig::default();
        let mut state = state_with_hashrate(100.0);
        start(&cfg, &mut state, t0()).unwrap();

        let err = claim(&cfg, &mut state, t0() + Duration::hours(12)).unwrap_err();
        assert!(matches!(err, CoreError::NotClaimable));
        assert_eq!(state.balance, 0.0);
        assert!(state.is_mining);
    }

    #[test]
    fn starting_twice_is_rejected() {
        let cfg = AccrualConfig::default();
        let mut state = state_with_hashrate(10.0);
        start(&cfg, &mut state, t0()).unwrap();

        let err = start(&cfg, &mut state, t0() + Duration::hours(1)).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyMining));

        // Still blocked once the session turns claimable.
        let err = start(&cfg, &mut state, t0() + Duration::hours(30)).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyMining));
    }

    #[test]
    fn stop_forfeits_partial_accrual() {
        let cfg = AccrualConfig::default();
        let mut state = state_with_hashrate(100.0);
        start(&cfg, &mut state, t0()).unwrap();

        stop(&cfg, &mut state, t0() + Duration::hours(12)).unwrap();
        assert_eq!(state.balance, 0.0);
        assert!(!state.is_mining);
        assert!(state.mining_start_time.is_none());
    }

    #[test]
    fn stop_is_rejected_when_idle_or_claimable() {
        let cfg = AccrualConfig::default();
        let mut state = state_with_hashrate(100.0);

        let err = stop(&cfg, &mut state, t0()).unwrap_err();
        assert!(matches!(err, CoreError::NoActiveSession));

        start(&cfg, &mut state, t0()).unwrap();
        let err = stop(&cfg, &mut state, t0() + Duration::hours(24)).unwrap_err();
        assert!(matches!(err, CoreError::SessionComplete));
        assert!(state.is_mining);
    }

    #[test]
    fn hashrate_cannot_change_while_a_session_is_open() {
        let cfg = AccrualConfig::default();
        let mut state = state_with_hashrate(10.0);
        start(&cfg, &mut state, t0()).unwrap();

        // Mid-session and once claimable, the upgrade is rejected.
        let err = set_hashrate(&mut state, 1000.0).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyMining));
        let err = set_hashrate(&mut state, 1000.0).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyMining));
        assert_eq!(state.hashrate, 10.0);

        // The claim pays the rate the session actually ran at.
        let outcome = claim(&cfg, &mut state, t0() + Duration::hours(25)).unwrap();
        assert_eq!(outcome.tokens_earned, 10.0);

        // Idle again, the upgrade goes through.
        set_hashrate(&mut state, 1000.0).unwrap();
        assert_eq!(state.hashrate, 1000.0);
    }

    #[test]
    fn hashrate_below_the_floor_is_rejected() {
        let mut state = state_with_hashrate(10.0);
        assert!(set_hashrate(&mut state, 9.9).is_err());
        assert!(set_hashrate(&mut state, f64::NAN).is_err());
        assert!(set_hashrate(&mut state, 25.0).is_ok());
    }

    #[test]
    fn delayed_claim_does_not_accrue_extra() {
        let cfg = AccrualConfig::default();
        let mut state = state_with_hashrate(50.0);
        start(&cfg, &mut state, t0()).unwrap();

        // Claim a week late; the credit is still the frozen cap.
        let outcome = claim(&cfg, &mut state, t0() + Duration::days(8)).unwrap();
        assert_eq!(outcome.tokens_earned, 50.0);
        assert_eq!(
            outcome.session.end_time,
            Some(t0() + cfg.session_duration)
        );
    }
}
