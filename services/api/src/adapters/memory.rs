//! services/api/src/adapters/memory.rs
//!
//! An in-memory implementation of the `MiningStore` port, used by the test
//! suite and for running the service locally without Postgres. One mutex
//! guards the whole store, so every operation is atomic and per-user
//! requests serialize exactly as the SQL adapter's transactions do.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mining_core::domain::{
    CreditKind, LedgerEntry, LegacySnapshot, MiningSession, UserAccount, UserCredentials,
    UserMiningState, UserStreak, REFERRAL_BONUS,
};
use mining_core::ports::{
    MiningStore, ReferralOutcome, ReferralStats, SpinOutcome, StreakClaimOutcome,
};
use mining_core::{session, streak, wheel, AccrualConfig, ClaimOutcome, CoreError, CoreResult};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

struct UserRow {
    account: UserAccount,
    hashed_password: String,
    state: UserMiningState,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserRow>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    mining_sessions: Vec<MiningSession>,
    streaks: HashMap<Uuid, UserStreak>,
    spins: HashMap<(Uuid, NaiveDate), Uuid>,
    ledger: Vec<LedgerEntry>,
}

/// In-memory store with the same atomicity guarantees as `DbAdapter`.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    accrual: AccrualConfig,
}

impl MemoryStore {
    pub fn new(accrual: AccrualConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            accrual,
        }
    }
}

impl Inner {
    fn state_mut(&mut self, user_id: Uuid) -> CoreResult<&mut UserMiningState> {
        self.users
            .get_mut(&user_id)
            .map(|row| &mut row.state)
            .ok_or(CoreError::UserNotFound)
    }

    fn credit(&mut self, user_id: Uuid, kind: CreditKind, amount: f64, now: DateTime<Utc>) {
        self.ledger.push(LedgerEntry {
            id: Uuid::new_v4(),
            user_id,
            kind,
            amount,
            created_at: now,
        });
    }
}

#[async_trait]
impl MiningStore for MemoryStore {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        legacy: Option<LegacySnapshot>,
    ) -> CoreResult<UserAccount> {
        let mut inner = self.inner.lock().await;
        if inner
            .users
            .values()
            .any(|row| row.account.email.as_deref() == Some(email))
        {
            return Err(CoreError::InvalidInput("email is already registered".to_string()));
        }

        let user_id = Uuid::new_v4();
        let state = match &legacy {
            Some(snapshot) => UserMiningState::from_snapshot(user_id, snapshot),
            None => UserMiningState::fresh(user_id),
        };
        let account = UserAccount {
            user_id,
            email: Some(email.to_string()),
            referral_code: Uuid::new_v4().simple().to_string()[..8].to_uppercase(),
            referred_by: None,
            is_ambassador: legacy.as_ref().map(|l| l.is_ambassador).unwrap_or(false),
            created_at: legacy.as_ref().and_then(|l| l.created_at).unwrap_or_else(Utc::now),
        };

        inner.users.insert(
            user_id,
            UserRow {
                account: account.clone(),
                hashed_password: hashed_password.to_string(),
                state,
            },
        );
        Ok(account)
    }

    async fn get_user_by_email(&self, email: &str) -> CoreResult<UserCredentials> {
        let inner = self.inner.lock().await;
        inner
            .users
            .values()
            .find(|row| row.account.email.as_deref() == Some(email))
            .map(|row| UserCredentials {
                user_id: row.account.user_id,
                email: email.to_string(),
                hashed_password: row.hashed_password.clone(),
            })
            .ok_or(CoreError::UserNotFound)
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> CoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> CoreResult<Uuid> {
        let inner = self.inner.lock().await;
        match inner.auth_sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(CoreError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> CoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn get_account(&self, user_id: Uuid) -> CoreResult<UserAccount> {
        let inner = self.inner.lock().await;
        inner
            .users
            .get(&user_id)
            .map(|row| row.account.clone())
            .ok_or(CoreError::UserNotFound)
    }

    async fn mining_state(&self, user_id: Uuid) -> CoreResult<UserMiningState> {
        let inner = self.inner.lock().await;
        inner
            .users
            .get(&user_id)
            .map(|row| row.state.clone())
            .ok_or(CoreError::UserNotFound)
    }

    async fn start_mining(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<UserMiningState> {
        let mut inner = self.inner.lock().await;
        let state = inner.state_mut(user_id)?;
        session::start(&self.accrual, state, now)?;
        Ok(state.clone())
    }

    async fn stop_mining(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<UserMiningState> {
        let mut inner = self.inner.lock().await;
        let state = inner.state_mut(user_id)?;
        session::stop(&self.accrual, state, now)?;
        Ok(state.clone())
    }

    async fn claim_mining(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<ClaimOutcome> {
        let mut inner = self.inner.lock().await;
        let state = inner.state_mut(user_id)?;
        let outcome = session::claim(&self.accrual, state, now)?;
        inner.mining_sessions.push(outcome.session.clone());
        inner.credit(user_id, CreditKind::MiningClaim, outcome.tokens_earned, now);
        Ok(outcome)
    }

    async fn set_hashrate(&self, user_id: Uuid, hashrate: f64) -> CoreResult<UserMiningState> {
        let mut inner = self.inner.lock().await;
        let state = inner.state_mut(user_id)?;
        session::set_hashrate(state, hashrate)?;
        Ok(state.clone())
    }

    async fn mining_history(&self, user_id: Uuid) -> CoreResult<Vec<MiningSession>> {
        let inner = self.inner.lock().await;
        let mut sessions: Vec<MiningSession> = inner
            .mining_sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    async fn touch_streak(&self, user_id: Uuid, today: NaiveDate) -> CoreResult<UserStreak> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&user_id) {
            return Err(CoreError::UserNotFound);
        }
        let existing = inner.streaks.get(&user_id).cloned();
        let updated = streak::touch(existing, user_id, today);
        inner.streaks.insert(user_id, updated.clone());
        Ok(updated)
    }

    async fn claim_streak(&self, user_id: Uuid) -> CoreResult<StreakClaimOutcome> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&user_id) {
            return Err(CoreError::UserNotFound);
        }
        let mut record = inner
            .streaks
            .get(&user_id)
            .cloned()
            .ok_or(CoreError::NoUnclaimedRewards)?;

        let claim = streak::claim(&mut record)?;
        let state = inner.state_mut(user_id)?;
        state.balance += claim.total_reward;
        let new_balance = state.balance;

        inner.streaks.insert(user_id, record.clone());
        inner.credit(user_id, CreditKind::StreakClaim, claim.total_reward, Utc::now());
        Ok(StreakClaimOutcome {
            claim,
            streak: record,
            new_balance,
        })
    }

    async fn record_spin(
        &self,
        user_id: Uuid,
        reward: u32,
        now: DateTime<Utc>,
    ) -> CoreResult<SpinOutcome> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&user_id) {
            return Err(CoreError::UserNotFound);
        }

        let key = (user_id, now.date_naive());
        if inner.spins.contains_key(&key) {
            return Err(CoreError::AlreadySpunToday {
                reset_in_secs: wheel::seconds_until_reset(now),
            });
        }

        let spin_id = Uuid::new_v4();
        inner.spins.insert(key, spin_id);

        let state = inner.state_mut(user_id)?;
        if reward > 0 {
            state.balance += reward as f64;
        }
        state.last_spin_date = Some(now);
        let new_balance = state.balance;
        if reward > 0 {
            inner.credit(user_id, CreditKind::SpinReward, reward as f64, now);
        }

        Ok(SpinOutcome {
            spin_id,
            reward,
            new_balance,
        })
    }

    async fn redeem_referral(&self, user_id: Uuid, code: &str) -> CoreResult<ReferralOutcome> {
        let mut inner = self.inner.lock().await;

        let referrer_id = inner
            .users
            .values()
            .find(|row| row.account.referral_code == code)
            .map(|row| row.account.user_id)
            .ok_or_else(|| CoreError::InvalidInput("invalid referral code".to_string()))?;

        if referrer_id == user_id {
            return Err(CoreError::SelfReferral);
        }

        let user = inner.users.get_mut(&user_id).ok_or(CoreError::UserNotFound)?;
        if user.account.referred_by.is_some() {
            return Err(CoreError::AlreadyReferred);
        }
        user.account.referred_by = Some(referrer_id);

        let referrer = inner
            .users
            .get_mut(&referrer_id)
            .ok_or(CoreError::UserNotFound)?;
        referrer.state.balance += REFERRAL_BONUS;
        inner.credit(referrer_id, CreditKind::ReferralBonus, REFERRAL_BONUS, Utc::now());

        Ok(ReferralOutcome {
            referrer_id,
            bonus: REFERRAL_BONUS,
        })
    }

    async fn referral_stats(&self, user_id: Uuid) -> CoreResult<ReferralStats> {
        let inner = self.inner.lock().await;
        let row = inner.users.get(&user_id).ok_or(CoreError::UserNotFound)?;
        let referred_count = inner
            .users
            .values()
            .filter(|r| r.account.referred_by == Some(user_id))
            .count() as u64;
        Ok(ReferralStats {
            referral_code: row.account.referral_code.clone(),
            referred_count,
        })
    }

    async fn ledger(&self, user_id: Uuid, limit: i64) -> CoreResult<Vec<LedgerEntry>> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<LedgerEntry> = inner
            .ledger
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }
}
