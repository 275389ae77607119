//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `MiningStore` port from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.
//!
//! Every mutating operation runs its read-transition-write sequence inside
//! one transaction with the user row locked (`SELECT ... FOR UPDATE`), so
//! requests for the same user serialize and a concurrent duplicate claim
//! observes the post-claim state instead of double-crediting.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mining_core::domain::{
    CreditKind, LedgerEntry, LegacySnapshot, MiningSession, UserAccount, UserCredentials,
    UserMiningState, UserStreak,
};
use mining_core::ports::{
    MiningStore, ReferralOutcome, ReferralStats, SpinOutcome, StreakClaimOutcome,
};
use mining_core::{session, streak, wheel, AccrualConfig, ClaimOutcome, CoreError, CoreResult};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `MiningStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    accrual: AccrualConfig,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool, accrual: AccrualConfig) -> Self {
        Self { pool, accrual }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> CoreError {
    CoreError::Unexpected(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Short, shareable referral code derived from a fresh v4 UUID.
fn generate_referral_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AccountRecord {
    user_id: Uuid,
    email: Option<String>,
    referral_code: String,
    referred_by: Option<Uuid>,
    is_ambassador: bool,
    created_at: DateTime<Utc>,
}
impl AccountRecord {
    fn to_domain(self) -> UserAccount {
        UserAccount {
            user_id: self.user_id,
            email: self.email,
            referral_code: self.referral_code,
            referred_by: self.referred_by,
            is_ambassador: self.is_ambassador,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct MiningStateRecord {
    user_id: Uuid,
    balance: f64,
    hashrate: f64,
    is_mining: bool,
    mining_start_time: Option<DateTime<Utc>>,
    last_claim_time: Option<DateTime<Utc>>,
    last_spin_date: Option<DateTime<Utc>>,
}
impl MiningStateRecord {
    fn to_domain(self) -> UserMiningState {
        UserMiningState {
            user_id: self.user_id,
            balance: self.balance,
            hashrate: self.hashrate,
            is_mining: self.is_mining,
            mining_start_time: self.mining_start_time,
            last_claim_time: self.last_claim_time,
            last_spin_date: self.last_spin_date,
        }
    }
}

#[derive(FromRow)]
struct MiningSessionRecord {
    id: Uuid,
    user_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    hash_rate: f64,
    tokens_earned: f64,
    claimed_at: Option<DateTime<Utc>>,
    is_active: bool,
}
impl MiningSessionRecord {
    fn to_domain(self) -> MiningSession {
        MiningSession {
            id: self.id,
            user_id: self.user_id,
            start_time: self.start_time,
            end_time: self.end_time,
            hash_rate: self.hash_rate,
            tokens_earned: self.tokens_earned,
            claimed_at: self.claimed_at,
            is_active: self.is_active,
        }
    }
}

#[derive(FromRow)]
struct StreakRecord {
    user_id: Uuid,
    current_streak: i32,
    highest_streak: i32,
    start_date: NaiveDate,
    last_login: NaiveDate,
    achieved_milestones: Vec<i32>,
}
impl StreakRecord {
    fn to_domain(self) -> UserStreak {
        UserStreak {
            user_id: self.user_id,
            current_streak: self.current_streak.max(0) as u32,
            highest_streak: self.highest_streak.max(0) as u32,
            start_date: self.start_date,
            last_login: self.last_login,
            achieved_milestones: self
                .achieved_milestones
                .into_iter()
                .filter(|d| *d > 0)
                .map(|d| d as u32)
                .collect(),
        }
    }
}

#[derive(FromRow)]
struct LedgerRecord {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    amount: f64,
    created_at: DateTime<Utc>,
}
impl LedgerRecord {
    fn to_domain(self) -> LedgerEntry {
        let kind = match self.kind.as_str() {
            "MINING_CLAIM" => CreditKind::MiningClaim,
            "STREAK_CLAIM" => CreditKind::StreakClaim,
            "SPIN_REWARD" => CreditKind::SpinReward,
            _ => CreditKind::ReferralBonus,
        };
        LedgerEntry {
            id: self.id,
            user_id: self.user_id,
            kind,
            amount: self.amount,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// Transaction Helpers
//=========================================================================================

const SELECT_MINING_STATE_FOR_UPDATE: &str = "SELECT user_id, balance, hashrate, is_mining, \
     mining_start_time, last_claim_time, last_spin_date FROM users WHERE user_id = $1 FOR UPDATE";

impl DbAdapter {
    /// Locks and loads the user's mining-state row inside `tx`.
    async fn lock_mining_state(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> CoreResult<UserMiningState> {
        let record = sqlx::query_as::<_, MiningStateRecord>(SELECT_MINING_STATE_FOR_UPDATE)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(unexpected)?
            .ok_or(CoreError::UserNotFound)?;
        Ok(record.to_domain())
    }

    /// Writes back the mutable mining-state columns inside `tx`.
    async fn save_mining_state(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        state: &UserMiningState,
    ) -> CoreResult<()> {
        sqlx::query(
            "UPDATE users SET balance = $1, hashrate = $2, is_mining = $3, \
             mining_start_time = $4, last_claim_time = $5, last_spin_date = $6, \
             updated_at = NOW() WHERE user_id = $7",
        )
        .bind(state.balance)
        .bind(state.hashrate)
        .bind(state.is_mining)
        .bind(state.mining_start_time)
        .bind(state.last_claim_time)
        .bind(state.last_spin_date)
        .bind(state.user_id)
        .execute(&mut **tx)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    /// Appends a ledger entry inside `tx`, same unit as the balance change.
    async fn append_ledger(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        kind: CreditKind,
        amount: f64,
    ) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO ledger_entries (id, user_id, kind, amount) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(kind.as_str())
        .bind(amount)
        .execute(&mut **tx)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `MiningStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl MiningStore for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        legacy: Option<LegacySnapshot>,
    ) -> CoreResult<UserAccount> {
        let user_id = Uuid::new_v4();
        let state = match &legacy {
            Some(snapshot) => UserMiningState::from_snapshot(user_id, snapshot),
            None => UserMiningState::fresh(user_id),
        };
        let is_ambassador = legacy.as_ref().map(|l| l.is_ambassador).unwrap_or(false);
        let created_at = legacy
            .as_ref()
            .and_then(|l| l.created_at)
            .unwrap_or_else(Utc::now);

        let record = sqlx::query_as::<_, AccountRecord>(
            "INSERT INTO users (user_id, email, hashed_password, referral_code, is_ambassador, \
             balance, hashrate, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING user_id, email, referral_code, referred_by, is_ambassador, created_at",
        )
        .bind(user_id)
        .bind(email)
        .bind(hashed_password)
        .bind(generate_referral_code())
        .bind(is_ambassador)
        .bind(state.balance)
        .bind(state.hashrate)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::InvalidInput("email is already registered".to_string())
            } else {
                unexpected(e)
            }
        })?;

        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> CoreResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(CoreError::UserNotFound)?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> CoreResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> CoreResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(CoreError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_account(&self, user_id: Uuid) -> CoreResult<UserAccount> {
        let record = sqlx::query_as::<_, AccountRecord>(
            "SELECT user_id, email, referral_code, referred_by, is_ambassador, created_at \
             FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(CoreError::UserNotFound)?;
        Ok(record.to_domain())
    }

    async fn mining_state(&self, user_id: Uuid) -> CoreResult<UserMiningState> {
        let record = sqlx::query_as::<_, MiningStateRecord>(
            "SELECT user_id, balance, hashrate, is_mining, mining_start_time, last_claim_time, \
             last_spin_date FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(CoreError::UserNotFound)?;
        Ok(record.to_domain())
    }

    async fn start_mining(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<UserMiningState> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut state = self.lock_mining_state(&mut tx, user_id).await?;
        session::start(&self.accrual, &mut state, now)?;
        self.save_mining_state(&mut tx, &state).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(state)
    }

    async fn stop_mining(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<UserMiningState> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut state = self.lock_mining_state(&mut tx, user_id).await?;
        session::stop(&self.accrual, &mut state, now)?;
        self.save_mining_state(&mut tx, &state).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(state)
    }

    async fn claim_mining(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<ClaimOutcome> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut state = self.lock_mining_state(&mut tx, user_id).await?;
        let outcome = session::claim(&self.accrual, &mut state, now)?;

        self.save_mining_state(&mut tx, &state).await?;

        let s = &outcome.session;
        sqlx::query(
            "INSERT INTO mining_sessions (id, user_id, start_time, end_time, hash_rate, \
             tokens_earned, claimed_at, is_active) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(s.id)
        .bind(s.user_id)
        .bind(s.start_time)
        .bind(s.end_time)
        .bind(s.hash_rate)
        .bind(s.tokens_earned)
        .bind(s.claimed_at)
        .bind(s.is_active)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        self.append_ledger(&mut tx, user_id, CreditKind::MiningClaim, outcome.tokens_earned)
            .await?;

        tx.commit().await.map_err(unexpected)?;
        Ok(outcome)
    }

    async fn set_hashrate(&self, user_id: Uuid, hashrate: f64) -> CoreResult<UserMiningState> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut state = self.lock_mining_state(&mut tx, user_id).await?;
        session::set_hashrate(&mut state, hashrate)?;
        self.save_mining_state(&mut tx, &state).await?;
        tx.commit().await.map_err(unexpected)?;
        Ok(state)
    }

    async fn mining_history(&self, user_id: Uuid) -> CoreResult<Vec<MiningSession>> {
        let records = sqlx::query_as::<_, MiningSessionRecord>(
            "SELECT id, user_id, start_time, end_time, hash_rate, tokens_earned, claimed_at, \
             is_active FROM mining_sessions WHERE user_id = $1 ORDER BY start_time DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn touch_streak(&self, user_id: Uuid, today: NaiveDate) -> CoreResult<UserStreak> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // The user row anchors serialization for streak writes too.
        self.lock_mining_state(&mut tx, user_id).await?;

        let existing = sqlx::query_as::<_, StreakRecord>(
            "SELECT user_id, current_streak, highest_streak, start_date, last_login, \
             achieved_milestones FROM user_streaks WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .map(|r| r.to_domain());

        let updated = streak::touch(existing, user_id, today);

        sqlx::query(
            "INSERT INTO user_streaks (user_id, current_streak, highest_streak, start_date, \
             last_login, achieved_milestones) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (user_id) DO UPDATE SET current_streak = $2, highest_streak = $3, \
             start_date = $4, last_login = $5, achieved_milestones = $6",
        )
        .bind(updated.user_id)
        .bind(updated.current_streak as i32)
        .bind(updated.highest_streak as i32)
        .bind(updated.start_date)
        .bind(updated.last_login)
        .bind(
            updated
                .achieved_milestones
                .iter()
                .map(|d| *d as i32)
                .collect::<Vec<i32>>(),
        )
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(updated)
    }

    async fn claim_streak(&self, user_id: Uuid) -> CoreResult<StreakClaimOutcome> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut state = self.lock_mining_state(&mut tx, user_id).await?;

        let mut record = sqlx::query_as::<_, StreakRecord>(
            "SELECT user_id, current_streak, highest_streak, start_date, last_login, \
             achieved_milestones FROM user_streaks WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .map(|r| r.to_domain())
        .ok_or(CoreError::NoUnclaimedRewards)?;

        let claim = streak::claim(&mut record)?;
        state.balance += claim.total_reward;

        self.save_mining_state(&mut tx, &state).await?;
        sqlx::query("UPDATE user_streaks SET achieved_milestones = $1 WHERE user_id = $2")
            .bind(
                record
                    .achieved_milestones
                    .iter()
                    .map(|d| *d as i32)
                    .collect::<Vec<i32>>(),
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        self.append_ledger(&mut tx, user_id, CreditKind::StreakClaim, claim.total_reward)
            .await?;

        tx.commit().await.map_err(unexpected)?;
        Ok(StreakClaimOutcome {
            claim,
            streak: record,
            new_balance: state.balance,
        })
    }

    async fn record_spin(
        &self,
        user_id: Uuid,
        reward: u32,
        now: DateTime<Utc>,
    ) -> CoreResult<SpinOutcome> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let mut state = self.lock_mining_state(&mut tx, user_id).await?;

        // The (user_id, spin_day) unique key is the real daily-spin guard;
        // a duplicate insert fails here no matter how the request raced.
        let spin_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO user_spins (id, user_id, reward, spin_date, spin_day) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(spin_id)
        .bind(user_id)
        .bind(reward as i32)
        .bind(now)
        .bind(now.date_naive())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                CoreError::AlreadySpunToday {
                    reset_in_secs: wheel::seconds_until_reset(now),
                }
            } else {
                unexpected(e)
            }
        })?;

        if reward > 0 {
            state.balance += reward as f64;
            self.append_ledger(&mut tx, user_id, CreditKind::SpinReward, reward as f64)
                .await?;
        }
        state.last_spin_date = Some(now);
        self.save_mining_state(&mut tx, &state).await?;

        tx.commit().await.map_err(unexpected)?;
        Ok(SpinOutcome {
            spin_id,
            reward,
            new_balance: state.balance,
        })
    }

    async fn redeem_referral(&self, user_id: Uuid, code: &str) -> CoreResult<ReferralOutcome> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let referrer_id: Uuid = sqlx::query_scalar(
            "SELECT user_id FROM users WHERE referral_code = $1",
        )
        .bind(code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| CoreError::InvalidInput("invalid referral code".to_string()))?;

        if referrer_id == user_id {
            return Err(CoreError::SelfReferral);
        }

        // Both user rows get locked; always in ascending id order, so two
        // users redeeming each other's codes cannot deadlock.
        let mut referrer = if user_id < referrer_id {
            self.lock_mining_state(&mut tx, user_id).await?;
            self.lock_mining_state(&mut tx, referrer_id).await?
        } else {
            let referrer = self.lock_mining_state(&mut tx, referrer_id).await?;
            self.lock_mining_state(&mut tx, user_id).await?;
            referrer
        };

        let referred_by: Option<Uuid> =
            sqlx::query_scalar("SELECT referred_by FROM users WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(unexpected)?;
        if referred_by.is_some() {
            return Err(CoreError::AlreadyReferred);
        }

        sqlx::query("UPDATE users SET referred_by = $1, updated_at = NOW() WHERE user_id = $2")
            .bind(referrer_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        let bonus = mining_core::domain::REFERRAL_BONUS;
        referrer.balance += bonus;
        self.save_mining_state(&mut tx, &referrer).await?;
        self.append_ledger(&mut tx, referrer_id, CreditKind::ReferralBonus, bonus)
            .await?;

        tx.commit().await.map_err(unexpected)?;
        Ok(ReferralOutcome { referrer_id, bonus })
    }

    async fn referral_stats(&self, user_id: Uuid) -> CoreResult<ReferralStats> {
        let referral_code: String =
            sqlx::query_scalar("SELECT referral_code FROM users WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?
                .ok_or(CoreError::UserNotFound)?;

        let referred_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE referred_by = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;

        Ok(ReferralStats {
            referral_code,
            referred_count: referred_count.max(0) as u64,
        })
    }

    async fn ledger(&self, user_id: Uuid, limit: i64) -> CoreResult<Vec<LedgerEntry>> {
        let records = sqlx::query_as::<_, LedgerRecord>(
            "SELECT id, user_id, kind, amount, created_at FROM ledger_entries \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
