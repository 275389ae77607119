//! Integration tests for the `MiningStore` contract, driven through the
//! in-memory adapter. These cover the cross-operation guarantees: claims
//! never double-credit, spins are exclusive per day, and referral guards
//! leave balances untouched.

use api_lib::adapters::MemoryStore;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use mining_core::{AccrualConfig, CoreError, CreditKind, LegacySnapshot, MiningStore};
use std::sync::Arc;
use uuid::Uuid;

fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(AccrualConfig::default()))
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

async fn signup(store: &MemoryStore, email: &str) -> Uuid {
    store
        .create_user_with_email(email, "argon2-hash", None)
        .await
        .unwrap()
        .user_id
}

#[tokio::test]
async fn start_wait_claim_round_trip() {
    let store = store();
    let user = signup(&store, "miner@example.com").await;

    store
        .set_hashrate(user, 100.0)
        .await
        .unwrap();
    let balance_before = store.mining_state(user).await.unwrap().balance;

    store.start_mining(user, t0()).await.unwrap();
    let outcome = store
        .claim_mining(user, t0() + Duration::hours(24))
        .await
        .unwrap();

    assert_eq!(outcome.tokens_earned, 100.0);
    assert_eq!(outcome.new_balance, balance_before + 100.0);

    let state = store.mining_state(user).await.unwrap();
    assert!(!state.is_mining);
    assert!(state.mining_start_time.is_none());

    let history = store.mining_history(user).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].tokens_earned, 100.0);
    assert!(!history[0].is_active);
}

#[tokio::test]
async fn concurrent_duplicate_claims_credit_exactly_once() {
    let store = store();
    let user = signup(&store, "racer@example.com").await;
    store.start_mining(user, t0()).await.unwrap();

    let claim_time = t0() + Duration::hours(25);
    let a = tokio::spawn({
        let store = store.clone();
        async move { store.claim_mining(user, claim_time).await }
    });
    let b = tokio::spawn({
        let store = store.clone();
        async move { store.claim_mining(user, claim_time).await }
    });

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    // The loser saw the post-claim Idle state.
    let failure = results.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        failure.as_ref().unwrap_err(),
        CoreError::NoActiveSession
    ));

    let state = store.mining_state(user).await.unwrap();
    assert_eq!(
        state.balance,
        AccrualConfig::default().max_mineable(state.hashrate)
    );
}

#[tokio::test]
async fn claim_before_completion_is_rejected() {
    let store = store();
    let user = signup(&store, "early@example.com").await;
    store.start_mining(user, t0()).await.unwrap();

    let err = store
        .claim_mining(user, t0() + Duration::hours(12))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotClaimable));
    assert_eq!(store.mining_state(user).await.unwrap().balance, 0.0);
}

#[tokio::test]
async fn hashrate_upgrade_mid_session_is_rejected_and_claim_pays_the_run_rate() {
    let store = store();
    let user = signup(&store, "upgrader@example.com").await;
    store.start_mining(user, t0()).await.unwrap();

    // Bumping the rate while the session is open must not go through.
    let err = store.set_hashrate(user, 1000.0).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyMining));

    // Same once the session is complete but unclaimed.
    let err = store.set_hashrate(user, 1000.0).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyMining));

    // The claim pays the default rate the session ran at, not 1000.
    let outcome = store
        .claim_mining(user, t0() + Duration::hours(24))
        .await
        .unwrap();
    assert_eq!(outcome.tokens_earned, 10.0);

    // Idle again, the upgrade applies to the next session only.
    store.set_hashrate(user, 1000.0).await.unwrap();
    assert_eq!(store.mining_state(user).await.unwrap().hashrate, 1000.0);
}

#[tokio::test]
async fn second_start_conflicts_while_session_open() {
    let store = store();
    let user = signup(&store, "eager@example.com").await;
    store.start_mining(user, t0()).await.unwrap();

    let err = store
        .start_mining(user, t0() + Duration::hours(1))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AlreadyMining));
}

#[tokio::test]
async fn streak_claims_never_double_pay() {
    let store = store();
    let user = signup(&store, "streaker@example.com").await;

    // Log in eight days in a row.
    for d in 1..=8 {
        store.touch_streak(user, day(d)).await.unwrap();
    }
    let streak = store.touch_streak(user, day(8)).await.unwrap();
    assert_eq!(streak.current_streak, 8);

    let outcome = store.claim_streak(user).await.unwrap();
    assert_eq!(outcome.claim.total_reward, 10.0);
    assert_eq!(outcome.new_balance, 10.0);

    let err = store.claim_streak(user).await.unwrap_err();
    assert!(matches!(err, CoreError::NoUnclaimedRewards));
    assert_eq!(store.mining_state(user).await.unwrap().balance, 10.0);
}

#[tokio::test]
async fn second_spin_same_day_is_rejected() {
    let store = store();
    let user = signup(&store, "spinner@example.com").await;

    let first = store.record_spin(user, 50, t0()).await.unwrap();
    assert_eq!(first.reward, 50);
    assert_eq!(first.new_balance, 50.0);

    let err = store
        .record_spin(user, 100, t0() + Duration::hours(3))
        .await
        .unwrap_err();
    match err {
        CoreError::AlreadySpunToday { reset_in_secs } => {
            assert!(reset_in_secs > 0 && reset_in_secs <= 86_400);
        }
        other => panic!("expected AlreadySpunToday, got {:?}", other),
    }
    assert_eq!(store.mining_state(user).await.unwrap().balance, 50.0);

    // A new UTC day opens the wheel again.
    store
        .record_spin(user, 10, t0() + Duration::days(1))
        .await
        .unwrap();
}

#[tokio::test]
async fn zero_reward_spin_is_recorded_but_credits_nothing() {
    let store = store();
    let user = signup(&store, "unlucky@example.com").await;

    let outcome = store.record_spin(user, 0, t0()).await.unwrap();
    assert_eq!(outcome.reward, 0);
    assert_eq!(outcome.new_balance, 0.0);
    assert!(store.ledger(user, 10).await.unwrap().is_empty());

    // Still consumes the day.
    let err = store.record_spin(user, 0, t0()).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadySpunToday { .. }));
}

#[tokio::test]
async fn referral_guards_protect_balances() {
    let store = store();
    let referrer = signup(&store, "referrer@example.com").await;
    let friend = signup(&store, "friend@example.com").await;
    let code = store.referral_stats(referrer).await.unwrap().referral_code;

    // Self-referral credits nobody.
    let err = store.redeem_referral(referrer, &code).await.unwrap_err();
    assert!(matches!(err, CoreError::SelfReferral));
    assert_eq!(store.mining_state(referrer).await.unwrap().balance, 0.0);

    // A real redemption links and credits once.
    let outcome = store.redeem_referral(friend, &code).await.unwrap();
    assert_eq!(outcome.referrer_id, referrer);
    assert_eq!(store.mining_state(referrer).await.unwrap().balance, 10.0);
    assert_eq!(store.referral_stats(referrer).await.unwrap().referred_count, 1);

    // A second link attempt is rejected and nothing more is paid.
    let other = signup(&store, "other@example.com").await;
    let other_code = store.referral_stats(other).await.unwrap().referral_code;
    let err = store.redeem_referral(friend, &other_code).await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyReferred));
    assert_eq!(store.mining_state(other).await.unwrap().balance, 0.0);
    assert_eq!(store.mining_state(referrer).await.unwrap().balance, 10.0);
}

#[tokio::test]
async fn mutual_redemptions_resolve_cleanly() {
    let store = store();
    let alice = signup(&store, "alice@example.com").await;
    let bob = signup(&store, "bob@example.com").await;
    let alice_code = store.referral_stats(alice).await.unwrap().referral_code;
    let bob_code = store.referral_stats(bob).await.unwrap().referral_code;

    // Each redeems the other's code at the same time; both must settle
    // without either request erroring out.
    let a = tokio::spawn({
        let store = store.clone();
        async move { store.redeem_referral(alice, &bob_code).await }
    });
    let b = tokio::spawn({
        let store = store.clone();
        async move { store.redeem_referral(bob, &alice_code).await }
    });
    assert!(a.await.unwrap().is_ok());
    assert!(b.await.unwrap().is_ok());

    assert_eq!(store.mining_state(alice).await.unwrap().balance, 10.0);
    assert_eq!(store.mining_state(bob).await.unwrap().balance, 10.0);
}

#[tokio::test]
async fn account_profile_is_retrievable() {
    let store = store();
    let user = signup(&store, "profile@example.com").await;

    let account = store.get_account(user).await.unwrap();
    assert_eq!(account.user_id, user);
    assert_eq!(account.email.as_deref(), Some("profile@example.com"));
    assert_eq!(account.referral_code.len(), 8);
    assert!(account.referred_by.is_none());
    assert!(!account.is_ambassador);
}

#[tokio::test]
async fn legacy_snapshot_seeds_initial_state() {
    let store = store();
    let account = store
        .create_user_with_email(
            "migrated@example.com",
            "argon2-hash",
            Some(LegacySnapshot {
                balance: 1234.5,
                hashrate: 40.0,
                is_ambassador: true,
                created_at: None,
            }),
        )
        .await
        .unwrap();

    assert!(account.is_ambassador);
    let state = store.mining_state(account.user_id).await.unwrap();
    assert_eq!(state.balance, 1234.5);
    assert_eq!(state.hashrate, 40.0);
}

#[tokio::test]
async fn ledger_records_every_credit_path() {
    let store = store();
    let user = signup(&store, "ledger@example.com").await;

    // Mining claim and spin reward.
    store.start_mining(user, t0()).await.unwrap();
    store
        .claim_mining(user, t0() + Duration::hours(24))
        .await
        .unwrap();
    store.record_spin(user, 20, t0() + Duration::days(2)).await.unwrap();

    // Streak claim after a week of logins.
    for d in 1..=7 {
        store.touch_streak(user, day(d)).await.unwrap();
    }
    store.claim_streak(user).await.unwrap();

    // Referral bonus from a friend redeeming this user's code.
    let friend = signup(&store, "ledger-friend@example.com").await;
    let code = store.referral_stats(user).await.unwrap().referral_code;
    store.redeem_referral(friend, &code).await.unwrap();

    let entries = store.ledger(user, 10).await.unwrap();
    assert_eq!(entries.len(), 4);
    for kind in [
        CreditKind::MiningClaim,
        CreditKind::SpinReward,
        CreditKind::StreakClaim,
        CreditKind::ReferralBonus,
    ] {
        assert!(entries.iter().any(|e| e.kind == kind));
    }

    let total: f64 = entries.iter().map(|e| e.amount).sum();
    assert_eq!(total, store.mining_state(user).await.unwrap().balance);
}

#[tokio::test]
async fn unknown_user_is_reported_as_not_found() {
    let store = store();
    let err = store.mining_state(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CoreError::UserNotFound));

    let err = store.start_mining(Uuid::new_v4(), t0()).await.unwrap_err();
    assert!(matches!(err, CoreError::UserNotFound));

    let err = store.claim_streak(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, CoreError::UserNotFound));
}
