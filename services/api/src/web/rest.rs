//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, aggregating every
//! REST endpoint and its schemas.

use utoipa::OpenApi;

use crate::web::{auth, mining, protocol, referral, spin, streak, wallet};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        mining::mining_status_handler,
        mining::start_mining_handler,
        mining::stop_mining_handler,
        mining::claim_mining_handler,
        mining::set_hashrate_handler,
        mining::mining_history_handler,
        streak::streak_handler,
        streak::claim_streak_handler,
        spin::spin_handler,
        referral::referral_stats_handler,
        referral::redeem_referral_handler,
        wallet::wallet_handler,
    ),
    components(
        schemas(
            protocol::ErrorBody,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::LegacySnapshotRequest,
            auth::AuthResponse,
            auth::ProfileResponse,
            mining::MiningStatusResponse,
            mining::MiningActionResponse,
            mining::ClaimResponse,
            mining::HashrateRequest,
            mining::HashrateResponse,
            mining::SessionHistoryEntry,
            mining::HistoryResponse,
            streak::MilestoneView,
            streak::StreakResponse,
            streak::StreakClaimResponse,
            spin::SegmentView,
            spin::SpinResponse,
            referral::ReferralStatsResponse,
            referral::RedeemReferralRequest,
            referral::RedeemReferralResponse,
            wallet::LedgerEntryView,
            wallet::WalletResponse,
        )
    ),
    tags(
        (name = "Mining Rewards API", description = "API endpoints for the gamified mining rewards service.")
    )
)]
pub struct ApiDoc;
