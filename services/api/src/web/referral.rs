//! services/api/src/web/referral.rs
//!
//! Referral endpoints: view your own code and redeem someone else's.
//! Linking the new user and crediting the referrer commit together.

use axum::{extract::State, response::IntoResponse, Extension, Json};
use mining_core::CoreError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::protocol::Failure;
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct ReferralStatsResponse {
    pub success: bool,
    pub referral_code: String,
    pub referred_count: u64,
}

#[derive(Deserialize, ToSchema)]
pub struct RedeemReferralRequest {
    pub code: String,
}

#[derive(Serialize, ToSchema)]
pub struct RedeemReferralResponse {
    pub success: bool,
    pub bonus: f64,
    pub message: String,
}

/// Get the authenticated user's referral code and signup count.
#[utoipa::path(
    get,
    path = "/referral",
    responses(
        (status = 200, description = "Referral stats", body = ReferralStatsResponse),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn referral_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Failure> {
    let stats = state.store.referral_stats(user_id).await?;
    Ok(Json(ReferralStatsResponse {
        success: true,
        referral_code: stats.referral_code,
        referred_count: stats.referred_count,
    }))
}

/// Redeem a referral code, linking this user and crediting the referrer.
#[utoipa::path(
    post,
    path = "/referral",
    request_body = RedeemReferralRequest,
    responses(
        (status = 200, description = "Referral linked and bonus credited", body = RedeemReferralResponse),
        (status = 400, description = "Invalid or own code"),
        (status = 409, description = "Already linked to a referrer")
    )
)]
pub async fn redeem_referral_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<RedeemReferralRequest>,
) -> Result<impl IntoResponse, Failure> {
    let code = req.code.trim();
    if code.is_empty() {
        return Err(CoreError::InvalidInput("referral code is required".to_string()).into());
    }

    let outcome = state.store.redeem_referral(user_id, code).await?;
    Ok(Json(RedeemReferralResponse {
        success: true,
        bonus: outcome.bonus,
        message: "Referral processed successfully".to_string(),
    }))
}
