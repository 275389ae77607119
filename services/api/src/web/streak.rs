//! services/api/src/web/streak.rs
//!
//! Daily-login streak endpoints. Fetching the streak also counts today's
//! login; claiming pays out every milestone reached but not yet paid.

use axum::{extract::State, response::IntoResponse, Extension, Json};
use chrono::Utc;
use mining_core::streak;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::protocol::Failure;
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct MilestoneView {
    pub days: u32,
    pub rank: String,
    pub reward: f64,
}

impl From<streak::Milestone> for MilestoneView {
    fn from(m: streak::Milestone) -> Self {
        Self {
            days: m.days,
            rank: m.rank.to_string(),
            reward: m.reward,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StreakResponse {
    pub success: bool,
    pub current_streak: u32,
    pub highest_streak: u32,
    pub current_rank: String,
    pub unclaimed_milestones: Vec<MilestoneView>,
    pub next_milestone: Option<MilestoneView>,
}

#[derive(Serialize, ToSchema)]
pub struct StreakClaimResponse {
    pub success: bool,
    pub claimed_rewards: Vec<MilestoneView>,
    pub total_reward: f64,
    pub new_balance: f64,
}

/// Register today's login and report the streak state.
#[utoipa::path(
    get,
    path = "/streak",
    responses(
        (status = 200, description = "Streak state after counting today's login", body = StreakResponse),
        (status = 401, description = "Unauthenticated"),
        (status = 404, description = "User not found")
    )
)]
pub async fn streak_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Failure> {
    // Calendar days are UTC days everywhere in the streak logic.
    let today = Utc::now().date_naive();
    let record = state.store.touch_streak(user_id, today).await?;

    Ok(Json(StreakResponse {
        success: true,
        current_streak: record.current_streak,
        highest_streak: record.highest_streak,
        current_rank: streak::current_rank(record.current_streak).to_string(),
        unclaimed_milestones: streak::unclaimed_milestones(&record)
            .into_iter()
            .map(MilestoneView::from)
            .collect(),
        next_milestone: streak::next_milestone(record.current_streak).map(MilestoneView::from),
    }))
}

/// Claim every eligible, unpaid streak milestone.
#[utoipa::path(
    post,
    path = "/streak/claim",
    responses(
        (status = 200, description = "Milestone rewards credited", body = StreakClaimResponse),
        (status = 400, description = "Nothing to claim")
    )
)]
pub async fn claim_streak_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Failure> {
    let outcome = state.store.claim_streak(user_id).await?;
    Ok(Json(StreakClaimResponse {
        success: true,
        claimed_rewards: outcome
            .claim
            .milestones
            .iter()
            .copied()
            .map(MilestoneView::from)
            .collect(),
        total_reward: outcome.claim.total_reward,
        new_balance: outcome.new_balance,
    }))
}
