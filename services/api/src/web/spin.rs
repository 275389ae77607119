//! services/api/src/web/spin.rs
//!
//! The daily reward wheel. One spin per user per UTC day; the uniqueness
//! is enforced by the store, not by the pre-check here. A sliding-window
//! rate limiter throttles hammering ahead of the daily rule.

use axum::{extract::State, response::IntoResponse, Extension, Json};
use chrono::Utc;
use mining_core::{wheel, CoreError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::protocol::Failure;
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct SegmentView {
    pub reward: u32,
    pub weight: u32,
}

#[derive(Serialize, ToSchema)]
pub struct SpinResponse {
    pub success: bool,
    pub reward: u32,
    pub new_balance: f64,
    pub message: String,
    pub spin_id: Uuid,
    /// Seconds until the next spin becomes available (UTC midnight).
    pub next_spin_in_secs: i64,
    /// The wheel layout, for frontend display sync.
    pub segments: Vec<SegmentView>,
}

/// Spin the daily reward wheel.
#[utoipa::path(
    post,
    path = "/spin",
    responses(
        (status = 200, description = "Spin recorded and reward credited", body = SpinResponse),
        (status = 409, description = "Already spun today"),
        (status = 429, description = "Too many attempts")
    )
)]
pub async fn spin_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Failure> {
    // Throttle before touching the datastore.
    state
        .limiter
        .check(
            &format!("spin:{}", user_id),
            state.config.spin_attempts_per_minute,
            Duration::from_secs(60),
        )
        .map_err(|retry_after_secs| CoreError::RateLimited { retry_after_secs })?;

    let now = Utc::now();
    let reward = wheel::select(&mut rand::thread_rng());
    let outcome = state.store.record_spin(user_id, reward, now).await?;

    info!(
        user_id = %user_id,
        reward = outcome.reward,
        new_balance = outcome.new_balance,
        "spin completed"
    );

    let message = if outcome.reward > 0 {
        format!("Congratulations! You won {} tokens!", outcome.reward)
    } else {
        "Better luck next time! Try again tomorrow.".to_string()
    };

    Ok(Json(SpinResponse {
        success: true,
        reward: outcome.reward,
        new_balance: outcome.new_balance,
        message,
        spin_id: outcome.spin_id,
        next_spin_in_secs: wheel::seconds_until_reset(now),
        segments: wheel::SEGMENTS
            .iter()
            .map(|s| SegmentView {
                reward: s.reward,
                weight: s.weight,
            })
            .collect(),
    }))
}
