//! services/api/src/web/mining.rs
//!
//! Mining session endpoints: status display, start, stop, claim, hashrate
//! upgrade, and session history.
//!
//! Accrual shown by the status endpoint is server-authoritative: it is
//! derived from the stored start timestamp and the current time on every
//! request, never advanced by a client-side counter.

use axum::{extract::State, response::IntoResponse, Extension, Json};
use chrono::{DateTime, Utc};
use mining_core::{accrual, session, MiningPhase};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::protocol::Failure;
use crate::web::state::AppState;

//=========================================================================================
// Response and Payload Structs
//=========================================================================================

/// Server-authoritative snapshot of the user's mining state, suitable for
/// display polling.
#[derive(Serialize, ToSchema)]
pub struct MiningStatusResponse {
    pub success: bool,
    pub balance: f64,
    pub hashrate: f64,
    /// One of `idle`, `mining`, `claimable`.
    pub phase: String,
    pub is_mining: bool,
    pub is_claimable: bool,
    /// Tokens accrued so far in the open session (0 when idle).
    pub accrued: f64,
    /// Session progress in percent, 0..=100.
    pub progress: f64,
    /// Time left in the session, formatted `HH:MM:SS`.
    pub time_remaining: String,
    /// Tokens a full session yields at the current hashrate.
    pub expected_reward: f64,
    pub mining_start_time: Option<DateTime<Utc>>,
    pub last_claim_time: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct MiningActionResponse {
    pub success: bool,
    pub is_mining: bool,
    pub mining_start_time: Option<DateTime<Utc>>,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ClaimResponse {
    pub success: bool,
    pub tokens_added: f64,
    pub new_balance: f64,
    pub message: String,
}

#[derive(Deserialize, ToSchema)]
pub struct HashrateRequest {
    pub hashrate: f64,
}

#[derive(Serialize, ToSchema)]
pub struct HashrateResponse {
    pub success: bool,
    pub hashrate: f64,
    pub expected_reward: f64,
}

#[derive(Serialize, ToSchema)]
pub struct SessionHistoryEntry {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub hash_rate: f64,
    pub tokens_earned: f64,
    pub claimed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    pub success: bool,
    pub sessions: Vec<SessionHistoryEntry>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Get the current mining status for the authenticated user.
#[utoipa::path(
    get,
    path = "/mining",
    responses(
        (status = 200, description = "Current mining state", body = MiningStatusResponse),
        (status = 401, description = "Unauthenticated"),
        (status = 404, description = "User not found")
    )
)]
pub async fn mining_status_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Failure> {
    let mining = state.store.mining_state(user_id).await?;
    let cfg = state.accrual();
    let now = Utc::now();

    let phase = session::phase(&cfg, &mining, now);
    let (accrued, progress, remaining) = match mining.mining_start_time {
        None => (0.0, 0.0, 0),
        Some(start) => {
            let acc = accrual::compute(&cfg, mining.hashrate, start, now);
            (acc.accrued, acc.progress, accrual::remaining_ms(&cfg, start, now))
        }
    };

    Ok(Json(MiningStatusResponse {
        success: true,
        balance: mining.balance,
        hashrate: mining.hashrate,
        phase: phase_label(phase).to_string(),
        is_mining: phase == MiningPhase::Mining,
        is_claimable: phase == MiningPhase::Claimable,
        accrued,
        progress: progress * 100.0,
        time_remaining: format_hms(remaining),
        expected_reward: cfg.max_mineable(mining.hashrate),
        mining_start_time: mining.mining_start_time,
        last_claim_time: mining.last_claim_time,
    }))
}

/// Start a new mining session.
#[utoipa::path(
    post,
    path = "/mining/start",
    responses(
        (status = 200, description = "Mining started", body = MiningActionResponse),
        (status = 409, description = "A session is already open")
    )
)]
pub async fn start_mining_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Failure> {
    let mining = state.store.start_mining(user_id, Utc::now()).await?;
    Ok(Json(MiningActionResponse {
        success: true,
        is_mining: mining.is_mining,
        mining_start_time: mining.mining_start_time,
        message: "Mining started successfully".to_string(),
    }))
}

/// Stop the open mining session, forfeiting unclaimed accrual.
#[utoipa::path(
    post,
    path = "/mining/stop",
    responses(
        (status = 200, description = "Mining stopped", body = MiningActionResponse),
        (status = 400, description = "No session to stop, or session already complete")
    )
)]
pub async fn stop_mining_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Failure> {
    let mining = state.store.stop_mining(user_id, Utc::now()).await?;
    Ok(Json(MiningActionResponse {
        success: true,
        is_mining: mining.is_mining,
        mining_start_time: mining.mining_start_time,
        message: "Mining stopped successfully".to_string(),
    }))
}

/// Claim a completed mining session.
#[utoipa::path(
    post,
    path = "/mining/claim",
    responses(
        (status = 200, description = "Tokens claimed", body = ClaimResponse),
        (status = 400, description = "Session incomplete or no session open")
    )
)]
pub async fn claim_mining_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Failure> {
    let outcome = state.store.claim_mining(user_id, Utc::now()).await?;
    Ok(Json(ClaimResponse {
        success: true,
        tokens_added: outcome.tokens_earned,
        new_balance: outcome.new_balance,
        message: "Tokens claimed successfully".to_string(),
    }))
}

/// Update the user's hashrate (e.g. after a booster purchase). Rejected
/// while a session is open, so the rate a session ran at is the rate it
/// pays out at.
#[utoipa::path(
    put,
    path = "/mining/hashrate",
    request_body = HashrateRequest,
    responses(
        (status = 200, description = "Hashrate updated", body = HashrateResponse),
        (status = 400, description = "Hashrate below the allowed floor"),
        (status = 409, description = "A session is open; claim or stop it first")
    )
)]
pub async fn set_hashrate_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<HashrateRequest>,
) -> Result<impl IntoResponse, Failure> {
    let mining = state.store.set_hashrate(user_id, req.hashrate).await?;
    Ok(Json(HashrateResponse {
        success: true,
        hashrate: mining.hashrate,
        expected_reward: state.accrual().max_mineable(mining.hashrate),
    }))
}

/// List the user's closed mining sessions, newest first.
#[utoipa::path(
    get,
    path = "/mining/history",
    responses(
        (status = 200, description = "Session history", body = HistoryResponse)
    )
)]
pub async fn mining_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Failure> {
    let sessions = state.store.mining_history(user_id).await?;
    Ok(Json(HistoryResponse {
        success: true,
        sessions: sessions
            .into_iter()
            .map(|s| SessionHistoryEntry {
                id: s.id,
                start_time: s.start_time,
                end_time: s.end_time,
                hash_rate: s.hash_rate,
                tokens_earned: s.tokens_earned,
                claimed_at: s.claimed_at,
            })
            .collect(),
    }))
}

fn phase_label(phase: MiningPhase) -> &'static str {
    match phase {
        MiningPhase::Idle => "idle",
        MiningPhase::Mining => "mining",
        MiningPhase::Claimable => "claimable",
    }
}

/// Formats milliseconds as `HH:MM:SS`.
fn format_hms(milliseconds: i64) -> String {
    let total_seconds = milliseconds / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_milliseconds_as_clock_time() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(61_000), "00:01:01");
        assert_eq!(format_hms(23 * 3_600_000 + 59 * 60_000 + 59_000), "23:59:59");
    }
}
