//! services/api/src/web/wallet.rs
//!
//! Wallet summary: current balance plus the most recent credit events.

use axum::{extract::State, response::IntoResponse, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::protocol::Failure;
use crate::web::state::AppState;

const LEDGER_PAGE_SIZE: i64 = 50;

#[derive(Serialize, ToSchema)]
pub struct LedgerEntryView {
    pub id: Uuid,
    /// Credit path: MINING_CLAIM, STREAK_CLAIM, SPIN_REWARD or REFERRAL_BONUS.
    pub kind: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct WalletResponse {
    pub success: bool,
    pub balance: f64,
    pub entries: Vec<LedgerEntryView>,
}

/// Get the authenticated user's balance and recent credits.
#[utoipa::path(
    get,
    path = "/wallet",
    responses(
        (status = 200, description = "Balance and recent ledger entries", body = WalletResponse),
        (status = 401, description = "Unauthenticated"),
        (status = 404, description = "User not found")
    )
)]
pub async fn wallet_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Failure> {
    let mining = state.store.mining_state(user_id).await?;
    let entries = state.store.ledger(user_id, LEDGER_PAGE_SIZE).await?;

    Ok(Json(WalletResponse {
        success: true,
        balance: mining.balance,
        entries: entries
            .into_iter()
            .map(|e| LedgerEntryView {
                id: e.id,
                kind: e.kind.as_str().to_string(),
                amount: e.amount,
                created_at: e.created_at,
            })
            .collect(),
    }))
}
