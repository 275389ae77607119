//! services/api/src/web/protocol.rs
//!
//! The JSON envelope shared by every endpoint, and the single boundary
//! where core errors are translated into HTTP responses.
//!
//! Success payloads carry `success: true` alongside their data; failures
//! are `{ success: false, error: <CODE>, message: <human text> }` with the
//! status code determined by the error taxonomy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use mining_core::CoreError;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// The failure envelope returned by every endpoint on error.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    /// Stable machine-readable code, e.g. `ALREADY_MINING`.
    pub error: String,
    /// Human-readable message safe to show to the user.
    pub message: String,
}

/// Wrapper that turns a `CoreError` into an HTTP response. Handlers return
/// `Result<_, Failure>` so `?` works directly on store calls.
pub struct Failure(pub CoreError);

impl<E: Into<CoreError>> From<E> for Failure {
    fn from(err: E) -> Self {
        Failure(err.into())
    }
}

fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::Unauthorized => StatusCode::UNAUTHORIZED,
        CoreError::UserNotFound => StatusCode::NOT_FOUND,
        CoreError::NotClaimable
        | CoreError::NoActiveSession
        | CoreError::SessionComplete
        | CoreError::NoUnclaimedRewards
        | CoreError::SelfReferral
        | CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CoreError::AlreadyMining
        | CoreError::AlreadySpunToday { .. }
        | CoreError::AlreadyReferred
        | CoreError::DuplicateClaim => StatusCode::CONFLICT,
        CoreError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        CoreError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);

        // Internal detail stays in the logs; the client gets a generic line.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {:?}", self.0);
            "An unexpected error occurred. Please try again later.".to_string()
        } else {
            self.0.to_string()
        };

        let body = ErrorBody {
            success: false,
            error: self.0.code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors_map_to_400() {
        assert_eq!(status_for(&CoreError::NotClaimable), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&CoreError::NoActiveSession), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&CoreError::SelfReferral), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflicting_state_maps_to_409() {
        assert_eq!(status_for(&CoreError::AlreadyMining), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&CoreError::AlreadySpunToday { reset_in_secs: 10 }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(&CoreError::AlreadyReferred), StatusCode::CONFLICT);
        assert_eq!(status_for(&CoreError::DuplicateClaim), StatusCode::CONFLICT);
    }

    #[test]
    fn auth_and_lookup_failures_keep_their_status() {
        assert_eq!(status_for(&CoreError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&CoreError::UserNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&CoreError::RateLimited { retry_after_secs: 30 }),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
