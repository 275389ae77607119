//! crates/mining_core/src/errors.rs
//!
//! The single error taxonomy shared by the core logic and the store
//! ports. Every expected precondition failure has its own variant with a
//! stable machine-readable code; the HTTP layer maps codes to status
//! codes at one boundary.

/// Errors produced by core operations and store implementations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("User not found")]
    UserNotFound,

    #[error("A mining session is already in progress")]
    AlreadyMining,

    #[error("Mining session is not complete yet")]
    NotClaimable,

    #[error("No active mining session")]
    NoActiveSession,

    #[error("This session is complete; claim it instead of stopping")]
    SessionComplete,

    #[error("Already spun today; next spin in {reset_in_secs}s")]
    AlreadySpunToday { reset_in_secs: i64 },

    #[error("No unclaimed streak rewards")]
    NoUnclaimedRewards,

    #[error("Cannot redeem your own referral code")]
    SelfReferral,

    #[error("User is already linked to a referrer")]
    AlreadyReferred,

    #[error("This reward was already claimed")]
    DuplicateClaim,

    #[error("Too many attempts; retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl CoreError {
    /// Stable machine-readable code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Unauthorized => "UNAUTHORIZED",
            CoreError::UserNotFound => "USER_NOT_FOUND",
            CoreError::AlreadyMining => "ALREADY_MINING",
            CoreError::NotClaimable => "NOT_CLAIMABLE",
            CoreError::NoActiveSession => "NO_ACTIVE_SESSION",
            CoreError::SessionComplete => "SESSION_COMPLETE",
            CoreError::AlreadySpunToday { .. } => "ALREADY_SPUN_TODAY",
            CoreError::NoUnclaimedRewards => "NO_UNCLAIMED_REWARDS",
            CoreError::SelfReferral => "SELF_REFERRAL",
            CoreError::AlreadyReferred => "ALREADY_REFERRED",
            CoreError::DuplicateClaim => "DUPLICATE_CLAIM",
            CoreError::RateLimited { .. } => "RATE_LIMITED",
            CoreError::InvalidInput(_) => "INVALID_INPUT",
            CoreError::Unexpected(_) => "INTERNAL_ERROR",
        }
    }
}

/// A convenience type alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;
