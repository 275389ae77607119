//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use mining_core::{CoreError, LegacySnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::session_id_from_cookie;
use crate::web::protocol::Failure;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// Optional balance/hashrate snapshot supplied by the legacy importer on
/// first signup. Out-of-range fields fall back to zero-state defaults.
#[derive(Deserialize, ToSchema)]
pub struct LegacySnapshotRequest {
    pub balance: f64,
    pub hashrate: f64,
    #[serde(default)]
    pub is_ambassador: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub legacy: Option<LegacySnapshotRequest>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub referral_code: String,
    pub is_ambassador: bool,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, Failure> {
    // 1. Validate input once at the boundary
    if !req.email.contains('@') {
        return Err(CoreError::InvalidInput("email is not valid".to_string()).into());
    }
    if req.password.len() < 8 {
        return Err(
            CoreError::InvalidInput("password must be at least 8 characters".to_string()).into(),
        );
    }

    // 2. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            CoreError::Unexpected("password hashing failed".to_string())
        })?
        .to_string();

    // 3. Create user in database, seeding from the legacy snapshot if given
    let legacy = req.legacy.map(|l| LegacySnapshot {
        balance: l.balance,
        hashrate: l.hashrate,
        is_ambassador: l.is_ambassador,
        created_at: l.created_at,
    });
    let account = state
        .store
        .create_user_with_email(&req.email, &password_hash, legacy)
        .await?;

    // 4. Open an auth session and hand back the cookie
    let (cookie, _) = open_auth_session(&state, account.user_id).await?;

    let response = AuthResponse {
        success: true,
        user_id: account.user_id,
        email: account.email.unwrap_or_default(),
    };

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, Failure> {
    // 1. Get user by email; a missing account reads the same as a bad password
    let user_creds = state
        .store
        .get_user_by_email(&req.email)
        .await
        .map_err(|_| CoreError::Unauthorized)?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        CoreError::Unexpected("stored credentials are unreadable".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(CoreError::Unauthorized.into());
    }

    // 3. Open an auth session and hand back the cookie
    let (cookie, _) = open_auth_session(&state, user_creds.user_id).await?;

    let response = AuthResponse {
        success: true,
        user_id: user_creds.user_id,
        email: user_creds.email,
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, Failure> {
    // 1. Extract session ID from the cookie
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or(CoreError::Unauthorized)?;
    let auth_session_id = session_id_from_cookie(cookie_header).ok_or(CoreError::Unauthorized)?;

    // 2. Delete auth session from database
    state.store.delete_auth_session(auth_session_id).await?;

    // 3. Clear cookie
    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

/// GET /auth/me - The authenticated user's profile
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Account profile", body = ProfileResponse),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, Failure> {
    let account = state.store.get_account(user_id).await?;
    Ok(Json(ProfileResponse {
        success: true,
        user_id: account.user_id,
        email: account.email,
        referral_code: account.referral_code,
        is_ambassador: account.is_ambassador,
        created_at: account.created_at,
    }))
}

/// Creates a 30-day auth session for the user and returns the Set-Cookie
/// value plus the session id.
async fn open_auth_session(
    state: &Arc<AppState>,
    user_id: Uuid,
) -> Result<(String, String), Failure> {
    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(30);

    state
        .store
        .create_auth_session(&auth_session_id, user_id, expires_at)
        .await?;

    let cookie = format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        auth_session_id,
        Duration::days(30).num_seconds()
    );
    Ok((cookie, auth_session_id))
}
