//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, SlidingWindowLimiter},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, me_handler, signup_handler},
        middleware::require_auth,
        mining::{
            claim_mining_handler, mining_history_handler, mining_status_handler,
            set_hashrate_handler, start_mining_handler, stop_mining_handler,
        },
        referral::{redeem_referral_handler, referral_stats_handler},
        spin::spin_handler,
        state::AppState,
        streak::{claim_streak_handler, streak_handler},
        wallet::wallet_handler,
        ApiDoc,
    },
};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(DbAdapter::new(db_pool.clone(), config.accrual()));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store,
        limiter: Arc::new(SlidingWindowLimiter::new()),
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(
            "http://localhost:3000"
                .parse::<HeaderValue>()
                .expect("static origin is a valid header value"),
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/mining", get(mining_status_handler))
        .route("/mining/start", post(start_mining_handler))
        .route("/mining/stop", post(stop_mining_handler))
        .route("/mining/claim", post(claim_mining_handler))
        .route("/mining/hashrate", put(set_hashrate_handler))
        .route("/mining/history", get(mining_history_handler))
        .route("/streak", get(streak_handler))
        .route("/streak/claim", post(claim_streak_handler))
        .route("/spin", post(spin_handler))
        .route(
            "/referral",
            get(referral_stats_handler).post(redeem_referral_handler),
        )
        .route("/wallet", get(wallet_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
