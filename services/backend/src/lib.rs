// Library interface for the wallet backend - exposes modules for testing

pub mod auth;
pub mod clients;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod repository;
pub mod services;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        .route("/health/detailed", get(handlers::health::detailed_health))
        // Payment provider callback
        .route("/webhook", post(handlers::payments::webhook))
        // Wallet
        .route("/api/get_balance", post(handlers::wallet::get_balance))
        .route("/api/bet", post(handlers::wallet::place_bet))
        .route("/api/transactions", get(handlers::wallet::list_transactions))
        .route("/api/bets", get(handlers::wallet::list_bets))
        .route("/api/history", get(handlers::wallet::history))
        // Payments
        .route("/api/init_payment", post(handlers::payments::init_payment))
        .route("/api/withdraw", post(handlers::payments::withdraw))
        // Mini-app identity
        .route("/api/auth", post(handlers::auth::authenticate))
        // State
        .with_state(state)
        // Middleware
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
