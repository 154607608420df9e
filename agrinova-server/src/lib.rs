//! # Agrinova Auth Server
//!
//! HTTP surface over [`agrinova_core`]: web and mobile login, token refresh,
//! offline device renewal, session validation, logout, device unbinding and
//! approval, plus a scope endpoint that runs inside the caller's row-level
//! security context.

pub mod api;
pub mod auth;
pub mod infra;
pub mod routes;
pub mod scope;

pub use infra::app_state::AppState;

use axum::Router;
use tower_http::trace::TraceLayer;

/// Router with every route, request tracing, and state attached.
pub fn create_app(state: AppState) -> Router {
    routes::create_api_router(state.clone())
        .merge(routes::create_health_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
