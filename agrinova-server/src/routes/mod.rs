pub mod v1;

use crate::AppState;
use crate::api;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

/// Create the main API router with all versions
pub fn create_api_router(state: AppState) -> Router<AppState> {
    Router::new().merge(v1::create_v1_router(state))
}

pub fn create_health_router() -> Router<AppState> {
    Router::new().route(api::HEALTH, get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
