use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    AppState,
    api::v1,
    auth::{handlers, middleware::auth_middleware},
    scope,
};

/// Create all v1 API routes
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        // Public authentication endpoints
        .route(v1::auth::LOGIN, post(handlers::login))
        .route(v1::auth::REFRESH, post(handlers::refresh))
        .route(v1::auth::device::RENEW, post(handlers::device_renew))
        .route(v1::auth::offline::VALIDATE, post(handlers::validate_offline))
        .route(v1::auth::session::VALIDATE, post(handlers::validate_session))
        .merge(create_protected_routes(state))
}

fn create_protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(v1::auth::LOGOUT, post(handlers::logout))
        .route(v1::auth::device::UNBIND, post(handlers::unbind_device))
        .route(v1::me::PROFILE, get(handlers::me))
        .route(v1::me::SCOPE, get(scope::handlers::current_scope))
        .route(v1::admin::devices::APPROVE, post(handlers::approve_device))
        .layer(middleware::from_fn_with_state(state, auth_middleware))
}
