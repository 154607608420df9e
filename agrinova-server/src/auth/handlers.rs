use agrinova_core::auth::{AuthenticatedRequest, LoginRequest};
use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, header},
};
use agrinova_model::UserProfile;
use tracing::info;

use super::dto::{
    ApiResponse, ApproveDeviceBody, DeviceRenewBody, DeviceSummary, LoginBody,
    LoginPayload, LogoutPayload, OfflineValidateBody, RefreshBody,
    SessionPayload, SessionValidateBody, TokenPayload, UnbindBody,
};
use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginBody>,
) -> AppResult<Json<ApiResponse<LoginPayload>>> {
    let request = LoginRequest {
        identifier: body.identifier,
        password: body.password,
        platform: body.platform,
        device_id: body.device_id,
        device_fingerprint: body.device_fingerprint,
        device_info: body.device_info,
        biometric_token: body.biometric_token,
        remember_me: body.remember_me,
        ip_address: client_ip(&headers),
        user_agent: header_value(&headers, header::USER_AGENT.as_str()),
    };
    let response = state.auth.login(request).await?;
    Ok(Json(ApiResponse::success(response.into())))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshBody>,
) -> AppResult<Json<ApiResponse<TokenPayload>>> {
    let refreshed = state
        .auth
        .refresh_token(&body.refresh_token, body.device_id.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(refreshed.into())))
}

pub async fn device_renew(
    State(state): State<AppState>,
    Json(body): Json<DeviceRenewBody>,
) -> AppResult<Json<ApiResponse<TokenPayload>>> {
    let renewed = state
        .auth
        .device_renew(
            &body.offline_token,
            &body.device_id,
            body.device_fingerprint.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::success(renewed.into())))
}

pub async fn validate_offline(
    State(state): State<AppState>,
    Json(body): Json<OfflineValidateBody>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = state
        .auth
        .validate_offline_access(&body.offline_token, body.device_id.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

pub async fn validate_session(
    State(state): State<AppState>,
    Json(body): Json<SessionValidateBody>,
) -> AppResult<Json<ApiResponse<SessionPayload>>> {
    let validation = state.auth.validate_session(&body.session_token).await?;
    Ok(Json(ApiResponse::success(validation.into())))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = state.auth.profile(caller.token.user_id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Revoke everything bound to the device the presented token was issued to.
pub async fn logout(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedRequest>,
) -> AppResult<Json<ApiResponse<LogoutPayload>>> {
    let outcome = state
        .auth
        .logout(caller.token.user_id, &caller.token.device_id)
        .await?;
    Ok(Json(ApiResponse::success(outcome.into())))
}

pub async fn unbind_device(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedRequest>,
    Json(body): Json<UnbindBody>,
) -> AppResult<Json<ApiResponse<LogoutPayload>>> {
    let outcome = state
        .auth
        .unbind_device(caller.token.user_id, &body.device_id)
        .await?;
    info!(
        user_id = %caller.token.user_id,
        device_id = %body.device_id,
        tokens_revoked = outcome.tokens_revoked,
        "device unbound"
    );
    Ok(Json(ApiResponse::success(outcome.into())))
}

/// Company and super admins only; see
/// [`AuthOrchestrator::approve_device`](agrinova_core::auth::AuthOrchestrator::approve_device).
pub async fn approve_device(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedRequest>,
    Json(body): Json<ApproveDeviceBody>,
) -> AppResult<Json<ApiResponse<DeviceSummary>>> {
    let binding = state.auth.approve_device(&caller, &body.device_id).await?;
    Ok(Json(ApiResponse::success(DeviceSummary::from(&binding))))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_value(headers, "x-forwarded-for")
        .and_then(|raw| raw.split(',').next().map(|hop| hop.trim().to_string()))
        .filter(|hop| !hop.is_empty())
        .or_else(|| header_value(headers, "x-real-ip"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_the_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.9"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }
}
