use std::future::Future;
use std::time::Duration;

use agrinova_core::{AuthError, AuthResult};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::infra::{app_state::AppState, errors::AppError};

/// Require a valid access token. On success the request carries an
/// [`AuthenticatedRequest`](agrinova_core::auth::AuthenticatedRequest)
/// extension for handlers to extract.
///
/// Authentication shares the per-request time budget with the scoped
/// database work that follows it.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&request)?;
    let authenticated = within_request_timeout(
        state.rls.request_timeout,
        state.auth.authenticate_request(&token),
    )
    .await?;
    request.extensions_mut().insert(authenticated);
    Ok(next.run(request).await)
}

/// Run `work`, giving up with [`AuthError::Timeout`] once `budget` elapses.
pub(crate) async fn within_request_timeout<T>(
    budget: Duration,
    work: impl Future<Output = AuthResult<T>>,
) -> AuthResult<T> {
    match tokio::time::timeout(budget, work).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                target: "agrinova::auth",
                budget_ms = budget.as_millis() as u64,
                "authentication exceeded the request timeout"
            );
            Err(AuthError::Timeout)
        }
    }
}

fn extract_bearer_token(request: &Request) -> Result<String, AppError> {
    let missing = || AppError::unauthorized("Missing bearer token");
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(missing)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn slow_authentication_times_out() {
        let result: AuthResult<()> = within_request_timeout(
            Duration::from_millis(20),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, AuthError::Timeout));
        assert_eq!(
            AppError::from(err).status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn fast_authentication_passes_its_result_through() {
        let ok = within_request_timeout(Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(ok, 7);

        let denied: AuthResult<()> = within_request_timeout(
            Duration::from_secs(1),
            async { Err(AuthError::InvalidToken) },
        )
        .await;
        assert!(matches!(denied, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn bearer_prefix_is_required() {
        let request = axum::http::Request::builder()
            .header(header::AUTHORIZATION, "Basic abc")
            .body(axum::body::Body::empty())
            .unwrap();
        let err = extract_bearer_token(&request).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let request = axum::http::Request::builder()
            .header(header::AUTHORIZATION, "Bearer  token-value ")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_bearer_token(&request).unwrap(), "token-value");
    }
}
