use agrinova_core::auth::AuthenticatedRequest;
use agrinova_core::rls::{
    RlsContext, current_company_ids, current_division_ids, current_estate_ids,
    current_role, current_user_id, with_rls_context,
};
use agrinova_model::Role;
use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::dto::ApiResponse;
use crate::infra::{app_state::AppState, errors::{AppError, AppResult}};

/// What the row-level policies will see for this caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopePayload {
    pub user_id: Uuid,
    pub role: Role,
    pub company_ids: Vec<Uuid>,
    pub estate_ids: Vec<Uuid>,
    pub division_ids: Vec<Uuid>,
}

impl From<&RlsContext> for ScopePayload {
    fn from(context: &RlsContext) -> Self {
        Self {
            user_id: context.user_id,
            role: context.role,
            company_ids: context.company_ids.clone(),
            estate_ids: context.estate_ids.clone(),
            division_ids: context.division_ids.clone(),
        }
    }
}

/// With a database, values are read through the context getters inside a
/// scoped transaction; without one, straight from the resolved context.
pub async fn current_scope(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedRequest>,
) -> AppResult<Json<ApiResponse<ScopePayload>>> {
    let Some(pool) = state.pool.as_ref() else {
        return Ok(Json(ApiResponse::success(ScopePayload::from(&caller.context))));
    };

    let (user_id, role, company_ids, estate_ids, division_ids) =
        with_rls_context(pool, &caller.context, &state.rls, |conn| {
            Box::pin(async move {
                Ok((
                    current_user_id(&mut *conn).await?,
                    current_role(&mut *conn).await?,
                    current_company_ids(&mut *conn).await?,
                    current_estate_ids(&mut *conn).await?,
                    current_division_ids(&mut *conn).await?,
                ))
            })
        })
        .await?;

    let (Some(user_id), Some(role)) = (user_id, role) else {
        return Err(AppError::internal("security context was not installed"));
    };
    Ok(Json(ApiResponse::success(ScopePayload {
        user_id,
        role,
        company_ids,
        estate_ids,
        division_ids,
    })))
}
