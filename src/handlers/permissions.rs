use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{authorize, ok, AppJson};
use crate::{
    auth::Actor,
    entities::permission::{self, PermissionAction, Resource},
    errors::ServiceError,
    services::permissions::SetPermission,
    ApiResponse, AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct RolePermissions {
    pub role: String,
    pub permissions: Vec<permission::Model>,
}

/// Raw strings so that unknown names evaluate to "not granted".
#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionCheck {
    pub role: String,
    #[schema(example = "pr")]
    pub resource: String,
    #[schema(example = "approve")]
    pub action: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionCheckResult {
    pub granted: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/permissions/{role}",
    summary = "List a role's permissions",
    params(("role" = String, Path, description = "Role name")),
    responses(
        (status = 200, description = "Stored grants for the role", body = ApiResponse<RolePermissions>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "permissions"
)]
pub async fn get_role_permissions(
    State(state): State<AppState>,
    actor: Actor,
    Path(role): Path<String>,
) -> Result<Json<ApiResponse<RolePermissions>>, ServiceError> {
    if role != actor.role {
        authorize(&state, &actor, Resource::Settings, PermissionAction::Read).await?;
    }

    let permissions = state.services.permissions.for_role(&role).await?;
    Ok(ok(RolePermissions { role, permissions }))
}

#[utoipa::path(
    post,
    path = "/api/v1/permissions/check",
    summary = "Evaluate one permission",
    request_body = PermissionCheck,
    responses(
        (status = 200, description = "Evaluation result", body = ApiResponse<PermissionCheckResult>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "permissions"
)]
pub async fn check_permission(
    State(state): State<AppState>,
    _actor: Actor,
    AppJson(payload): AppJson<PermissionCheck>,
) -> Result<Json<ApiResponse<PermissionCheckResult>>, ServiceError> {
    let granted = state
        .services
        .permissions
        .check_str(&payload.role, &payload.resource, &payload.action)
        .await?;
    Ok(ok(PermissionCheckResult { granted }))
}

#[utoipa::path(
    put,
    path = "/api/v1/permissions",
    summary = "Grant or revoke a permission",
    request_body = SetPermission,
    responses(
        (status = 200, description = "Stored grant", body = ApiResponse<permission::Model>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "permissions"
)]
pub async fn set_permission(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(payload): AppJson<SetPermission>,
) -> Result<Json<ApiResponse<permission::Model>>, ServiceError> {
    authorize(&state, &actor, Resource::Settings, PermissionAction::Update).await?;

    let saved = state.services.permissions.set(payload).await?;
    Ok(ok(saved))
}
