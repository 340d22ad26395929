//! List/create handlers shared by the reference collections. The route
//! attaches the collection as an `Extension<ReferenceKind>`.

use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use serde_json::Value;
use utoipa::ToSchema;

use super::common::{authorize, created, ok, AppJson, Created};
use crate::{
    auth::Actor, entities::permission::PermissionAction, errors::ServiceError,
    services::reference::ReferenceKind, ApiResponse, AppState,
};

/// One row of a reference collection, shaped like the collection's table.
#[derive(ToSchema)]
#[schema(value_type = Object)]
pub struct ReferenceRow(pub Value);

#[utoipa::path(
    get,
    path = "/api/v1/{collection}",
    summary = "List reference rows",
    description = "Every query parameter is an equality filter on the column of the same name",
    params(
        ("collection" = String, Path, description = "users, departments, devices, inventory, incidents, projects or requests"),
    ),
    responses(
        (status = 200, description = "Matching rows", body = ApiResponse<Vec<ReferenceRow>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "reference"
)]
pub async fn list_reference(
    State(state): State<AppState>,
    Extension(kind): Extension<ReferenceKind>,
    actor: Actor,
    Query(filters): Query<Vec<(String, String)>>,
) -> Result<Json<ApiResponse<Vec<Value>>>, ServiceError> {
    authorize(&state, &actor, kind.resource(), PermissionAction::Read).await?;

    let rows = state.services.reference.list(kind, &filters).await?;
    Ok(ok(rows))
}

#[utoipa::path(
    post,
    path = "/api/v1/{collection}",
    summary = "Create a reference row",
    description = "`id` and `created_at` are assigned by the server",
    params(
        ("collection" = String, Path, description = "users, departments, devices, inventory, incidents, projects or requests"),
    ),
    request_body = ReferenceRow,
    responses(
        (status = 201, description = "Row created", body = ApiResponse<ReferenceRow>),
        (status = 400, description = "Body does not match the collection", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "reference"
)]
pub async fn create_reference(
    State(state): State<AppState>,
    Extension(kind): Extension<ReferenceKind>,
    actor: Actor,
    AppJson(body): AppJson<Value>,
) -> Result<Created<Value>, ServiceError> {
    authorize(&state, &actor, kind.resource(), PermissionAction::Create).await?;

    let row = state.services.reference.create(kind, body).await?;
    Ok(created(row))
}
