use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{authorize, ok, parse_field, AppJson};
use crate::{
    auth::Actor,
    entities::{
        assignment_action,
        permission::{PermissionAction, Resource},
        pr_item::{self, PrItemStatus},
    },
    errors::ServiceError,
    services::purchase_requests::UpdatePrItem,
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemStatusRequest {
    #[schema(example = "delivered")]
    pub status: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemovedItem {
    pub id: Uuid,
    pub deleted: bool,
}

#[utoipa::path(
    patch,
    path = "/api/v1/pr-items/{id}",
    summary = "Edit a line item",
    description = "Changing quantity or unit price recomputes the item and request totals",
    params(("id" = Uuid, Path, description = "PR item ID")),
    request_body = UpdatePrItem,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<pr_item::Model>),
        (status = 400, description = "Invalid values", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request no longer editable", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "pr-items"
)]
pub async fn update_pr_item(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdatePrItem>,
) -> Result<Json<ApiResponse<pr_item::Model>>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Update).await?;

    let item = state
        .services
        .purchase_requests
        .update_item(id, payload)
        .await?;
    Ok(ok(item))
}

#[utoipa::path(
    delete,
    path = "/api/v1/pr-items/{id}",
    summary = "Remove a line item",
    params(("id" = Uuid, Path, description = "PR item ID")),
    responses(
        (status = 200, description = "Item removed", body = ApiResponse<RemovedItem>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request no longer editable", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "pr-items"
)]
pub async fn delete_pr_item(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RemovedItem>>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Update).await?;

    state.services.purchase_requests.remove_item(id).await?;
    Ok(ok(RemovedItem { id, deleted: true }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/pr-items/{id}/status",
    summary = "Change a line item's status",
    params(("id" = Uuid, Path, description = "PR item ID")),
    request_body = UpdateItemStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<pr_item::Model>),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request not ready for delivery", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "pr-items"
)]
pub async fn update_pr_item_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateItemStatusRequest>,
) -> Result<Json<ApiResponse<pr_item::Model>>, ServiceError> {
    let status: PrItemStatus = parse_field("status", &payload.status)?;
    authorize(&state, &actor, Resource::Pr, PermissionAction::Update).await?;

    let item = state
        .services
        .purchase_requests
        .update_item_status(id, status, actor.user_id, payload.remarks)
        .await?;
    Ok(ok(item))
}

#[utoipa::path(
    get,
    path = "/api/v1/pr-items/{id}/assignments",
    summary = "Assignment history of a line item",
    params(("id" = Uuid, Path, description = "PR item ID")),
    responses(
        (status = 200, description = "Actions, newest first", body = ApiResponse<Vec<assignment_action::Model>>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "pr-items"
)]
pub async fn list_pr_item_assignments(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<assignment_action::Model>>>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Read).await?;

    state.services.purchase_requests.get_item(id).await?;
    let actions = state.services.assignments.list_for_item(id).await?;
    Ok(ok(actions))
}

#[utoipa::path(
    get,
    path = "/api/v1/pr-items/{id}/assignments/current",
    summary = "Current assignment of a line item",
    description = "Latest action that did not fail; `null` when the item was never assigned",
    params(("id" = Uuid, Path, description = "PR item ID")),
    responses(
        (status = 200, description = "Current action or null", body = ApiResponse<assignment_action::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "pr-items"
)]
pub async fn get_current_pr_item_assignment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Option<assignment_action::Model>>>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Read).await?;

    state.services.purchase_requests.get_item(id).await?;
    Ok(ok(state.services.assignments.current_assignment(id).await?))
}
