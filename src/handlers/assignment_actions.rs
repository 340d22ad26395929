use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{authorize, created, ok, parse_field, AppJson, Created};
use crate::{
    auth::Actor,
    entities::{
        assignment_action::{self, AssignmentActionType, AssignmentTarget},
        permission::{PermissionAction, Resource},
    },
    errors::ServiceError,
    services::assignments::AssignItemRequest,
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct AssignmentListQuery {
    pub pr_item_id: Option<Uuid>,
    /// Every item of this purchase request; used when `pr_item_id` is absent.
    pub pr_id: Option<Uuid>,
}

/// Flat wire shape; `action_type` is checked here so an unknown value is a 400.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAssignmentAction {
    pub pr_item_id: Uuid,
    #[schema(example = "assign_to_user")]
    pub action_type: String,
    pub target_id: Uuid,
    pub assigned_by: Uuid,
    pub notes: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/assignment-actions",
    summary = "List assignment actions",
    description = "Assignment history of one PR item, or of every item of a purchase request, newest first",
    params(AssignmentListQuery),
    responses(
        (status = 200, description = "Actions retrieved", body = ApiResponse<Vec<assignment_action::Model>>),
        (status = 400, description = "Neither pr_item_id nor pr_id given", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "assignments"
)]
pub async fn list_assignment_actions(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<AssignmentListQuery>,
) -> Result<Json<ApiResponse<Vec<assignment_action::Model>>>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Read).await?;

    let assignments = &state.services.assignments;
    let actions = match (query.pr_item_id, query.pr_id) {
        (Some(item_id), _) => assignments.list_for_item(item_id).await?,
        (None, Some(pr_id)) => assignments.list_for_request(pr_id).await?,
        (None, None) => {
            return Err(ServiceError::ValidationError(
                "pr_item_id or pr_id is required".to_string(),
            ))
        }
    };
    Ok(ok(actions))
}

#[utoipa::path(
    post,
    path = "/api/v1/assignment-actions",
    summary = "Assign a PR item",
    description = "Routes a PR item to inventory, a user or a department",
    request_body = CreateAssignmentAction,
    responses(
        (status = 201, description = "Action recorded", body = ApiResponse<assignment_action::Model>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item or target not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Item or its request is closed", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "assignments"
)]
pub async fn create_assignment_action(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(payload): AppJson<CreateAssignmentAction>,
) -> Result<Created<assignment_action::Model>, ServiceError> {
    let action_type: AssignmentActionType = parse_field("action_type", &payload.action_type)?;
    authorize(&state, &actor, Resource::Pr, PermissionAction::Assign).await?;

    let action = state
        .services
        .assignments
        .assign(AssignItemRequest {
            pr_item_id: payload.pr_item_id,
            target: AssignmentTarget::from_parts(action_type, payload.target_id),
            assigned_by: payload.assigned_by,
            notes: payload.notes,
        })
        .await?;

    info!(action_id = %action.id, status = %action.status, "Assignment action recorded");
    Ok(created(action))
}
