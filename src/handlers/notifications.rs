use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{authorize, created, ok, parse_field, AppJson, Created};
use crate::{
    auth::Actor,
    entities::{
        notification,
        permission::{PermissionAction, Resource},
    },
    errors::ServiceError,
    services::notifications::NewNotification,
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct NotificationListQuery {
    /// Defaults to the acting user.
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub unread_only: bool,
}

/// `type` and `category` arrive as strings and are parsed here.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    #[schema(example = "info")]
    pub notification_type: String,
    #[schema(example = "pr_status")]
    pub category: String,
    pub related_id: Option<Uuid>,
    pub action_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkAllRead {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllReadResult {
    pub success: bool,
    pub updated: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    summary = "List notifications",
    params(NotificationListQuery),
    responses(
        (status = 200, description = "Inbox, newest first", body = ApiResponse<Vec<notification::Model>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<ApiResponse<Vec<notification::Model>>>, ServiceError> {
    let user_id = query.user_id.unwrap_or(actor.user_id);
    if user_id != actor.user_id {
        authorize(&state, &actor, Resource::Users, PermissionAction::Read).await?;
    }

    let items = state
        .services
        .notifications
        .list_for_user(user_id, query.unread_only)
        .await?;
    Ok(ok(items))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications",
    summary = "Create notification",
    request_body = CreateNotification,
    responses(
        (status = 201, description = "Notification stored", body = ApiResponse<notification::Model>),
        (status = 400, description = "Invalid type, category or text", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Recipient is another user and the caller may not update users", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "notifications"
)]
pub async fn create_notification(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(payload): AppJson<CreateNotification>,
) -> Result<Created<notification::Model>, ServiceError> {
    if payload.user_id != actor.user_id {
        authorize(&state, &actor, Resource::Users, PermissionAction::Update).await?;
    }

    let input = NewNotification {
        user_id: payload.user_id,
        title: payload.title,
        message: payload.message,
        notification_type: parse_field("type", &payload.notification_type)?,
        category: parse_field("category", &payload.category)?,
        related_id: payload.related_id,
        action_url: payload.action_url,
    };

    let stored = state.services.notifications.create(input).await?;
    Ok(created(stored))
}

#[utoipa::path(
    patch,
    path = "/api/v1/notifications",
    summary = "Mark all notifications read",
    request_body = MarkAllRead,
    responses(
        (status = 200, description = "Inbox cleared", body = ApiResponse<MarkAllReadResult>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "notifications"
)]
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(payload): AppJson<MarkAllRead>,
) -> Result<Json<ApiResponse<MarkAllReadResult>>, ServiceError> {
    if payload.user_id != actor.user_id {
        authorize(&state, &actor, Resource::Users, PermissionAction::Update).await?;
    }

    let updated = state
        .services
        .notifications
        .mark_all_read(payload.user_id)
        .await?;
    Ok(ok(MarkAllReadResult {
        success: true,
        updated,
    }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/notifications/{id}/read",
    summary = "Mark one notification read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification updated", body = ApiResponse<notification::Model>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Notification not found", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "notifications"
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<notification::Model>>, ServiceError> {
    let existing = state.services.notifications.get(id).await?;
    if existing.user_id != actor.user_id {
        authorize(&state, &actor, Resource::Users, PermissionAction::Update).await?;
    }

    let updated = state.services.notifications.mark_read(existing.id).await?;
    Ok(ok(updated))
}
