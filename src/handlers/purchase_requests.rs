use axum::{
    extract::{Path, RawQuery, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{authorize, created, ok, parse_field, AppJson, Created};
use crate::{
    auth::Actor,
    entities::{
        notification,
        permission::{PermissionAction, Resource},
        pr_approval::{self, ApprovalDecision},
        pr_attachment, pr_comment, pr_item,
        purchase_request::{self, PrStatus},
    },
    errors::ServiceError,
    export::ExportOptions,
    services::{
        purchase_requests::{NewAttachment, NewPrItem, NewPurchaseRequest, PurchaseRequestDetails},
        search::{PrSearchFilters, PurchaseRequestListing},
    },
    ApiResponse, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    #[schema(example = "pending_approval")]
    pub status: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApprovalRequest {
    #[schema(example = "approved")]
    pub decision: String,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentRequest {
    pub comment: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedResponse {
    pub id: Uuid,
    pub deleted: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-requests",
    summary = "Create purchase request",
    description = "Creates a draft purchase request with its line items",
    request_body = NewPurchaseRequest,
    responses(
        (status = 201, description = "Purchase request created", body = ApiResponse<purchase_request::Model>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn create_purchase_request(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(payload): AppJson<NewPurchaseRequest>,
) -> Result<Created<purchase_request::Model>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Create).await?;

    let pr = state.services.purchase_requests.create(payload).await?;
    info!(pr_id = %pr.id, pr_number = %pr.pr_number, "Purchase request created");
    Ok(created(pr))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-requests/search",
    summary = "Search purchase requests",
    description = "`status` and `category` may repeat or be comma-separated",
    params(
        ("pr_number" = Option<String>, Query, description = "Substring of the PR number"),
        ("requester_id" = Option<Uuid>, Query, description = "Requester"),
        ("requester_name" = Option<String>, Query, description = "Substring of the requester name"),
        ("status" = Option<String>, Query, description = "One or more statuses"),
        ("category" = Option<String>, Query, description = "One or more item categories"),
        ("date_from" = Option<String>, Query, description = "Created on or after (RFC 3339 or YYYY-MM-DD)"),
        ("date_to" = Option<String>, Query, description = "Created on or before (RFC 3339 or YYYY-MM-DD)"),
        ("assigned_to" = Option<Uuid>, Query, description = "Assignee"),
        ("department_id" = Option<Uuid>, Query, description = "Department"),
        ("has_incomplete_info" = Option<bool>, Query, description = "Missing description, requester name or total"),
        ("is_delivered" = Option<bool>, Query, description = "Any item delivered"),
    ),
    responses(
        (status = 200, description = "Matching requests, newest first", body = ApiResponse<Vec<PurchaseRequestListing>>),
        (status = 400, description = "Malformed filter", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn search_purchase_requests(
    State(state): State<AppState>,
    actor: Actor,
    RawQuery(query): RawQuery,
) -> Result<Json<ApiResponse<Vec<PurchaseRequestListing>>>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Read).await?;

    let filters = PrSearchFilters::from_query(query.as_deref().unwrap_or_default())?;
    let listings = state.services.search.search(&filters).await?;
    Ok(ok(listings))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-requests/export",
    summary = "Export purchase requests",
    description = "Accepts the search filters plus `format` (csv, excel, pdf, json) and `include_items`",
    params(
        ("format" = Option<String>, Query, description = "csv (default), excel, pdf or json"),
        ("include_items" = Option<bool>, Query, description = "One row per item"),
    ),
    responses(
        (status = 200, description = "File download"),
        (status = 400, description = "Unsupported format or malformed filter", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn export_purchase_requests(
    State(state): State<AppState>,
    actor: Actor,
    RawQuery(query): RawQuery,
) -> Result<Response, ServiceError> {
    let options = ExportOptions::from_query(query.as_deref().unwrap_or_default())?;
    authorize(&state, &actor, Resource::Pr, PermissionAction::Export).await?;

    let payload = state.services.export.export(&options).await?;
    let disposition = format!("attachment; filename=\"{}\"", payload.file_name);

    Ok((
        [
            (header::CONTENT_TYPE, payload.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        payload.bytes,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-requests/{id}",
    summary = "Get purchase request",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    responses(
        (status = 200, description = "Purchase request", body = ApiResponse<purchase_request::Model>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn get_purchase_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<purchase_request::Model>>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Read).await?;
    Ok(ok(state.services.purchase_requests.get(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-requests/{id}/details",
    summary = "Purchase request details",
    description = "The request with items, assignment history, status history, approvals, comments, attachments and notifications",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    responses(
        (status = 200, description = "Aggregate view", body = ApiResponse<PurchaseRequestDetails>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn get_purchase_request_details(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PurchaseRequestDetails>>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Read).await?;
    Ok(ok(state.services.purchase_requests.details(id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/purchase-requests/{id}",
    summary = "Delete purchase request",
    description = "Removes the request and everything attached to it",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    responses(
        (status = 200, description = "Deleted", body = ApiResponse<DeletedResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn delete_purchase_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Delete).await?;

    state.services.purchase_requests.delete(id).await?;
    Ok(ok(DeletedResponse { id, deleted: true }))
}

#[utoipa::path(
    patch,
    path = "/api/v1/purchase-requests/{id}/status",
    summary = "Change purchase request status",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<purchase_request::Model>),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse),
        (status = 403, description = "Approving or rejecting needs the approve grant", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn update_purchase_request_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<purchase_request::Model>>, ServiceError> {
    let status: PrStatus = parse_field("status", &payload.status)?;
    let action = if status.is_decision() {
        PermissionAction::Approve
    } else {
        PermissionAction::Update
    };
    authorize(&state, &actor, Resource::Pr, action).await?;

    let pr = state
        .services
        .purchase_requests
        .update_status(id, status, actor.user_id, payload.remarks)
        .await?;
    Ok(ok(pr))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-requests/{id}/items",
    summary = "List line items",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    responses(
        (status = 200, description = "Items in creation order", body = ApiResponse<Vec<pr_item::Model>>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn list_purchase_request_items(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<pr_item::Model>>>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Read).await?;

    let service = &state.services.purchase_requests;
    service.get(id).await?;
    Ok(ok(service.items(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-requests/{id}/items",
    summary = "Add a line item",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    request_body = NewPrItem,
    responses(
        (status = 201, description = "Item added", body = ApiResponse<pr_item::Model>),
        (status = 400, description = "Invalid item", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request no longer editable", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn add_purchase_request_item(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<NewPrItem>,
) -> Result<Created<pr_item::Model>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Update).await?;

    let item = state.services.purchase_requests.add_item(id, payload).await?;
    Ok(created(item))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-requests/{id}/approvals",
    summary = "Approve or reject",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    request_body = ApprovalRequest,
    responses(
        (status = 201, description = "Decision recorded", body = ApiResponse<pr_approval::Model>),
        (status = 400, description = "Unknown decision", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Request not awaiting a decision", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn decide_purchase_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<ApprovalRequest>,
) -> Result<Created<pr_approval::Model>, ServiceError> {
    let decision: ApprovalDecision = parse_field("decision", &payload.decision)?;
    authorize(&state, &actor, Resource::Pr, PermissionAction::Approve).await?;

    let approval = state
        .services
        .purchase_requests
        .decide_approval(id, actor.user_id, decision, payload.remarks)
        .await?;
    Ok(created(approval))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-requests/{id}/comments",
    summary = "Comment on a purchase request",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment stored", body = ApiResponse<pr_comment::Model>),
        (status = 400, description = "Empty comment", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn add_purchase_request_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<CommentRequest>,
) -> Result<Created<pr_comment::Model>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Read).await?;

    let comment = state
        .services
        .purchase_requests
        .add_comment(id, actor.user_id, payload.comment)
        .await?;
    Ok(created(comment))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-requests/{id}/attachments",
    summary = "Attach a file reference",
    params(("id" = Uuid, Path, description = "Purchase request ID")),
    request_body = NewAttachment,
    responses(
        (status = 201, description = "Attachment stored", body = ApiResponse<pr_attachment::Model>),
        (status = 400, description = "Invalid attachment", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn add_purchase_request_attachment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<NewAttachment>,
) -> Result<Created<pr_attachment::Model>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Update).await?;

    let attachment = state
        .services
        .purchase_requests
        .add_attachment(id, actor.user_id, payload)
        .await?;
    Ok(created(attachment))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-requests/incomplete/notify",
    summary = "Remind requesters of incomplete requests",
    responses(
        (status = 200, description = "Reminders sent", body = ApiResponse<Vec<notification::Model>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "purchase-requests"
)]
pub async fn notify_incomplete_requests(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<ApiResponse<Vec<notification::Model>>>, ServiceError> {
    authorize(&state, &actor, Resource::Pr, PermissionAction::Update).await?;

    let sent = state
        .services
        .purchase_requests
        .notify_incomplete(actor.user_id)
        .await?;
    Ok(ok(sent))
}
