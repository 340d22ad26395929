//! AssetDesk API Library
//!
//! IT asset and purchase request backend: request lifecycle, item
//! assignment, notifications, permissions, search/export and realtime sync.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod export;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod realtime;
pub mod services;
pub mod tracing;

use axum::{
    http::HeaderValue,
    middleware,
    response::Json,
    routing::{get, patch, post},
    Extension, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::ToSchema;

use crate::{
    auth::{api_key_middleware, StoreAccessKey},
    realtime::ChangeFeed,
    services::reference::ReferenceKind,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub feed: Arc<ChangeFeed>,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Wires the services around `db`. The returned receiver carries domain
    /// events and must be drained, normally by [`events::process_events`].
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
    ) -> (Self, mpsc::Receiver<events::Event>) {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        let event_sender = Arc::new(events::EventSender::new(event_tx));
        let feed = Arc::new(ChangeFeed::new(config.realtime_channel_capacity));
        let services =
            handlers::AppServices::new(db.clone(), feed.clone(), event_sender.clone(), &config);

        let state = Self {
            db,
            config,
            feed,
            event_sender,
            services,
        };
        (state, event_rx)
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn error_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-err"), async {
                ApiResponse::<()>::error("oops".into())
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-err"));
        assert!(!response.success);
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

const REFERENCE_KINDS: [ReferenceKind; 7] = [
    ReferenceKind::Users,
    ReferenceKind::Departments,
    ReferenceKind::Devices,
    ReferenceKind::Inventory,
    ReferenceKind::Incidents,
    ReferenceKind::Projects,
    ReferenceKind::Requests,
];

/// Reference collections share one pair of handlers; each route carries its kind.
fn reference_routes() -> Router<AppState> {
    REFERENCE_KINDS.iter().fold(Router::new(), |router, kind| {
        router.route(
            &format!("/{}", kind),
            get(handlers::reference::list_reference)
                .post(handlers::reference::create_reference)
                .layer(Extension(*kind)),
        )
    })
}

/// Routes served under `/api/v1` that require the store access key.
pub fn api_v1_routes() -> Router<AppState> {
    use handlers::{
        assignment_actions, notifications, permissions, pr_items, purchase_requests, realtime,
    };

    Router::new()
        // Purchase requests
        .route(
            "/purchase-requests",
            post(purchase_requests::create_purchase_request),
        )
        .route(
            "/purchase-requests/search",
            get(purchase_requests::search_purchase_requests),
        )
        .route(
            "/purchase-requests/export",
            get(purchase_requests::export_purchase_requests),
        )
        .route(
            "/purchase-requests/incomplete/notify",
            post(purchase_requests::notify_incomplete_requests),
        )
        .route(
            "/purchase-requests/:id",
            get(purchase_requests::get_purchase_request)
                .delete(purchase_requests::delete_purchase_request),
        )
        .route(
            "/purchase-requests/:id/details",
            get(purchase_requests::get_purchase_request_details),
        )
        .route(
            "/purchase-requests/:id/status",
            patch(purchase_requests::update_purchase_request_status),
        )
        .route(
            "/purchase-requests/:id/items",
            get(purchase_requests::list_purchase_request_items)
                .post(purchase_requests::add_purchase_request_item),
        )
        .route(
            "/purchase-requests/:id/approvals",
            post(purchase_requests::decide_purchase_request),
        )
        .route(
            "/purchase-requests/:id/comments",
            post(purchase_requests::add_purchase_request_comment),
        )
        .route(
            "/purchase-requests/:id/attachments",
            post(purchase_requests::add_purchase_request_attachment),
        )
        // Items
        .route(
            "/pr-items/:id",
            patch(pr_items::update_pr_item).delete(pr_items::delete_pr_item),
        )
        .route("/pr-items/:id/status", patch(pr_items::update_pr_item_status))
        .route(
            "/pr-items/:id/assignments",
            get(pr_items::list_pr_item_assignments),
        )
        .route(
            "/pr-items/:id/assignments/current",
            get(pr_items::get_current_pr_item_assignment),
        )
        // Assignments
        .route(
            "/assignment-actions",
            get(assignment_actions::list_assignment_actions)
                .post(assignment_actions::create_assignment_action),
        )
        // Notifications
        .route(
            "/notifications",
            get(notifications::list_notifications)
                .post(notifications::create_notification)
                .patch(notifications::mark_all_notifications_read),
        )
        .route(
            "/notifications/:id/read",
            patch(notifications::mark_notification_read),
        )
        // Permissions
        .route("/permissions", axum::routing::put(permissions::set_permission))
        .route("/permissions/check", post(permissions::check_permission))
        .route("/permissions/:role", get(permissions::get_role_permissions))
        // Realtime
        .route("/realtime/:table", get(realtime::stream_table_changes))
        // Reference data
        .merge(reference_routes())
}

/// Probes stay reachable without the access key.
fn probe_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/status", get(handlers::health::api_status))
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        ::tracing::info!("No CORS origins configured; using permissive CORS");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// The complete HTTP application: `/api/v1`, Swagger UI and the shared layers.
pub fn build_router(state: AppState) -> Router {
    let access_key = StoreAccessKey::new(&state.config.store_access_key);
    let protected = api_v1_routes().layer(middleware::from_fn_with_state(
        access_key,
        api_key_middleware,
    ));

    Router::new()
        .route("/", get(|| async { "assetdesk-api up" }))
        .nest("/api/v1", protected.merge(probe_routes()))
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(cors_layer(&state.config))
        .layer(middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
