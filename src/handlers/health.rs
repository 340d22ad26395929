use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use std::time::Instant;
use utoipa::ToSchema;

use crate::{ApiResponse, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthReport {
    pub status: ComponentStatus,
    pub database: ComponentHealth,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusReport {
    pub service: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub status_transition_policy: String,
    pub uptime_secs: u64,
    pub timestamp: String,
}

static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Call once at startup.
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    summary = "Health check",
    responses(
        (status = 200, description = "Database reachable", body = ApiResponse<HealthReport>),
        (status = 503, description = "Database unreachable", body = ApiResponse<HealthReport>),
    ),
    tag = "health"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthReport>>) {
    let started = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let database = match db_result {
        Ok(()) => ComponentHealth {
            status: ComponentStatus::Up,
            latency_ms,
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Health check: database unreachable");
            ComponentHealth {
                status: ComponentStatus::Down,
                latency_ms,
                error: Some("database unreachable".to_string()),
            }
        }
    };

    let code = match database.status {
        ComponentStatus::Up => StatusCode::OK,
        ComponentStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    let report = HealthReport {
        status: database.status,
        database,
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    (code, Json(ApiResponse::success(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/status",
    summary = "Service status",
    responses((status = 200, description = "Build and runtime information", body = ApiResponse<StatusReport>)),
    tag = "health"
)]
pub async fn api_status(State(state): State<AppState>) -> Json<ApiResponse<StatusReport>> {
    Json(ApiResponse::success(StatusReport {
        service: "assetdesk-api",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        status_transition_policy: format!("{:?}", state.config.status_transition_policy)
            .to_lowercase(),
        uptime_secs: uptime_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
