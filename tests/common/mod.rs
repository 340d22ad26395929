#![allow(dead_code)]

use std::{str::FromStr, sync::Arc};

use assetdesk_api::{
    build_router,
    config::AppConfig,
    db::{self, DbConfig},
    events, AppState,
};
use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const ACCESS_KEY: &str = "test-access-key-123";

/// Application wired against a fresh in-memory SQLite database with the
/// default role grants seeded.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    /// Identity used by the role helpers.
    pub user_id: Uuid,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Like [`TestApp::new`], after `adjust` has edited the config.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            ACCESS_KEY.to_string(),
            "test".to_string(),
        );
        adjust(&mut cfg);

        let pool = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .expect("connect to sqlite");
        db::run_migrations(&pool).await.expect("run migrations");

        let (state, event_rx) = AppState::new(Arc::new(pool), cfg);
        let event_task = tokio::spawn(events::process_events(event_rx));
        state
            .services
            .permissions
            .seed_defaults()
            .await
            .expect("seed default permissions");

        Self {
            router: build_router(state.clone()),
            state,
            user_id: Uuid::new_v4(),
            _event_task: event_task,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Request as `user_id` holding `role`, with the access key attached.
    pub async fn request_as(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        user_id: Uuid,
        role: &str,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-api-key", ACCESS_KEY)
            .header("x-user-id", user_id.to_string())
            .header("x-user-role", role);

        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).expect("valid request")).await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        role: &str,
    ) -> Response {
        self.request_as(method, uri, body, self.user_id, role).await
    }

    pub async fn get(&self, uri: &str, role: &str) -> Response {
        self.request(Method::GET, uri, None, role).await
    }

    pub async fn post(&self, uri: &str, body: Value, role: &str) -> Response {
        self.request(Method::POST, uri, Some(body), role).await
    }

    pub async fn patch(&self, uri: &str, body: Value, role: &str) -> Response {
        self.request(Method::PATCH, uri, Some(body), role).await
    }

    /// Creates a user through the reference API and returns its id.
    pub async fn seed_user(&self, name: &str) -> Uuid {
        let response = self
            .post(
                "/api/v1/users",
                json!({
                    "name": name,
                    "email": format!("{}@example.test", name.to_lowercase().replace(' ', ".")),
                    "role": "employee",
                    "department_id": null,
                }),
                "admin",
            )
            .await;
        created_id(response).await
    }

    pub async fn seed_department(&self, name: &str) -> Uuid {
        let response = self
            .post(
                "/api/v1/departments",
                json!({ "name": name, "description": null }),
                "admin",
            )
            .await;
        created_id(response).await
    }

    pub async fn seed_inventory(&self, name: &str) -> Uuid {
        let response = self
            .post(
                "/api/v1/inventory",
                json!({
                    "name": name,
                    "category": "device",
                    "quantity": 0,
                    "location": "Main storeroom",
                }),
                "admin",
            )
            .await;
        created_id(response).await
    }

    /// Creates a draft request owned by `requester_id` and returns the body's `data`.
    pub async fn create_pr(&self, requester_id: Uuid, items: Value) -> Value {
        let response = self
            .request_as(
                Method::POST,
                "/api/v1/purchase-requests",
                Some(json!({
                    "title": "Onboarding kit",
                    "description": "Equipment for a new hire",
                    "requester_id": requester_id,
                    "requester_name": "Dana Reyes",
                    "priority": "high",
                    "items": items,
                })),
                requester_id,
                "employee",
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        data(response).await
    }

    /// Moves a request through each status in turn as an admin.
    pub async fn walk_status(&self, pr_id: &str, statuses: &[&str]) {
        for status in statuses {
            let response = self
                .patch(
                    &format!("/api/v1/purchase-requests/{}/status", pr_id),
                    json!({ "status": status }),
                    "admin",
                )
                .await;
            assert_eq!(response.status(), StatusCode::OK, "transition to {}", status);
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

pub async fn json_body(response: Response) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("JSON body")
}

/// The `data` member of a success envelope.
pub async fn data(response: Response) -> Value {
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true), "unexpected envelope: {}", body);
    body["data"].clone()
}

pub async fn created_id(response: Response) -> Uuid {
    assert_eq!(response.status(), StatusCode::CREATED);
    let data = data(response).await;
    id_of(&data)
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("row id")
}

/// Decimals may come back as strings or numbers.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal: {}", other),
    }
}

pub fn item(name: &str, category: &str, quantity: i32, unit_price: i64) -> Value {
    json!({
        "name": name,
        "category": category,
        "quantity": quantity,
        "unit_price": unit_price,
    })
}
