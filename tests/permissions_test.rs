mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{data, json_body, TestApp, ACCESS_KEY};
use rstest::rstest;
use serde_json::json;
use uuid::Uuid;

async fn granted(app: &TestApp, role: &str, resource: &str, action: &str) -> bool {
    let response = app
        .post(
            "/api/v1/permissions/check",
            json!({ "role": role, "resource": resource, "action": action }),
            "employee",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    data(response).await["granted"].as_bool().unwrap()
}

#[rstest]
#[case("admin", "settings", "update", true)]
#[case("manager", "pr", "approve", true)]
#[case("officer", "pr", "approve", false)]
#[case("employee", "pr", "create", true)]
#[case("employee", "inventory", "update", false)]
#[case("contractor", "pr", "read", false)]
#[case("admin", "payroll", "read", false)]
#[case("admin", "pr", "teleport", false)]
#[tokio::test]
async fn default_matrix_fails_closed(
    #[case] role: &str,
    #[case] resource: &str,
    #[case] action: &str,
    #[case] expected: bool,
) {
    let app = TestApp::new().await;
    assert_eq!(granted(&app, role, resource, action).await, expected);
}

#[tokio::test]
async fn grants_can_be_set_and_revoked() {
    let app = TestApp::new().await;
    assert!(!granted(&app, "auditor", "reports", "export").await);

    let grant = json!({ "role": "auditor", "resource": "reports", "action": "export", "granted": true });
    let response = app
        .request(Method::PUT, "/api/v1/permissions", Some(grant), "admin")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(granted(&app, "auditor", "reports", "export").await);

    let revoke = json!({ "role": "auditor", "resource": "reports", "action": "export", "granted": false });
    let response = app
        .request(Method::PUT, "/api/v1/permissions", Some(revoke), "admin")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!granted(&app, "auditor", "reports", "export").await);

    // Upserted, not duplicated.
    let listed = data(app.get("/api/v1/permissions/auditor", "admin").await).await;
    assert_eq!(listed["permissions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn only_admins_change_grants() {
    let app = TestApp::new().await;
    let grant = json!({ "role": "employee", "resource": "pr", "action": "approve", "granted": true });

    for role in ["manager", "officer", "employee"] {
        let response = app
            .request(Method::PUT, "/api/v1/permissions", Some(grant.clone()), role)
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "role {}", role);
    }
    assert!(!granted(&app, "employee", "pr", "approve").await);
}

#[tokio::test]
async fn roles_can_read_their_own_grants_only() {
    let app = TestApp::new().await;

    let own = app.get("/api/v1/permissions/employee", "employee").await;
    assert_eq!(own.status(), StatusCode::OK);
    let own = data(own).await;
    assert!(own["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .all(|p| p["role"] == "employee"));

    let other = app.get("/api/v1/permissions/admin", "employee").await;
    assert_eq!(other.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn access_key_and_identity_are_required() {
    let app = TestApp::new().await;

    let no_key = Request::builder()
        .uri("/api/v1/purchase-requests/search")
        .header("x-user-id", Uuid::new_v4().to_string())
        .header("x-user-role", "admin")
        .body(Body::empty())
        .unwrap();
    let response = app.send(no_key).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Unauthorized");

    let wrong_key = Request::builder()
        .uri("/api/v1/purchase-requests/search")
        .header("x-api-key", "not-the-key")
        .header("x-user-id", Uuid::new_v4().to_string())
        .header("x-user-role", "admin")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(wrong_key).await.status(), StatusCode::UNAUTHORIZED);

    let anonymous = Request::builder()
        .uri("/api/v1/purchase-requests/search")
        .header("x-api-key", ACCESS_KEY)
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(anonymous).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn probes_skip_the_access_key() {
    let app = TestApp::new().await;

    let health = app
        .send(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(health.status(), StatusCode::OK);
    let health = json_body(health).await;
    assert_eq!(health["data"]["database"]["status"], "up");

    let status = app
        .send(
            Request::builder()
                .uri("/api/v1/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status.status(), StatusCode::OK);
    let status = json_body(status).await;
    assert_eq!(status["data"]["service"], "assetdesk-api");
    assert_eq!(status["data"]["status_transition_policy"], "strict");
}

#[tokio::test]
async fn responses_echo_the_request_id() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/api/v1/status")
        .header("x-request-id", "req-abc-123")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-abc-123"
    );
    let body = json_body(response).await;
    assert_eq!(body["meta"]["request_id"], "req-abc-123");
}
