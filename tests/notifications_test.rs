mod common;

use axum::http::{Method, StatusCode};
use common::{data, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

fn notice(user_id: Uuid, title: &str) -> Value {
    json!({
        "user_id": user_id,
        "title": title,
        "message": "Your laptop is ready for pickup",
        "type": "info",
        "category": "pr_delivery",
    })
}

async fn inbox(app: &TestApp, user_id: Uuid, unread_only: bool) -> Vec<Value> {
    let uri = format!("/api/v1/notifications?unread_only={}", unread_only);
    let listed = data(
        app.request_as(Method::GET, &uri, None, user_id, "employee")
            .await,
    )
    .await;
    listed.as_array().unwrap().clone()
}

#[tokio::test]
async fn created_notification_shows_up_unread() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let response = app.post("/api/v1/notifications", notice(user, "Ready"), "admin").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let stored = data(response).await;
    assert_eq!(stored["read"], false);
    assert_eq!(stored["type"], "info");

    let unread = inbox(&app, user, true).await;
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0]["id"], stored["id"]);
    assert_eq!(unread[0]["title"], "Ready");
}

#[tokio::test]
async fn mark_all_read_clears_the_inbox() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let other = Uuid::new_v4();

    for title in ["One", "Two", "Three"] {
        let response = app.post("/api/v1/notifications", notice(user, title), "admin").await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
    app.post("/api/v1/notifications", notice(other, "Elsewhere"), "admin")
        .await;

    let response = app
        .request_as(
            Method::PATCH,
            "/api/v1/notifications",
            Some(json!({ "user_id": user })),
            user,
            "employee",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = data(response).await;
    assert_eq!(result["success"], true);
    assert_eq!(result["updated"], 3);

    assert!(inbox(&app, user, true).await.is_empty());
    assert_eq!(inbox(&app, user, false).await.len(), 3);
    assert_eq!(inbox(&app, other, true).await.len(), 1);
}

#[tokio::test]
async fn single_notification_can_be_marked_read() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let stored = data(app.post("/api/v1/notifications", notice(user, "Ready"), "admin").await).await;
    let uri = format!("/api/v1/notifications/{}/read", stored["id"].as_str().unwrap());

    // Someone else's inbox needs users:update.
    let response = app
        .request_as(Method::PATCH, &uri, None, Uuid::new_v4(), "employee")
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(inbox(&app, user, true).await.len(), 1);

    let response = app.request_as(Method::PATCH, &uri, None, user, "employee").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(data(response).await["read"], true);
    assert!(inbox(&app, user, true).await.is_empty());

    let response = app
        .request_as(
            Method::PATCH,
            &format!("/api/v1/notifications/{}/read", Uuid::new_v4()),
            None,
            user,
            "employee",
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_type_or_category_is_rejected() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let mut bad_type = notice(user, "Ready");
    bad_type["type"] = json!("urgent");
    let response = app.post("/api/v1/notifications", bad_type, "admin").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut bad_category = notice(user, "Ready");
    bad_category["category"] = json!("payroll");
    let response = app.post("/api/v1/notifications", bad_category, "admin").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(inbox(&app, user, false).await.is_empty());
}

#[tokio::test]
async fn reading_another_inbox_requires_user_access() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    app.post("/api/v1/notifications", notice(user, "Ready"), "admin")
        .await;

    let uri = format!("/api/v1/notifications?user_id={}", user);
    let response = app.get(&uri, "employee").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.get(&uri, "manager").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(data(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn notifying_someone_else_requires_user_update() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    for role in ["employee", "officer", "manager"] {
        let response = app.post("/api/v1/notifications", notice(user, "Spoofed"), role).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{role}");
    }
    assert!(inbox(&app, user, false).await.is_empty());

    let response = app
        .request_as(
            Method::POST,
            "/api/v1/notifications",
            Some(notice(user, "Reminder")),
            user,
            "employee",
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.post("/api/v1/notifications", notice(user, "Ready"), "admin").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(inbox(&app, user, false).await.len(), 2);
}
