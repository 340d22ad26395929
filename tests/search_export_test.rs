mod common;

use axum::http::{header, StatusCode};
use common::{body_bytes, data, item, json_body, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

struct Seeded {
    draft_device: Value,
    pending_software: Value,
    pending_device: Value,
}

async fn seed(app: &TestApp, requester: Uuid) -> Seeded {
    let draft_device = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pending_software = app
        .create_pr(requester, json!([item("Design suite", "software", 5, 60)]))
        .await;
    let pending_device = app
        .create_pr(
            requester,
            json!([
                item("Headset", "device", 2, 80),
                item("Support plan", "service", 1, 150),
            ]),
        )
        .await;

    for pr in [&pending_software, &pending_device] {
        app.walk_status(pr["id"].as_str().unwrap(), &["pending_approval"])
            .await;
    }

    Seeded {
        draft_device,
        pending_software,
        pending_device,
    }
}

fn ids(listings: &Value) -> Vec<String> {
    let mut ids: Vec<String> = listings
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}

fn id(pr: &Value) -> String {
    pr["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn status_and_category_narrow_together() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let seeded = seed(&app, requester).await;

    let found = data(
        app.get(
            "/api/v1/purchase-requests/search?status=pending_approval&category=device",
            "employee",
        )
        .await,
    )
    .await;
    assert_eq!(ids(&found), vec![id(&seeded.pending_device)]);
    assert_eq!(found[0]["items"].as_array().unwrap().len(), 2);

    let found = data(
        app.get("/api/v1/purchase-requests/search?category=device", "employee")
            .await,
    )
    .await;
    let mut expected = vec![id(&seeded.draft_device), id(&seeded.pending_device)];
    expected.sort();
    assert_eq!(ids(&found), expected);

    let found = data(
        app.get(
            "/api/v1/purchase-requests/search?status=draft,pending_approval&category=software",
            "employee",
        )
        .await,
    )
    .await;
    assert_eq!(ids(&found), vec![id(&seeded.pending_software)]);
}

#[tokio::test]
async fn empty_filters_return_everything() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    seed(&app, requester).await;

    let found = data(app.get("/api/v1/purchase-requests/search", "officer").await).await;
    assert_eq!(found.as_array().unwrap().len(), 3);

    let found = data(
        app.get("/api/v1/purchase-requests/search?status=&category=", "officer")
            .await,
    )
    .await;
    assert_eq!(found.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn text_and_flag_filters() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let seeded = seed(&app, requester).await;
    let number = seeded.pending_software["pr_number"].as_str().unwrap();

    let needle = number[number.len() - 6..].to_lowercase();
    let found = data(
        app.get(
            &format!("/api/v1/purchase-requests/search?pr_number={}", needle),
            "officer",
        )
        .await,
    )
    .await;
    assert_eq!(ids(&found), vec![id(&seeded.pending_software)]);

    let found = data(
        app.get("/api/v1/purchase-requests/search?requester_name=REYES", "officer")
            .await,
    )
    .await;
    assert_eq!(found.as_array().unwrap().len(), 3);

    let found = data(
        app.get(
            &format!("/api/v1/purchase-requests/search?requester_id={}", Uuid::new_v4()),
            "officer",
        )
        .await,
    )
    .await;
    assert!(found.as_array().unwrap().is_empty());

    let found = data(
        app.get("/api/v1/purchase-requests/search?is_delivered=false", "officer")
            .await,
    )
    .await;
    assert_eq!(found.as_array().unwrap().len(), 3);

    let found = data(
        app.get(
            "/api/v1/purchase-requests/search?has_incomplete_info=true",
            "officer",
        )
        .await,
    )
    .await;
    assert!(found.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_filters_are_rejected() {
    let app = TestApp::new().await;

    for query in [
        "status=shipped",
        "category=furniture",
        "requester_id=not-a-uuid",
        "date_from=yesterday",
    ] {
        let response = app
            .get(&format!("/api/v1/purchase-requests/search?{}", query), "admin")
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "query {}", query);
    }
}

#[tokio::test]
async fn csv_export_has_header_and_rows() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    seed(&app, requester).await;

    let response = app
        .get(
            "/api/v1/purchase-requests/export?format=csv&status=pending_approval",
            "manager",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains(".csv"));

    let text = String::from_utf8(body_bytes(response).await).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("pr_number,title,requester_name"));
    assert_eq!(lines.len(), 3);

    let response = app
        .get(
            "/api/v1/purchase-requests/export?format=csv&status=pending_approval&include_items=true",
            "manager",
        )
        .await;
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.lines().next().unwrap().ends_with("item_status"));
    assert_eq!(text.lines().count(), 4);
}

#[tokio::test]
async fn json_export_matches_search() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let seeded = seed(&app, requester).await;

    let response = app
        .get(
            "/api/v1/purchase-requests/export?format=json&category=software",
            "manager",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let exported = json_body(response).await;
    assert_eq!(ids(&exported), vec![id(&seeded.pending_software)]);
}

#[tokio::test]
async fn pdf_and_excel_exports_render() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    seed(&app, requester).await;

    let response = app
        .get("/api/v1/purchase-requests/export?format=pdf", "manager")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert!(body_bytes(response).await.starts_with(b"%PDF-"));

    let response = app
        .get("/api/v1/purchase-requests/export?format=excel", "manager")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.lines().next().unwrap().contains("pr_number\ttitle"));
}

#[tokio::test]
async fn unsupported_format_and_missing_grant() {
    let app = TestApp::new().await;

    let response = app
        .get("/api/v1/purchase-requests/export?format=docx", "admin")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .get("/api/v1/purchase-requests/export?format=csv", "employee")
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
