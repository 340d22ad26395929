mod common;

use std::time::Duration;

use assetdesk_api::realtime::{EqFilter, LiveCollection, SyncTable};
use axum::http::{header, Method, StatusCode};
use common::{item, TestApp};
use serde_json::{json, Value};
use tokio::sync::watch;
use uuid::Uuid;

/// Waits until the collection's rows satisfy `done`.
async fn wait_until(rx: &mut watch::Receiver<Vec<Value>>, done: impl Fn(&[Value]) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if done(&rx.borrow_and_update()) {
                return;
            }
            rx.changed().await.expect("live collection closed");
        }
    })
    .await
    .expect("timed out waiting for live rows");
}

#[tokio::test]
async fn live_collection_tracks_committed_writes() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let existing = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;

    let table = SyncTable::PurchaseRequests;
    let live = LiveCollection::open(
        &app.state.feed,
        table.as_ref(),
        None,
        table.loader(app.state.db.clone()),
    )
    .await
    .unwrap();
    assert_eq!(live.table(), "purchase_requests");
    assert_eq!(live.snapshot().len(), 1);
    let mut rx = live.subscribe();

    let created = app
        .create_pr(requester, json!([item("Monitor", "device", 2, 200)]))
        .await;
    let created_id = created["id"].clone();
    wait_until(&mut rx, |rows| rows.iter().any(|r| r["id"] == created_id)).await;

    app.walk_status(created["id"].as_str().unwrap(), &["pending_approval"])
        .await;
    wait_until(&mut rx, |rows| {
        rows.iter()
            .any(|r| r["id"] == created_id && r["status"] == "pending_approval")
    })
    .await;

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/purchase-requests/{}", existing["id"].as_str().unwrap()),
            None,
            "admin",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let existing_id = existing["id"].clone();
    wait_until(&mut rx, |rows| {
        rows.len() == 1 && rows.iter().all(|r| r["id"] != existing_id)
    })
    .await;

    live.close();
}

#[tokio::test]
async fn filtered_collection_drops_rows_that_stop_matching() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;

    let table = SyncTable::PurchaseRequests;
    let live = LiveCollection::open(
        &app.state.feed,
        table.as_ref(),
        Some(EqFilter::new("status", "draft")),
        table.loader(app.state.db.clone()),
    )
    .await
    .unwrap();
    assert!(live.snapshot().is_empty());
    let mut rx = live.subscribe();

    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].clone();
    wait_until(&mut rx, |rows| rows.iter().any(|r| r["id"] == pr_id)).await;

    app.walk_status(pr["id"].as_str().unwrap(), &["pending_approval"])
        .await;
    wait_until(&mut rx, |rows| rows.is_empty()).await;

    live.refresh().await.unwrap();
    assert!(live.snapshot().is_empty());
}

#[tokio::test]
async fn stream_endpoint_serves_event_stream() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/realtime/purchase_requests", "employee").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
}

#[tokio::test]
async fn stream_endpoint_checks_table_filter_and_grant() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/realtime/sessions", "admin").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .get("/api/v1/realtime/pr_items?column=pr_id", "admin")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/api/v1/realtime/permissions", "employee").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .get(
            &format!(
                "/api/v1/realtime/notifications?column=user_id&value={}",
                Uuid::new_v4()
            ),
            "employee",
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let own = format!(
        "/api/v1/realtime/notifications?column=user_id&value={}",
        app.user_id
    );
    let response = app.get(&own, "employee").await;
    assert_eq!(response.status(), StatusCode::OK);
}
