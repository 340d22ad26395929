mod common;

use assetdesk_api::config::StatusTransitionPolicy;
use axum::http::{Method, StatusCode};
use common::{data, decimal, item, json_body, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn totals_follow_item_changes() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;

    let pr = app
        .create_pr(
            requester,
            json!([
                item("Docking station", "device", 2, 50),
                item("IDE licence", "software", 1, 300),
            ]),
        )
        .await;
    assert_eq!(decimal(&pr["total_amount"]), dec!(400));
    assert_eq!(pr["status"], "draft");
    assert!(pr["pr_number"].as_str().unwrap().starts_with("PR-"));
    let pr_id = pr["id"].as_str().unwrap().to_string();

    let items = data(
        app.get(&format!("/api/v1/purchase-requests/{}/items", pr_id), "employee")
            .await,
    )
    .await;
    let items = items.as_array().unwrap();
    let mut line_totals: Vec<_> = items.iter().map(|i| decimal(&i["total_price"])).collect();
    line_totals.sort();
    assert_eq!(line_totals, vec![dec!(100), dec!(300)]);

    let added = app
        .post(
            &format!("/api/v1/purchase-requests/{}/items", pr_id),
            item("USB-C cable", "consumable", 3, 10),
            "officer",
        )
        .await;
    assert_eq!(added.status(), StatusCode::CREATED);
    let added = data(added).await;

    let pr = data(app.get(&format!("/api/v1/purchase-requests/{}", pr_id), "officer").await).await;
    assert_eq!(decimal(&pr["total_amount"]), dec!(430));

    let updated = app
        .patch(
            &format!("/api/v1/pr-items/{}", added["id"].as_str().unwrap()),
            json!({ "quantity": 5 }),
            "officer",
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(decimal(&data(updated).await["total_price"]), dec!(50));

    let pr = data(app.get(&format!("/api/v1/purchase-requests/{}", pr_id), "officer").await).await;
    assert_eq!(decimal(&pr["total_amount"]), dec!(450));

    let removed = app
        .request(
            Method::DELETE,
            &format!("/api/v1/pr-items/{}", added["id"].as_str().unwrap()),
            None,
            "officer",
        )
        .await;
    assert_eq!(removed.status(), StatusCode::OK);

    let pr = data(app.get(&format!("/api/v1/purchase-requests/{}", pr_id), "officer").await).await;
    assert_eq!(decimal(&pr["total_amount"]), dec!(400));
}

#[tokio::test]
async fn invalid_items_are_rejected() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Sam Okafor").await;

    for bad in [
        item("Monitor", "device", 0, 10),
        item("Monitor", "furniture", 1, 10),
        item("", "device", 1, 10),
    ] {
        let response = app
            .request_as(
                Method::POST,
                "/api/v1/purchase-requests",
                Some(json!({
                    "title": "Desk setup",
                    "requester_id": requester,
                    "requester_name": "Sam Okafor",
                    "items": [bad],
                })),
                requester,
                "employee",
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let listed = data(app.get("/api/v1/purchase-requests/search", "admin").await).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn status_change_records_one_history_row() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].as_str().unwrap();

    let details = data(
        app.get(&format!("/api/v1/purchase-requests/{}/details", pr_id), "manager")
            .await,
    )
    .await;
    assert_eq!(details["status_history"].as_array().unwrap().len(), 1);

    let response = app
        .patch(
            &format!("/api/v1/purchase-requests/{}/status", pr_id),
            json!({ "status": "pending_approval", "remarks": "ready for review" }),
            "manager",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(data(response).await["status"], "pending_approval");

    let details = data(
        app.get(&format!("/api/v1/purchase-requests/{}/details", pr_id), "manager")
            .await,
    )
    .await;
    let history = details["status_history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["status"], "pending_approval");
    assert_eq!(history[0]["changed_by"], json!(app.user_id));
    assert_eq!(history[0]["remarks"], "ready for review");
}

#[tokio::test]
async fn illegal_transition_is_a_conflict_and_changes_nothing() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].as_str().unwrap();

    let response = app
        .patch(
            &format!("/api/v1/purchase-requests/{}/status", pr_id),
            json!({ "status": "delivered" }),
            "admin",
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .patch(
            &format!("/api/v1/purchase-requests/{}/status", pr_id),
            json!({ "status": "shipped" }),
            "admin",
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let details = data(
        app.get(&format!("/api/v1/purchase-requests/{}/details", pr_id), "admin")
            .await,
    )
    .await;
    assert_eq!(details["request"]["status"], "draft");
    assert_eq!(details["status_history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn permissive_policy_accepts_any_move_but_still_records_it() {
    let app = TestApp::with_config(|cfg| {
        cfg.status_transition_policy = StatusTransitionPolicy::Permissive;
    })
    .await;
    let requester = app.seed_user("Dana Reyes").await;
    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].as_str().unwrap();

    app.walk_status(pr_id, &["delivered"]).await;

    let details = data(
        app.get(&format!("/api/v1/purchase-requests/{}/details", pr_id), "admin")
            .await,
    )
    .await;
    assert_eq!(details["request"]["status"], "delivered");
    assert_eq!(details["status_history"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn delivered_flow_notifies_requester_once() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].as_str().unwrap();

    app.walk_status(pr_id, &["pending_approval"]).await;

    let approval = app
        .post(
            &format!("/api/v1/purchase-requests/{}/approvals", pr_id),
            json!({ "decision": "approved", "remarks": "within budget" }),
            "manager",
        )
        .await;
    assert_eq!(approval.status(), StatusCode::CREATED);

    app.walk_status(pr_id, &["in_progress"]).await;

    let items = data(
        app.get(&format!("/api/v1/purchase-requests/{}/items", pr_id), "admin")
            .await,
    )
    .await;
    let item_id = items[0]["id"].as_str().unwrap().to_string();
    let delivered = app
        .patch(
            &format!("/api/v1/pr-items/{}/status", item_id),
            json!({ "status": "delivered" }),
            "officer",
        )
        .await;
    assert_eq!(delivered.status(), StatusCode::OK);
    let delivered = data(delivered).await;
    assert_eq!(delivered["status"], "delivered");
    assert!(delivered["delivered_at"].is_string());

    app.walk_status(pr_id, &["delivered"]).await;

    let inbox = data(
        app.request_as(Method::GET, "/api/v1/notifications", None, requester, "employee")
            .await,
    )
    .await;
    let inbox = inbox.as_array().unwrap();
    let by_category = |category: &str| {
        inbox
            .iter()
            .filter(|n| n["category"] == category)
            .count()
    };
    assert_eq!(by_category("pr_status"), 1);
    assert_eq!(by_category("pr_approval"), 1);
    assert_eq!(by_category("pr_delivery"), 1);
    assert!(inbox.iter().all(|n| n["related_id"] == json!(pr_id)));

    let details = data(
        app.get(&format!("/api/v1/purchase-requests/{}/details", pr_id), "admin")
            .await,
    )
    .await;
    assert_eq!(details["approvals"].as_array().unwrap().len(), 1);
    // draft, pending_approval, approved, in_progress, item delivered, delivered
    assert_eq!(details["status_history"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn items_cannot_be_delivered_before_work_starts() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].as_str().unwrap();

    let items = data(
        app.get(&format!("/api/v1/purchase-requests/{}/items", pr_id), "admin")
            .await,
    )
    .await;
    let response = app
        .patch(
            &format!("/api/v1/pr-items/{}/status", items[0]["id"].as_str().unwrap()),
            json!({ "status": "delivered" }),
            "admin",
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn closed_requests_keep_their_items() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].as_str().unwrap();

    app.walk_status(pr_id, &["cancelled"]).await;

    let response = app
        .post(
            &format!("/api/v1/purchase-requests/{}/items", pr_id),
            item("Mouse", "device", 1, 20),
            "admin",
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .patch(
            &format!("/api/v1/purchase-requests/{}/status", pr_id),
            json!({ "status": "draft" }),
            "admin",
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn employees_cannot_approve_or_delete() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].as_str().unwrap();
    app.walk_status(pr_id, &["pending_approval"]).await;

    let response = app
        .post(
            &format!("/api/v1/purchase-requests/{}/approvals", pr_id),
            json!({ "decision": "approved" }),
            "employee",
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/purchase-requests/{}", pr_id),
            None,
            "manager",
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn delete_removes_request_and_children() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].as_str().unwrap();

    let comment = app
        .post(
            &format!("/api/v1/purchase-requests/{}/comments", pr_id),
            json!({ "comment": "Needs the 32GB model" }),
            "employee",
        )
        .await;
    assert_eq!(comment.status(), StatusCode::CREATED);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/purchase-requests/{}", pr_id),
            None,
            "admin",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(data(response).await["deleted"], true);

    for path in ["", "/details", "/items"] {
        let response = app
            .get(&format!("/api/v1/purchase-requests/{}{}", pr_id, path), "admin")
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "path {:?}", path);
    }
}

#[tokio::test]
async fn unknown_request_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .get(&format!("/api/v1/purchase-requests/{}", Uuid::new_v4()), "admin")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn incomplete_requests_get_reminders() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;

    // Priced and described: nothing missing.
    app.create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    // No items at all.
    app.create_pr(requester, json!([])).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/purchase-requests/incomplete/notify",
            None,
            "officer",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let sent = data(response).await;
    let sent = sent.as_array().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["category"], "pr_incomplete");
    assert_eq!(sent[0]["user_id"], json!(requester));
}

#[tokio::test]
async fn decisions_through_status_need_the_approve_grant() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].as_str().unwrap();
    let uri = format!("/api/v1/purchase-requests/{}/status", pr_id);

    let response = app
        .patch(&uri, json!({ "status": "pending_approval" }), "officer")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    for decision in ["approved", "rejected"] {
        let response = app.patch(&uri, json!({ "status": decision }), "officer").await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{decision}");
    }

    let details = data(
        app.get(&format!("/api/v1/purchase-requests/{}/details", pr_id), "admin")
            .await,
    )
    .await;
    assert_eq!(details["request"]["status"], "pending_approval");
    assert_eq!(details["status_history"].as_array().unwrap().len(), 2);

    let response = app.patch(&uri, json!({ "status": "approved" }), "manager").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(data(response).await["status"], "approved");
}

#[tokio::test]
async fn amounts_past_the_money_column_are_rejected() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;

    let create = |items: serde_json::Value| {
        app.request_as(
            Method::POST,
            "/api/v1/purchase-requests",
            Some(json!({
                "title": "Data centre",
                "requester_id": requester,
                "requester_name": "Dana Reyes",
                "items": items,
            })),
            requester,
            "employee",
        )
    };

    let oversized = [
        json!([{ "name": "Rack", "category": "device", "quantity": 2, "unit_price": "79228162514264337593543950335" }]),
        json!([{ "name": "Rack", "category": "device", "quantity": 2, "unit_price": "999999999999.99" }]),
        json!([
            { "name": "Rack", "category": "device", "quantity": 1, "unit_price": "600000000000" },
            { "name": "Rack", "category": "device", "quantity": 1, "unit_price": "600000000000" },
        ]),
    ];
    for items in oversized {
        let response = create(items).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    let listed = data(app.get("/api/v1/purchase-requests/search", "admin").await).await;
    assert!(listed.as_array().unwrap().is_empty());

    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].as_str().unwrap();
    let items = data(
        app.get(&format!("/api/v1/purchase-requests/{}/items", pr_id), "admin")
            .await,
    )
    .await;
    let response = app
        .patch(
            &format!("/api/v1/pr-items/{}", items[0]["id"].as_str().unwrap()),
            json!({ "quantity": i32::MAX }),
            "officer",
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let pr = data(app.get(&format!("/api/v1/purchase-requests/{}", pr_id), "admin").await).await;
    assert_eq!(decimal(&pr["total_amount"]), dec!(1200));
}

async fn deliver_first_item(app: &TestApp, pr_id: &str) -> String {
    let items = data(
        app.get(&format!("/api/v1/purchase-requests/{}/items", pr_id), "admin")
            .await,
    )
    .await;
    let item_id = items[0]["id"].as_str().unwrap().to_string();
    let response = app
        .patch(
            &format!("/api/v1/pr-items/{}/status", item_id),
            json!({ "status": "delivered" }),
            "officer",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    item_id
}

#[tokio::test]
async fn delivered_items_do_not_go_back_under_strict_policy() {
    let app = TestApp::new().await;
    let requester = app.seed_user("Dana Reyes").await;
    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].as_str().unwrap();
    app.walk_status(pr_id, &["pending_approval", "approved", "in_progress"])
        .await;
    let item_id = deliver_first_item(&app, pr_id).await;

    for status in ["pending", "ordered", "delivered"] {
        let response = app
            .patch(
                &format!("/api/v1/pr-items/{}/status", item_id),
                json!({ "status": status }),
                "officer",
            )
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT, "{status}");
    }

    let items = data(
        app.get(&format!("/api/v1/purchase-requests/{}/items", pr_id), "admin")
            .await,
    )
    .await;
    assert_eq!(items[0]["status"], "delivered");
    assert_eq!(items[0]["delivery_status"], "delivered");
    assert!(items[0]["delivered_at"].is_string());
}

#[tokio::test]
async fn leaving_delivered_clears_the_delivery() {
    let app = TestApp::with_config(|cfg| {
        cfg.status_transition_policy = StatusTransitionPolicy::Permissive;
    })
    .await;
    let requester = app.seed_user("Dana Reyes").await;
    let pr = app
        .create_pr(requester, json!([item("Laptop", "device", 1, 1200)]))
        .await;
    let pr_id = pr["id"].as_str().unwrap();
    app.walk_status(pr_id, &["in_progress"]).await;
    let item_id = deliver_first_item(&app, pr_id).await;

    let delivered = data(
        app.get("/api/v1/purchase-requests/search?is_delivered=true", "officer")
            .await,
    )
    .await;
    assert_eq!(delivered.as_array().unwrap().len(), 1);

    let response = app
        .patch(
            &format!("/api/v1/pr-items/{}/status", item_id),
            json!({ "status": "pending" }),
            "officer",
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let reverted = data(response).await;
    assert_eq!(reverted["status"], "pending");
    assert_eq!(reverted["delivery_status"], "pending");
    assert!(reverted["delivered_at"].is_null());

    let delivered = data(
        app.get("/api/v1/purchase-requests/search?is_delivered=true", "officer")
            .await,
    )
    .await;
    assert!(delivered.as_array().unwrap().is_empty());
}
