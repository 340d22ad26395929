use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "AssetDesk API",
        version = "1.0.0",
        description = r#"
# AssetDesk API

Backend for the IT asset and purchase request dashboard.

## Features

- **Purchase requests**: draft, approve, fulfil and close requests with line items
- **Assignments**: route delivered items to inventory, a user or a department
- **Notifications**: per-user inbox fed by lifecycle events
- **Search & export**: filtered listings as CSV, Excel, PDF or JSON
- **Realtime**: server-sent row changes per table

## Authentication

Every `/api/v1` request carries the store access key and the caller's identity:

```
x-api-key: <store access key>
x-user-id: <uuid>
x-user-role: admin | manager | officer | employee
```

Authorization is evaluated against the permissions table; a missing grant is a 403.

## Errors

```json
{
  "error": "Validation error",
  "message": "invalid action_type: 'assign_to_moon'",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    tags(
        (name = "purchase-requests", description = "Purchase request lifecycle, search and export"),
        (name = "pr-items", description = "Line item maintenance"),
        (name = "assignments", description = "Assignment actions"),
        (name = "notifications", description = "User inbox"),
        (name = "permissions", description = "Role permissions"),
        (name = "reference", description = "Users, departments, devices, inventory, incidents, projects, requests"),
        (name = "realtime", description = "Server-sent change streams"),
        (name = "health", description = "Health and status")
    ),
    paths(
        // Purchase requests
        handlers::purchase_requests::create_purchase_request,
        handlers::purchase_requests::search_purchase_requests,
        handlers::purchase_requests::export_purchase_requests,
        handlers::purchase_requests::get_purchase_request,
        handlers::purchase_requests::get_purchase_request_details,
        handlers::purchase_requests::delete_purchase_request,
        handlers::purchase_requests::update_purchase_request_status,
        handlers::purchase_requests::list_purchase_request_items,
        handlers::purchase_requests::add_purchase_request_item,
        handlers::purchase_requests::decide_purchase_request,
        handlers::purchase_requests::add_purchase_request_comment,
        handlers::purchase_requests::add_purchase_request_attachment,
        handlers::purchase_requests::notify_incomplete_requests,
        // Items
        handlers::pr_items::update_pr_item,
        handlers::pr_items::delete_pr_item,
        handlers::pr_items::update_pr_item_status,
        handlers::pr_items::list_pr_item_assignments,
        handlers::pr_items::get_current_pr_item_assignment,
        // Assignments
        handlers::assignment_actions::list_assignment_actions,
        handlers::assignment_actions::create_assignment_action,
        // Notifications
        handlers::notifications::list_notifications,
        handlers::notifications::create_notification,
        handlers::notifications::mark_all_notifications_read,
        handlers::notifications::mark_notification_read,
        // Permissions
        handlers::permissions::get_role_permissions,
        handlers::permissions::check_permission,
        handlers::permissions::set_permission,
        // Reference data
        handlers::reference::list_reference,
        handlers::reference::create_reference,
        // Realtime
        handlers::realtime::stream_table_changes,
        // Health
        handlers::health::health_check,
        handlers::health::api_status,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::ResponseMeta,
            crate::entities::purchase_request::PrStatus,
            crate::entities::purchase_request::PrPriority,
            crate::entities::pr_item::PrItemStatus,
            crate::entities::pr_item::ItemCategory,
            crate::entities::pr_item::DeliveryStatus,
            crate::entities::assignment_action::AssignmentActionType,
            crate::entities::assignment_action::AssignmentActionStatus,
            crate::entities::notification::NotificationType,
            crate::entities::notification::NotificationCategory,
            crate::entities::permission::Resource,
            crate::entities::permission::PermissionAction,
            crate::entities::pr_approval::ApprovalDecision,
            handlers::reference::ReferenceRow,
        )
    ),
    modifiers(&AccessKeyAddon)
)]
pub struct ApiDocV1;

/// Registers the `x-api-key` header as the `ApiKey` scheme.
struct AccessKeyAddon;

impl Modify for AccessKeyAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "ApiKey",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                crate::auth::API_KEY_HEADER,
            ))),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_surface() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("AssetDesk API"));
        assert!(json.contains("/api/v1/purchase-requests/{id}/details"));
        assert!(json.contains("/api/v1/assignment-actions"));
        assert!(json.contains("/api/v1/realtime/{table}"));
        assert!(json.contains("x-api-key"));
    }

    #[test]
    fn reference_rows_are_documented_as_objects() {
        let doc = serde_json::to_value(ApiDocV1::openapi()).unwrap();
        assert_eq!(doc["components"]["schemas"]["ReferenceRow"]["type"], "object");
        assert!(doc["paths"]["/api/v1/{collection}"]["get"]["responses"]["200"].is_object());
        assert!(doc["paths"]["/api/v1/{collection}"]["post"]["requestBody"].is_object());
    }
}
