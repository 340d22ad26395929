//! sea-orm entities. Each module holds one table.

// Purchase-request workflow
pub mod assignment_action;
pub mod notification;
pub mod permission;
pub mod pr_approval;
pub mod pr_attachment;
pub mod pr_comment;
pub mod pr_item;
pub mod pr_status_history;
pub mod purchase_request;

// Reference data
pub mod department;
pub mod device;
pub mod incident;
pub mod inventory_item;
pub mod project;
pub mod request;
pub mod user;
