pub mod assignment_actions;
pub mod common;
pub mod health;
pub mod notifications;
pub mod permissions;
pub mod pr_items;
pub mod purchase_requests;
pub mod realtime;
pub mod reference;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    events::EventSender,
    export::ExportService,
    realtime::ChangeFeed,
    services::{
        assignments::AssignmentService, notifications::NotificationService,
        permissions::PermissionService, purchase_requests::PurchaseRequestService,
        reference::ReferenceService, search::SearchService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub notifications: NotificationService,
    pub permissions: PermissionService,
    pub assignments: AssignmentService,
    pub purchase_requests: PurchaseRequestService,
    pub search: SearchService,
    pub export: ExportService,
    pub reference: ReferenceService,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        feed: Arc<ChangeFeed>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Self {
        let search = SearchService::new(db.clone());

        Self {
            notifications: NotificationService::new(
                db.clone(),
                feed.clone(),
                event_sender.clone(),
            ),
            permissions: PermissionService::new(db.clone(), feed.clone(), event_sender.clone()),
            assignments: AssignmentService::new(db.clone(), feed.clone(), event_sender.clone()),
            purchase_requests: PurchaseRequestService::new(
                db.clone(),
                feed.clone(),
                event_sender,
                config.status_transition_policy,
            ),
            export: ExportService::new(search.clone(), config.max_export_rows),
            search,
            reference: ReferenceService::new(db, feed),
        }
    }
}
