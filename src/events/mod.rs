use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), ServiceError> {
        self.sender
            .send(event)
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))
    }

    /// Sends an event, logging instead of failing when the processor is gone.
    /// Domain writes are already committed when events go out.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

/// Domain events emitted after committed writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PurchaseRequestCreated {
        pr_id: Uuid,
        pr_number: String,
    },
    PurchaseRequestDeleted(Uuid),
    PrStatusChanged {
        pr_id: Uuid,
        old_status: String,
        new_status: String,
        changed_by: Uuid,
    },
    PrItemStatusChanged {
        pr_id: Uuid,
        pr_item_id: Uuid,
        new_status: String,
    },
    PrItemsChanged(Uuid),
    ApprovalRecorded {
        pr_id: Uuid,
        approver_id: Uuid,
        decision: String,
    },
    ItemAssigned {
        pr_item_id: Uuid,
        action_id: Uuid,
        action_type: String,
        target_id: Uuid,
    },
    AssignmentFailed {
        pr_item_id: Uuid,
        action_id: Uuid,
    },
    NotificationCreated {
        notification_id: Uuid,
        user_id: Uuid,
        category: String,
    },
    NotificationsRead {
        user_id: Uuid,
        count: u64,
    },
    PermissionChanged {
        role: String,
        resource: String,
        action: String,
        granted: bool,
    },
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// Create a generic event with string data
    pub fn with_data(data: String) -> Self {
        Event::Generic {
            message: data,
            timestamp: Utc::now(),
        }
    }

    /// Stable name used for counters and log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Event::PurchaseRequestCreated { .. } => "purchase_request_created",
            Event::PurchaseRequestDeleted(_) => "purchase_request_deleted",
            Event::PrStatusChanged { .. } => "pr_status_changed",
            Event::PrItemStatusChanged { .. } => "pr_item_status_changed",
            Event::PrItemsChanged(_) => "pr_items_changed",
            Event::ApprovalRecorded { .. } => "approval_recorded",
            Event::ItemAssigned { .. } => "item_assigned",
            Event::AssignmentFailed { .. } => "assignment_failed",
            Event::NotificationCreated { .. } => "notification_created",
            Event::NotificationsRead { .. } => "notifications_read",
            Event::PermissionChanged { .. } => "permission_changed",
            Event::Generic { .. } => "generic",
        }
    }
}

/// Drains the event channel, logging each event and counting it by name.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("assetdesk_events_total", 1, "event" => event.name());

        match &event {
            Event::PrStatusChanged {
                pr_id,
                old_status,
                new_status,
                changed_by,
            } => {
                info!(%pr_id, %old_status, %new_status, %changed_by, "Purchase request status changed");
            }
            Event::ItemAssigned {
                pr_item_id,
                action_id,
                action_type,
                target_id,
            } => {
                info!(%pr_item_id, %action_id, %action_type, %target_id, "PR item assigned");
            }
            Event::AssignmentFailed {
                pr_item_id,
                action_id,
            } => {
                warn!(%pr_item_id, %action_id, "Assignment action finalised as failed");
            }
            Event::PermissionChanged {
                role,
                resource,
                action,
                granted,
            } => {
                info!(%role, %resource, %action, granted, "Permission updated");
            }
            other => {
                info!(event = other.name(), "Received event: {:?}", other);
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_fails_once_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::PurchaseRequestDeleted(Uuid::new_v4()))
            .await
            .unwrap();

        drop(rx);
        let result = sender.send(Event::with_data("late".into())).await;
        assert!(matches!(result, Err(ServiceError::EventError(_))));

        // never panics or errors
        sender.send_or_log(Event::with_data("later".into())).await;
    }

    #[tokio::test]
    async fn processor_stops_when_all_senders_close() {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(process_events(rx));

        let sender = EventSender::new(tx);
        sender
            .send(Event::NotificationsRead {
                user_id: Uuid::new_v4(),
                count: 3,
            })
            .await
            .unwrap();
        drop(sender);

        handle.await.unwrap();
    }
}
