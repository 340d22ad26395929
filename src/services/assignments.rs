use std::sync::Arc;

use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityName, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{now_micros, one_micro},
    entities::{
        assignment_action::{self, AssignmentActionStatus, AssignmentTarget},
        department, inventory_item,
        notification::{self, NotificationCategory, NotificationType},
        pr_item::{self, PrItemStatus},
        pr_status_history, purchase_request, user,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    realtime::{ChangeFeed, ChangeKind},
    services::{
        notifications::{insert_notification, NewNotification, NotificationService},
        purchase_requests::{ensure_items_editable, insert_history},
    },
};

/// Routes one PR item to a destination.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AssignItemRequest {
    pub pr_item_id: Uuid,
    pub target: AssignmentTarget,
    pub assigned_by: Uuid,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Rows committed together with a completed assignment.
struct Applied {
    action: assignment_action::Model,
    item: pr_item::Model,
    history: Option<pr_status_history::Model>,
    notification: notification::Model,
}

/// Append-only routing history for PR items.
#[derive(Clone)]
pub struct AssignmentService {
    db: Arc<DatabaseConnection>,
    feed: Arc<ChangeFeed>,
    event_sender: Arc<EventSender>,
    notifications: NotificationService,
}

impl AssignmentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        feed: Arc<ChangeFeed>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let notifications = NotificationService::new(db.clone(), feed.clone(), event_sender.clone());
        Self {
            db,
            feed,
            event_sender,
            notifications,
        }
    }

    /// Records an assignment and applies it to the item.
    ///
    /// The action row is written first as `pending`. It becomes `completed` in
    /// the same transaction that updates the item, or `failed` when that
    /// transaction does not go through, in which case its error is returned.
    #[instrument(skip(self, request), fields(pr_item_id = %request.pr_item_id, target = ?request.target))]
    pub async fn assign(
        &self,
        request: AssignItemRequest,
    ) -> Result<assignment_action::Model, ServiceError> {
        request.validate()?;

        let item = pr_item::Entity::find_by_id(request.pr_item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("PR item {} not found", request.pr_item_id))
            })?;
        if item.status.is_terminal() {
            return Err(ServiceError::InvalidTransition(format!(
                "item '{}' is {} and cannot be assigned",
                item.name, item.status
            )));
        }
        let pr = purchase_request::Entity::find_by_id(item.pr_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase request {} not found", item.pr_id))
            })?;
        ensure_items_editable(&pr)?;
        self.ensure_target_exists(&request.target).await?;

        let assigned_at = self.next_assigned_at(item.id).await?;
        let action = assignment_action::ActiveModel {
            id: Set(Uuid::new_v4()),
            pr_item_id: Set(item.id),
            action_type: Set(request.target.action_type()),
            target_id: Set(request.target.target_id()),
            assigned_by: Set(request.assigned_by),
            assigned_at: Set(assigned_at),
            notes: Set(request.notes.clone()),
            status: Set(AssignmentActionStatus::Pending),
        }
        .insert(&*self.db)
        .await?;
        self.feed.publish_row(
            assignment_action::Entity.table_name(),
            ChangeKind::Insert,
            &action,
        );

        match self.apply_to_item(&item, &action).await {
            Ok(Applied {
                action,
                item: updated_item,
                history,
                notification: created,
            }) => {
                self.feed.publish_row(
                    assignment_action::Entity.table_name(),
                    ChangeKind::Update,
                    &action,
                );
                self.feed
                    .publish_row(pr_item::Entity.table_name(), ChangeKind::Update, &updated_item);
                if let Some(history) = &history {
                    self.feed.publish_row(
                        pr_status_history::Entity.table_name(),
                        ChangeKind::Insert,
                        history,
                    );
                }
                self.notifications.announce(&created).await;

                counter!(
                    "assetdesk_assignments_total",
                    1,
                    "action_type" => action.action_type.to_string(),
                    "status" => "completed"
                );
                info!(action_id = %action.id, "PR item assigned");
                self.event_sender
                    .send_or_log(Event::ItemAssigned {
                        pr_item_id: action.pr_item_id,
                        action_id: action.id,
                        action_type: action.action_type.to_string(),
                        target_id: action.target_id,
                    })
                    .await;

                Ok(action)
            }
            Err(cause) => {
                error!(action_id = %action.id, error = %cause, "Item update failed; keeping action as failed");
                let action_id = action.id;
                if let Err(e) = self.mark_failed(action).await {
                    warn!(%action_id, error = %e, "Could not finalise failed assignment action");
                }
                counter!(
                    "assetdesk_assignments_total",
                    1,
                    "action_type" => request.target.action_type().to_string(),
                    "status" => "failed"
                );
                self.event_sender
                    .send_or_log(Event::AssignmentFailed {
                        pr_item_id: item.id,
                        action_id,
                    })
                    .await;
                Err(cause)
            }
        }
    }

    /// Actions for one item, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_item(
        &self,
        pr_item_id: Uuid,
    ) -> Result<Vec<assignment_action::Model>, ServiceError> {
        Ok(assignment_action::Entity::find()
            .filter(assignment_action::Column::PrItemId.eq(pr_item_id))
            .order_by_desc(assignment_action::Column::AssignedAt)
            .all(&*self.db)
            .await?)
    }

    /// Actions across every item of a purchase request, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_request(
        &self,
        pr_id: Uuid,
    ) -> Result<Vec<assignment_action::Model>, ServiceError> {
        let item_ids: Vec<Uuid> = pr_item::Entity::find()
            .select_only()
            .column(pr_item::Column::Id)
            .filter(pr_item::Column::PrId.eq(pr_id))
            .into_tuple()
            .all(&*self.db)
            .await?;
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(assignment_action::Entity::find()
            .filter(assignment_action::Column::PrItemId.is_in(item_ids))
            .order_by_desc(assignment_action::Column::AssignedAt)
            .all(&*self.db)
            .await?)
    }

    /// Latest action for the item that did not fail.
    pub async fn current_assignment(
        &self,
        pr_item_id: Uuid,
    ) -> Result<Option<assignment_action::Model>, ServiceError> {
        Ok(assignment_action::Entity::find()
            .filter(assignment_action::Column::PrItemId.eq(pr_item_id))
            .filter(assignment_action::Column::Status.ne(AssignmentActionStatus::Failed))
            .order_by_desc(assignment_action::Column::AssignedAt)
            .one(&*self.db)
            .await?)
    }

    async fn ensure_target_exists(&self, target: &AssignmentTarget) -> Result<(), ServiceError> {
        let found = match *target {
            AssignmentTarget::Inventory(id) => inventory_item::Entity::find_by_id(id)
                .one(&*self.db)
                .await?
                .is_some(),
            AssignmentTarget::User(id) => user::Entity::find_by_id(id)
                .one(&*self.db)
                .await?
                .is_some(),
            AssignmentTarget::Department(id) => department::Entity::find_by_id(id)
                .one(&*self.db)
                .await?
                .is_some(),
        };

        if found {
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!(
                "{} target {} not found",
                target.action_type(),
                target.target_id()
            )))
        }
    }

    /// Now, or one microsecond past the item's latest action.
    async fn next_assigned_at(
        &self,
        pr_item_id: Uuid,
    ) -> Result<chrono::DateTime<chrono::Utc>, ServiceError> {
        let now = now_micros();
        let latest = assignment_action::Entity::find()
            .filter(assignment_action::Column::PrItemId.eq(pr_item_id))
            .order_by_desc(assignment_action::Column::AssignedAt)
            .one(&*self.db)
            .await?;

        Ok(match latest {
            Some(prev) if now <= prev.assigned_at => prev.assigned_at + one_micro(),
            _ => now,
        })
    }

    /// Updates the item, records its status change and completes the action
    /// in one transaction.
    async fn apply_to_item(
        &self,
        item: &pr_item::Model,
        action: &assignment_action::Model,
    ) -> Result<Applied, ServiceError> {
        let txn = self.db.begin().await?;

        let pr = purchase_request::Entity::find_by_id(item.pr_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase request {} not found", item.pr_id))
            })?;

        let mut active: pr_item::ActiveModel = item.clone().into();
        active.assigned_at = Set(Some(action.assigned_at));
        active.status = Set(PrItemStatus::Assigned);
        active.updated_at = Set(now_micros());
        let updated = active.update(&txn).await?;

        let history = if item.status != PrItemStatus::Assigned {
            Some(
                insert_history(
                    &txn,
                    pr.id,
                    Some(item.id),
                    PrItemStatus::Assigned.to_string(),
                    action.assigned_by,
                    action.notes.clone(),
                )
                .await?,
            )
        } else {
            None
        };

        let (recipient, title, message) = match action.target() {
            AssignmentTarget::User(user_id) => (
                user_id,
                "Item assigned to you",
                format!("'{}' from {} has been assigned to you", item.name, pr.pr_number),
            ),
            AssignmentTarget::Inventory(_) => (
                pr.requester_id,
                "Item moved to inventory",
                format!("'{}' from {} has been assigned to inventory", item.name, pr.pr_number),
            ),
            AssignmentTarget::Department(_) => (
                pr.requester_id,
                "Item assigned to department",
                format!("'{}' from {} has been assigned to a department", item.name, pr.pr_number),
            ),
        };
        let created = insert_notification(
            &txn,
            NewNotification::new(
                recipient,
                NotificationType::Info,
                NotificationCategory::PrAssignment,
                title,
                message,
            )
            .related_to(pr.id, format!("/purchase-requests/{}", pr.id)),
        )
        .await?;

        let mut completed: assignment_action::ActiveModel = action.clone().into();
        completed.status = Set(AssignmentActionStatus::Completed);
        let action = completed.update(&txn).await?;

        txn.commit().await?;
        Ok(Applied {
            action,
            item: updated,
            history,
            notification: created,
        })
    }

    async fn mark_failed(
        &self,
        action: assignment_action::Model,
    ) -> Result<assignment_action::Model, ServiceError> {
        let mut active: assignment_action::ActiveModel = action.into();
        active.status = Set(AssignmentActionStatus::Failed);
        let updated = active.update(&*self.db).await?;
        self.feed.publish_row(
            assignment_action::Entity.table_name(),
            ChangeKind::Update,
            &updated,
        );
        Ok(updated)
    }
}
