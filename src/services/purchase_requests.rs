use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityName, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::now_micros,
    config::StatusTransitionPolicy,
    entities::{
        assignment_action,
        notification::{self, NotificationCategory, NotificationType},
        pr_approval::{self, ApprovalDecision},
        pr_attachment, pr_comment,
        pr_item::{
            self, line_total, max_amount, sum_amounts, DeliveryStatus, ItemCategory, PrItemStatus,
        },
        pr_status_history,
        purchase_request::{self, PrPriority, PrStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    realtime::{ChangeFeed, ChangeKind},
    services::notifications::{insert_notification, NewNotification, NotificationService},
};

fn validate_unit_price(value: &Decimal) -> Result<(), ValidationError> {
    let message = if *value < Decimal::ZERO {
        "unit_price must not be negative"
    } else if *value > max_amount() {
        "unit_price exceeds the largest storable amount"
    } else {
        return Ok(());
    };
    let mut err = ValidationError::new("range");
    err.message = Some(message.into());
    Err(err)
}

fn checked_line_total(quantity: i32, unit_price: Decimal) -> Result<Decimal, ServiceError> {
    line_total(quantity, unit_price).ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "line total of {} x {} exceeds the largest storable amount",
            quantity, unit_price
        ))
    })
}

fn checked_sum(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal, ServiceError> {
    sum_amounts(amounts).ok_or_else(|| {
        ServiceError::ValidationError(
            "request total exceeds the largest storable amount".to_string(),
        )
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewPrItem {
    #[validate(length(min = 1, max = 200, message = "item name must not be empty"))]
    pub name: String,
    pub description: Option<String>,
    pub category: ItemCategory,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(custom = "validate_unit_price")]
    pub unit_price: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewPurchaseRequest {
    #[validate(length(min = 1, max = 200, message = "title must not be empty"))]
    pub title: String,
    pub description: Option<String>,
    pub requester_id: Uuid,
    #[validate(length(max = 200))]
    pub requester_name: String,
    pub department_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub priority: PrPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<NewPrItem>,
}

/// Partial update of an item; absent fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePrItem {
    #[validate(length(min = 1, max = 200, message = "item name must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ItemCategory>,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: Option<i32>,
    #[validate(custom = "validate_unit_price")]
    pub unit_price: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewAttachment {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(min = 1, max = 2048))]
    pub file_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrItemWithActions {
    #[serde(flatten)]
    pub item: pr_item::Model,
    pub assignment_actions: Vec<assignment_action::Model>,
    pub current_assignment: Option<assignment_action::Model>,
}

/// Everything the detail view shows for one purchase request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseRequestDetails {
    pub request: purchase_request::Model,
    pub items: Vec<PrItemWithActions>,
    pub status_history: Vec<pr_status_history::Model>,
    pub approvals: Vec<pr_approval::Model>,
    pub comments: Vec<pr_comment::Model>,
    pub attachments: Vec<pr_attachment::Model>,
    pub notifications: Vec<notification::Model>,
    pub assignment_actions: Vec<assignment_action::Model>,
}

/// Rows written by one status transition, published after commit.
struct Transition {
    request: purchase_request::Model,
    old_status: PrStatus,
    history: pr_status_history::Model,
    notification: Option<notification::Model>,
}

fn generate_pr_number(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("PR-{}-{}", at.format("%Y%m%d"), suffix)
}

fn pr_url(pr_id: Uuid) -> String {
    format!("/purchase-requests/{}", pr_id)
}

/// Lifecycle of purchase requests and their items.
#[derive(Clone)]
pub struct PurchaseRequestService {
    db: Arc<DatabaseConnection>,
    feed: Arc<ChangeFeed>,
    event_sender: Arc<EventSender>,
    notifications: NotificationService,
    policy: StatusTransitionPolicy,
}

impl PurchaseRequestService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        feed: Arc<ChangeFeed>,
        event_sender: Arc<EventSender>,
        policy: StatusTransitionPolicy,
    ) -> Self {
        let notifications = NotificationService::new(db.clone(), feed.clone(), event_sender.clone());
        Self {
            db,
            feed,
            event_sender,
            notifications,
            policy,
        }
    }

    /// Creates a draft request with its items and an initial history row.
    #[instrument(skip(self, input), fields(requester_id = %input.requester_id, items = input.items.len()))]
    pub async fn create(
        &self,
        input: NewPurchaseRequest,
    ) -> Result<purchase_request::Model, ServiceError> {
        input.validate()?;
        for item in &input.items {
            item.validate()?;
        }

        let now = now_micros();
        let pr_id = Uuid::new_v4();
        let line_totals = input
            .items
            .iter()
            .map(|i| checked_line_total(i.quantity, i.unit_price))
            .collect::<Result<Vec<_>, _>>()?;
        let total_amount = checked_sum(line_totals)?;

        let txn = self.db.begin().await?;

        let request = purchase_request::ActiveModel {
            id: Set(pr_id),
            pr_number: Set(generate_pr_number(now)),
            title: Set(input.title),
            description: Set(input.description),
            requester_id: Set(input.requester_id),
            requester_name: Set(input.requester_name),
            department_id: Set(input.department_id),
            assigned_to: Set(input.assigned_to),
            status: Set(PrStatus::Draft),
            priority: Set(input.priority),
            total_amount: Set(total_amount),
            created_at: Set(now),
            updated_at: Set(now),
            due_date: Set(input.due_date),
            notes: Set(input.notes),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in input.items {
            items.push(insert_item(&txn, pr_id, item, now).await?);
        }

        let history = insert_history(
            &txn,
            pr_id,
            None,
            PrStatus::Draft.to_string(),
            input.requester_id,
            None,
        )
        .await?;

        txn.commit().await?;

        self.feed.publish_row(
            purchase_request::Entity.table_name(),
            ChangeKind::Insert,
            &request,
        );
        for item in &items {
            self.feed
                .publish_row(pr_item::Entity.table_name(), ChangeKind::Insert, item);
        }
        self.feed.publish_row(
            pr_status_history::Entity.table_name(),
            ChangeKind::Insert,
            &history,
        );

        counter!("assetdesk_purchase_requests_created_total", 1);
        info!(pr_id = %request.id, pr_number = %request.pr_number, "Purchase request created");
        self.event_sender
            .send_or_log(Event::PurchaseRequestCreated {
                pr_id: request.id,
                pr_number: request.pr_number.clone(),
            })
            .await;

        Ok(request)
    }

    pub async fn get(&self, pr_id: Uuid) -> Result<purchase_request::Model, ServiceError> {
        find_request(&*self.db, pr_id).await
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<pr_item::Model, ServiceError> {
        find_item(&*self.db, item_id).await
    }

    /// Items of a request in creation order.
    pub async fn items(&self, pr_id: Uuid) -> Result<Vec<pr_item::Model>, ServiceError> {
        Ok(pr_item::Entity::find()
            .filter(pr_item::Column::PrId.eq(pr_id))
            .order_by_asc(pr_item::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn add_item(
        &self,
        pr_id: Uuid,
        input: NewPrItem,
    ) -> Result<pr_item::Model, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let request = find_request(&txn, pr_id).await?;
        ensure_items_editable(&request)?;

        let item = insert_item(&txn, pr_id, input, now_micros()).await?;
        let request = recompute_total(&txn, request).await?;
        txn.commit().await?;

        self.feed
            .publish_row(pr_item::Entity.table_name(), ChangeKind::Insert, &item);
        self.publish_request(&request);
        self.event_sender
            .send_or_log(Event::PrItemsChanged(pr_id))
            .await;

        Ok(item)
    }

    #[instrument(skip(self, input))]
    pub async fn update_item(
        &self,
        item_id: Uuid,
        input: UpdatePrItem,
    ) -> Result<pr_item::Model, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;
        let item = find_item(&txn, item_id).await?;
        let request = find_request(&txn, item.pr_id).await?;
        ensure_items_editable(&request)?;

        let quantity = input.quantity.unwrap_or(item.quantity);
        let unit_price = input.unit_price.unwrap_or(item.unit_price);
        let total_price = checked_line_total(quantity, unit_price)?;

        let mut active: pr_item::ActiveModel = item.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if input.description.is_some() {
            active.description = Set(input.description);
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if input.notes.is_some() {
            active.notes = Set(input.notes);
        }
        active.quantity = Set(quantity);
        active.unit_price = Set(unit_price);
        active.total_price = Set(total_price);
        active.updated_at = Set(now_micros());
        let item = active.update(&txn).await?;

        let request = recompute_total(&txn, request).await?;
        txn.commit().await?;

        self.feed
            .publish_row(pr_item::Entity.table_name(), ChangeKind::Update, &item);
        self.publish_request(&request);
        self.event_sender
            .send_or_log(Event::PrItemsChanged(item.pr_id))
            .await;

        Ok(item)
    }

    /// Deletes an item and its assignment history.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let item = find_item(&txn, item_id).await?;
        let request = find_request(&txn, item.pr_id).await?;
        ensure_items_editable(&request)?;

        assignment_action::Entity::delete_many()
            .filter(assignment_action::Column::PrItemId.eq(item_id))
            .exec(&txn)
            .await?;
        pr_item::Entity::delete_by_id(item_id).exec(&txn).await?;
        let request = recompute_total(&txn, request).await?;
        txn.commit().await?;

        self.feed.publish(
            pr_item::Entity.table_name(),
            ChangeKind::Delete,
            json!({ "id": item_id, "pr_id": item.pr_id }),
        );
        self.publish_request(&request);
        self.event_sender
            .send_or_log(Event::PrItemsChanged(item.pr_id))
            .await;

        Ok(())
    }

    /// Moves a request to `new_status` and records one history row.
    #[instrument(skip(self, remarks))]
    pub async fn update_status(
        &self,
        pr_id: Uuid,
        new_status: PrStatus,
        changed_by: Uuid,
        remarks: Option<String>,
    ) -> Result<purchase_request::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let request = find_request(&txn, pr_id).await?;
        let transition = self
            .transition_in_txn(&txn, request, new_status, changed_by, remarks)
            .await?;
        txn.commit().await?;

        Ok(self.announce_transition(transition, changed_by).await)
    }

    /// Records an approval decision and moves the request accordingly.
    #[instrument(skip(self, remarks))]
    pub async fn decide_approval(
        &self,
        pr_id: Uuid,
        approver_id: Uuid,
        decision: ApprovalDecision,
        remarks: Option<String>,
    ) -> Result<pr_approval::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let request = find_request(&txn, pr_id).await?;

        let approval = pr_approval::ActiveModel {
            id: Set(Uuid::new_v4()),
            pr_id: Set(pr_id),
            approver_id: Set(approver_id),
            status: Set(decision),
            approved_at: Set(now_micros()),
            remarks: Set(remarks.clone()),
        }
        .insert(&txn)
        .await?;

        let new_status = match decision {
            ApprovalDecision::Approved => PrStatus::Approved,
            ApprovalDecision::Rejected => PrStatus::Rejected,
        };
        let transition = self
            .transition_in_txn(&txn, request, new_status, approver_id, remarks)
            .await?;

        let approved_notice = if decision == ApprovalDecision::Approved {
            let pr = &transition.request;
            Some(
                insert_notification(
                    &txn,
                    NewNotification::new(
                        pr.requester_id,
                        NotificationType::Success,
                        NotificationCategory::PrApproval,
                        "Purchase request approved",
                        format!("{} '{}' has been approved", pr.pr_number, pr.title),
                    )
                    .related_to(pr.id, pr_url(pr.id)),
                )
                .await?,
            )
        } else {
            None
        };

        txn.commit().await?;

        self.feed
            .publish_row(pr_approval::Entity.table_name(), ChangeKind::Insert, &approval);
        self.announce_transition(transition, approver_id).await;
        if let Some(created) = approved_notice {
            self.notifications.announce(&created).await;
        }
        self.event_sender
            .send_or_log(Event::ApprovalRecorded {
                pr_id,
                approver_id,
                decision: decision.to_string(),
            })
            .await;

        Ok(approval)
    }

    /// Changes one item's status; one history row carries the item id.
    #[instrument(skip(self, remarks))]
    pub async fn update_item_status(
        &self,
        item_id: Uuid,
        new_status: PrItemStatus,
        changed_by: Uuid,
        remarks: Option<String>,
    ) -> Result<pr_item::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let item = find_item(&txn, item_id).await?;
        let request = find_request(&txn, item.pr_id).await?;

        if self.policy == StatusTransitionPolicy::Strict
            && !item.status.can_transition_to(new_status)
        {
            return Err(ServiceError::InvalidTransition(format!(
                "item '{}' cannot move from {} to {}",
                item.name, item.status, new_status
            )));
        }
        if new_status == PrItemStatus::Delivered && !request.status.accepts_deliveries() {
            return Err(ServiceError::InvalidTransition(format!(
                "items of {} cannot be delivered while the request is {}",
                request.pr_number, request.status
            )));
        }

        let now = now_micros();
        let mut active: pr_item::ActiveModel = item.clone().into();
        active.status = Set(new_status);
        active.updated_at = Set(now);
        match new_status {
            PrItemStatus::Delivered => {
                active.delivered_at = Set(Some(now));
                active.delivery_status = Set(DeliveryStatus::Delivered);
            }
            PrItemStatus::Ordered => {
                active.delivered_at = Set(None);
                active.delivery_status = Set(DeliveryStatus::InTransit);
            }
            PrItemStatus::Pending => {
                active.delivered_at = Set(None);
                active.delivery_status = Set(DeliveryStatus::Pending);
            }
            PrItemStatus::Assigned | PrItemStatus::Cancelled => {}
        }
        let updated = active.update(&txn).await?;

        let history = insert_history(
            &txn,
            request.id,
            Some(item_id),
            new_status.to_string(),
            changed_by,
            remarks,
        )
        .await?;

        let delivered_notice = if new_status == PrItemStatus::Delivered {
            Some(
                insert_notification(
                    &txn,
                    NewNotification::new(
                        request.requester_id,
                        NotificationType::Success,
                        NotificationCategory::PrDelivery,
                        "Item delivered",
                        format!("'{}' from {} has been delivered", updated.name, request.pr_number),
                    )
                    .related_to(request.id, pr_url(request.id)),
                )
                .await?,
            )
        } else {
            None
        };

        txn.commit().await?;

        self.feed
            .publish_row(pr_item::Entity.table_name(), ChangeKind::Update, &updated);
        self.feed.publish_row(
            pr_status_history::Entity.table_name(),
            ChangeKind::Insert,
            &history,
        );
        if let Some(created) = delivered_notice {
            self.notifications.announce(&created).await;
        }
        info!(%item_id, from = %item.status, to = %new_status, "PR item status changed");
        self.event_sender
            .send_or_log(Event::PrItemStatusChanged {
                pr_id: request.id,
                pr_item_id: item_id,
                new_status: new_status.to_string(),
            })
            .await;

        Ok(updated)
    }

    #[instrument(skip(self, comment))]
    pub async fn add_comment(
        &self,
        pr_id: Uuid,
        user_id: Uuid,
        comment: String,
    ) -> Result<pr_comment::Model, ServiceError> {
        let comment = comment.trim().to_string();
        if comment.is_empty() {
            return Err(ServiceError::ValidationError(
                "comment must not be empty".to_string(),
            ));
        }
        find_request(&*self.db, pr_id).await?;

        let created = pr_comment::ActiveModel {
            id: Set(Uuid::new_v4()),
            pr_id: Set(pr_id),
            user_id: Set(user_id),
            comment: Set(comment),
            created_at: Set(now_micros()),
        }
        .insert(&*self.db)
        .await?;

        self.feed
            .publish_row(pr_comment::Entity.table_name(), ChangeKind::Insert, &created);
        Ok(created)
    }

    /// Stores attachment metadata; the file itself lives elsewhere.
    #[instrument(skip(self, input))]
    pub async fn add_attachment(
        &self,
        pr_id: Uuid,
        uploaded_by: Uuid,
        input: NewAttachment,
    ) -> Result<pr_attachment::Model, ServiceError> {
        input.validate()?;
        find_request(&*self.db, pr_id).await?;

        let created = pr_attachment::ActiveModel {
            id: Set(Uuid::new_v4()),
            pr_id: Set(pr_id),
            file_name: Set(input.file_name),
            file_url: Set(input.file_url),
            uploaded_by: Set(uploaded_by),
            uploaded_at: Set(now_micros()),
        }
        .insert(&*self.db)
        .await?;

        self.feed.publish_row(
            pr_attachment::Entity.table_name(),
            ChangeKind::Insert,
            &created,
        );
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn details(&self, pr_id: Uuid) -> Result<PurchaseRequestDetails, ServiceError> {
        let db = &*self.db;
        let request = find_request(db, pr_id).await?;

        let items = pr_item::Entity::find()
            .filter(pr_item::Column::PrId.eq(pr_id))
            .order_by_asc(pr_item::Column::CreatedAt)
            .all(db)
            .await?;
        let item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();

        let assignment_actions = if item_ids.is_empty() {
            Vec::new()
        } else {
            assignment_action::Entity::find()
                .filter(assignment_action::Column::PrItemId.is_in(item_ids.iter().copied()))
                .order_by_desc(assignment_action::Column::AssignedAt)
                .all(db)
                .await?
        };

        let items = items
            .into_iter()
            .map(|item| {
                let actions: Vec<_> = assignment_actions
                    .iter()
                    .filter(|a| a.pr_item_id == item.id)
                    .cloned()
                    .collect();
                let current_assignment = actions
                    .iter()
                    .find(|a| a.status != assignment_action::AssignmentActionStatus::Failed)
                    .cloned();
                PrItemWithActions {
                    item,
                    assignment_actions: actions,
                    current_assignment,
                }
            })
            .collect();

        let status_history = pr_status_history::Entity::find()
            .filter(pr_status_history::Column::PrId.eq(pr_id))
            .order_by_desc(pr_status_history::Column::ChangedAt)
            .all(db)
            .await?;
        let approvals = pr_approval::Entity::find()
            .filter(pr_approval::Column::PrId.eq(pr_id))
            .order_by_desc(pr_approval::Column::ApprovedAt)
            .all(db)
            .await?;
        let comments = pr_comment::Entity::find()
            .filter(pr_comment::Column::PrId.eq(pr_id))
            .order_by_asc(pr_comment::Column::CreatedAt)
            .all(db)
            .await?;
        let attachments = pr_attachment::Entity::find()
            .filter(pr_attachment::Column::PrId.eq(pr_id))
            .order_by_desc(pr_attachment::Column::UploadedAt)
            .all(db)
            .await?;

        let mut related = item_ids;
        related.push(pr_id);
        let notifications = self.notifications.list_related(&related).await?;

        Ok(PurchaseRequestDetails {
            request,
            items,
            status_history,
            approvals,
            comments,
            attachments,
            notifications,
            assignment_actions,
        })
    }

    /// Deletes a request together with everything it owns.
    #[instrument(skip(self))]
    pub async fn delete(&self, pr_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        find_request(&txn, pr_id).await?;

        let items = pr_item::Entity::find()
            .filter(pr_item::Column::PrId.eq(pr_id))
            .all(&txn)
            .await?;
        let item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();

        if !item_ids.is_empty() {
            assignment_action::Entity::delete_many()
                .filter(assignment_action::Column::PrItemId.is_in(item_ids.iter().copied()))
                .exec(&txn)
                .await?;
        }
        pr_item::Entity::delete_many()
            .filter(pr_item::Column::PrId.eq(pr_id))
            .exec(&txn)
            .await?;
        pr_status_history::Entity::delete_many()
            .filter(pr_status_history::Column::PrId.eq(pr_id))
            .exec(&txn)
            .await?;
        pr_approval::Entity::delete_many()
            .filter(pr_approval::Column::PrId.eq(pr_id))
            .exec(&txn)
            .await?;
        pr_comment::Entity::delete_many()
            .filter(pr_comment::Column::PrId.eq(pr_id))
            .exec(&txn)
            .await?;
        pr_attachment::Entity::delete_many()
            .filter(pr_attachment::Column::PrId.eq(pr_id))
            .exec(&txn)
            .await?;
        purchase_request::Entity::delete_by_id(pr_id)
            .exec(&txn)
            .await?;

        txn.commit().await?;

        for item_id in item_ids {
            self.feed.publish(
                pr_item::Entity.table_name(),
                ChangeKind::Delete,
                json!({ "id": item_id, "pr_id": pr_id }),
            );
        }
        self.feed.publish(
            purchase_request::Entity.table_name(),
            ChangeKind::Delete,
            json!({ "id": pr_id }),
        );

        info!(%pr_id, "Purchase request deleted");
        self.event_sender
            .send_or_log(Event::PurchaseRequestDeleted(pr_id))
            .await;
        Ok(())
    }

    /// Reminds requesters of open requests that lack information. Returns the
    /// notifications sent.
    #[instrument(skip(self))]
    pub async fn notify_incomplete(
        &self,
        triggered_by: Uuid,
    ) -> Result<Vec<notification::Model>, ServiceError> {
        let open = purchase_request::Entity::find()
            .filter(purchase_request::Column::Status.is_not_in([
                PrStatus::Completed,
                PrStatus::Rejected,
                PrStatus::Cancelled,
            ]))
            .order_by_desc(purchase_request::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut sent = Vec::new();
        for pr in open.into_iter().filter(|pr| pr.has_incomplete_info()) {
            let created = self
                .notifications
                .create(
                    NewNotification::new(
                        pr.requester_id,
                        NotificationType::Warning,
                        NotificationCategory::PrIncomplete,
                        "Purchase request needs more information",
                        format!(
                            "{} '{}' is missing a description, requester name or priced items",
                            pr.pr_number, pr.title
                        ),
                    )
                    .related_to(pr.id, pr_url(pr.id)),
                )
                .await?;
            sent.push(created);
        }

        info!(%triggered_by, count = sent.len(), "Sent incomplete-information reminders");
        Ok(sent)
    }

    async fn transition_in_txn(
        &self,
        txn: &DatabaseTransaction,
        request: purchase_request::Model,
        new_status: PrStatus,
        changed_by: Uuid,
        remarks: Option<String>,
    ) -> Result<Transition, ServiceError> {
        let old_status = request.status;
        if self.policy == StatusTransitionPolicy::Strict && !old_status.can_transition_to(new_status)
        {
            return Err(ServiceError::InvalidTransition(format!(
                "{} cannot move from {} to {}",
                request.pr_number, old_status, new_status
            )));
        }

        let mut active: purchase_request::ActiveModel = request.into();
        active.status = Set(new_status);
        active.updated_at = Set(now_micros());
        let request = active.update(txn).await?;

        let history = insert_history(
            txn,
            request.id,
            None,
            new_status.to_string(),
            changed_by,
            remarks,
        )
        .await?;

        let notice = match new_status {
            PrStatus::Rejected => Some((
                NotificationType::Error,
                "Purchase request rejected",
                format!("{} '{}' was rejected", request.pr_number, request.title),
            )),
            PrStatus::Delivered => Some((
                NotificationType::Success,
                "Purchase request delivered",
                format!("{} '{}' has been delivered", request.pr_number, request.title),
            )),
            PrStatus::Completed => Some((
                NotificationType::Success,
                "Purchase request completed",
                format!("{} '{}' is complete", request.pr_number, request.title),
            )),
            PrStatus::Cancelled => Some((
                NotificationType::Warning,
                "Purchase request cancelled",
                format!("{} '{}' was cancelled", request.pr_number, request.title),
            )),
            _ => None,
        };

        let notification = match notice {
            Some((kind, title, message)) => Some(
                insert_notification(
                    txn,
                    NewNotification::new(
                        request.requester_id,
                        kind,
                        NotificationCategory::PrStatus,
                        title,
                        message,
                    )
                    .related_to(request.id, pr_url(request.id)),
                )
                .await?,
            ),
            None => None,
        };

        Ok(Transition {
            request,
            old_status,
            history,
            notification,
        })
    }

    async fn announce_transition(
        &self,
        transition: Transition,
        changed_by: Uuid,
    ) -> purchase_request::Model {
        let Transition {
            request,
            old_status,
            history,
            notification,
        } = transition;

        self.publish_request(&request);
        self.feed.publish_row(
            pr_status_history::Entity.table_name(),
            ChangeKind::Insert,
            &history,
        );
        if let Some(created) = notification {
            self.notifications.announce(&created).await;
        }

        counter!(
            "assetdesk_pr_status_transitions_total",
            1,
            "to" => request.status.to_string()
        );
        info!(pr_id = %request.id, from = %old_status, to = %request.status, "Purchase request status changed");
        self.event_sender
            .send_or_log(Event::PrStatusChanged {
                pr_id: request.id,
                old_status: old_status.to_string(),
                new_status: request.status.to_string(),
                changed_by,
            })
            .await;

        request
    }

    fn publish_request(&self, request: &purchase_request::Model) {
        self.feed.publish_row(
            purchase_request::Entity.table_name(),
            ChangeKind::Update,
            request,
        );
    }
}

pub(crate) fn ensure_items_editable(request: &purchase_request::Model) -> Result<(), ServiceError> {
    if request.status.is_terminal() {
        warn!(pr_id = %request.id, status = %request.status, "Rejected item change on closed request");
        return Err(ServiceError::InvalidTransition(format!(
            "items of {} cannot change once it is {}",
            request.pr_number, request.status
        )));
    }
    Ok(())
}

async fn find_request<C: ConnectionTrait>(
    conn: &C,
    pr_id: Uuid,
) -> Result<purchase_request::Model, ServiceError> {
    purchase_request::Entity::find_by_id(pr_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Purchase request {} not found", pr_id)))
}

async fn find_item<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
) -> Result<pr_item::Model, ServiceError> {
    pr_item::Entity::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("PR item {} not found", item_id)))
}

async fn insert_item<C: ConnectionTrait>(
    conn: &C,
    pr_id: Uuid,
    input: NewPrItem,
    now: DateTime<Utc>,
) -> Result<pr_item::Model, ServiceError> {
    let total_price = checked_line_total(input.quantity, input.unit_price)?;
    Ok(pr_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        pr_id: Set(pr_id),
        name: Set(input.name),
        description: Set(input.description),
        category: Set(input.category),
        quantity: Set(input.quantity),
        unit_price: Set(input.unit_price),
        total_price: Set(total_price),
        status: Set(PrItemStatus::Pending),
        delivery_status: Set(DeliveryStatus::Pending),
        delivered_at: Set(None),
        assigned_at: Set(None),
        notes: Set(input.notes),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?)
}

pub(crate) async fn insert_history<C: ConnectionTrait>(
    conn: &C,
    pr_id: Uuid,
    pr_item_id: Option<Uuid>,
    status: String,
    changed_by: Uuid,
    remarks: Option<String>,
) -> Result<pr_status_history::Model, ServiceError> {
    Ok(pr_status_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        pr_id: Set(pr_id),
        pr_item_id: Set(pr_item_id),
        status: Set(status),
        changed_by: Set(changed_by),
        changed_at: Set(now_micros()),
        remarks: Set(remarks),
    }
    .insert(conn)
    .await?)
}

/// Re-sums the item totals onto the request.
async fn recompute_total<C: ConnectionTrait>(
    conn: &C,
    request: purchase_request::Model,
) -> Result<purchase_request::Model, ServiceError> {
    let items = pr_item::Entity::find()
        .filter(pr_item::Column::PrId.eq(request.id))
        .all(conn)
        .await?;
    let total = checked_sum(items.iter().map(|i| i.total_price))?;

    let mut active: purchase_request::ActiveModel = request.into();
    active.total_amount = Set(total);
    active.updated_at = Set(now_micros());
    Ok(active.update(conn).await?)
}
