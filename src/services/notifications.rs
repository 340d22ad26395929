use std::sync::Arc;

use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityName, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::now_micros,
    entities::notification::{self, NotificationCategory, NotificationType},
    errors::ServiceError,
    events::{Event, EventSender},
    realtime::{ChangeFeed, ChangeKind},
};

/// Input for a new inbox entry.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewNotification {
    pub user_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "message must not be empty"))]
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub category: NotificationCategory,
    pub related_id: Option<Uuid>,
    pub action_url: Option<String>,
}

impl NewNotification {
    pub fn new(
        user_id: Uuid,
        notification_type: NotificationType,
        category: NotificationCategory,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            title: title.into(),
            message: message.into(),
            notification_type,
            category,
            related_id: None,
            action_url: None,
        }
    }

    pub fn related_to(mut self, related_id: Uuid, action_url: impl Into<String>) -> Self {
        self.related_id = Some(related_id);
        self.action_url = Some(action_url.into());
        self
    }
}

/// Writes a notification on `conn`, which may be an open transaction.
/// The caller publishes the row once its transaction commits.
pub(crate) async fn insert_notification<C: ConnectionTrait>(
    conn: &C,
    input: NewNotification,
) -> Result<notification::Model, ServiceError> {
    input.validate()?;

    let model = notification::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(input.user_id),
        title: Set(input.title),
        message: Set(input.message),
        notification_type: Set(input.notification_type),
        category: Set(input.category),
        related_id: Set(input.related_id),
        read: Set(false),
        created_at: Set(now_micros()),
        action_url: Set(input.action_url),
    };

    Ok(model.insert(conn).await?)
}

/// Pull-based user inbox.
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DatabaseConnection>,
    feed: Arc<ChangeFeed>,
    event_sender: Arc<EventSender>,
}

impl NotificationService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        feed: Arc<ChangeFeed>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            feed,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(user_id = %input.user_id, category = %input.category))]
    pub async fn create(&self, input: NewNotification) -> Result<notification::Model, ServiceError> {
        let created = insert_notification(&*self.db, input).await?;
        self.announce(&created).await;
        Ok(created)
    }

    /// Publishes rows written by other services inside their transactions.
    pub(crate) async fn announce(&self, created: &notification::Model) {
        self.feed.publish_row(
            notification::Entity.table_name(),
            ChangeKind::Insert,
            created,
        );
        self.event_sender
            .send_or_log(Event::NotificationCreated {
                notification_id: created.id,
                user_id: created.user_id,
                category: created.category.to_string(),
            })
            .await;
    }

    /// Newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<notification::Model>, ServiceError> {
        let mut query = notification::Entity::find().filter(notification::Column::UserId.eq(user_id));
        if unread_only {
            query = query.filter(notification::Column::Read.eq(false));
        }
        Ok(query
            .order_by_desc(notification::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Notifications pointing at any of `related_ids`, newest first.
    pub async fn list_related(
        &self,
        related_ids: &[Uuid],
    ) -> Result<Vec<notification::Model>, ServiceError> {
        if related_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(notification::Entity::find()
            .filter(notification::Column::RelatedId.is_in(related_ids.iter().copied()))
            .order_by_desc(notification::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<notification::Model, ServiceError> {
        notification::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Notification {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn mark_read(&self, id: Uuid) -> Result<notification::Model, ServiceError> {
        let existing = self.get(id).await?;

        if existing.read {
            return Ok(existing);
        }

        let mut active: notification::ActiveModel = existing.into();
        active.read = Set(true);
        let updated = active.update(&*self.db).await?;

        self.feed.publish_row(
            notification::Entity.table_name(),
            ChangeKind::Update,
            &updated,
        );
        Ok(updated)
    }

    /// Marks every unread notification of `user_id` as read in one update.
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let txn = self.db.begin().await?;

        let unread = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::Read.eq(false))
            .all(&txn)
            .await?;

        let result = notification::Entity::update_many()
            .col_expr(notification::Column::Read, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::Read.eq(false))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        for mut row in unread {
            row.read = true;
            self.feed
                .publish_row(notification::Entity.table_name(), ChangeKind::Update, &row);
        }

        info!(%user_id, count = result.rows_affected, "Marked notifications as read");
        self.event_sender
            .send_or_log(Event::NotificationsRead {
                user_id,
                count: result.rows_affected,
            })
            .await;

        Ok(result.rows_affected)
    }
}
