use std::{str::FromStr, sync::Arc};

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityName, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::rbac::default_grants,
    entities::permission::{self, PermissionAction, Resource},
    errors::ServiceError,
    events::{Event, EventSender},
    realtime::{ChangeFeed, ChangeKind},
};

/// Upsert of one `(role, resource, action)` grant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetPermission {
    pub role: String,
    pub resource: Resource,
    pub action: PermissionAction,
    pub granted: bool,
}

/// Table-backed, fail-closed permission lookups.
#[derive(Clone)]
pub struct PermissionService {
    db: Arc<DatabaseConnection>,
    feed: Arc<ChangeFeed>,
    event_sender: Arc<EventSender>,
}

impl PermissionService {
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

    /// `true` only when a granted row exists. A missing row denies.
    #[instrument(skip(self))]
    pub async fn check(
        &self,
        role: &str,
        resource: Resource,
        action: PermissionAction,
    ) -> Result<bool, ServiceError> {
        let row = permission::Entity::find()
            .filter(permission::Column::Role.eq(role))
            .filter(permission::Column::Resource.eq(resource))
            .filter(permission::Column::Action.eq(action))
            .one(&*self.db)
            .await?;

        let granted = row.map_or(false, |p| p.granted);
        debug!(role, %resource, %action, granted, "Permission evaluated");
        Ok(granted)
    }

    /// Like [`check`](Self::check) but takes raw strings; unknown resources or
    /// actions are denied rather than rejected.
    pub async fn check_str(
        &self,
        role: &str,
        resource: &str,
        action: &str,
    ) -> Result<bool, ServiceError> {
        match (Resource::from_str(resource), PermissionAction::from_str(action)) {
            (Ok(resource), Ok(action)) => self.check(role, resource, action).await,
            _ => Ok(false),
        }
    }

    /// Fails with `Forbidden` unless the role holds the grant.
    pub async fn require(
        &self,
        role: &str,
        resource: Resource,
        action: PermissionAction,
    ) -> Result<(), ServiceError> {
        if self.check(role, resource, action).await? {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "role '{}' lacks {}:{}",
                role, resource, action
            )))
        }
    }

    /// Every row stored for `role`, granted or not.
    #[instrument(skip(self))]
    pub async fn for_role(&self, role: &str) -> Result<Vec<permission::Model>, ServiceError> {
        Ok(permission::Entity::find()
            .filter(permission::Column::Role.eq(role))
            .order_by_asc(permission::Column::Resource)
            .order_by_asc(permission::Column::Action)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, input), fields(role = %input.role, resource = %input.resource, action = %input.action))]
    pub async fn set(&self, input: SetPermission) -> Result<permission::Model, ServiceError> {
        let role = input.role.trim().to_string();
        if role.is_empty() {
            return Err(ServiceError::ValidationError(
                "role must not be empty".to_string(),
            ));
        }

        let existing = permission::Entity::find()
            .filter(permission::Column::Role.eq(role.as_str()))
            .filter(permission::Column::Resource.eq(input.resource))
            .filter(permission::Column::Action.eq(input.action))
            .one(&*self.db)
            .await?;

        let (saved, kind) = match existing {
            Some(row) => {
                let mut active: permission::ActiveModel = row.into();
                active.granted = Set(input.granted);
                (active.update(&*self.db).await?, ChangeKind::Update)
            }
            None => {
                let active = permission::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    role: Set(role.clone()),
                    resource: Set(input.resource),
                    action: Set(input.action),
                    granted: Set(input.granted),
                };
                (active.insert(&*self.db).await?, ChangeKind::Insert)
            }
        };

        self.feed
            .publish_row(permission::Entity.table_name(), kind, &saved);
        self.event_sender
            .send_or_log(Event::PermissionChanged {
                role,
                resource: saved.resource.to_string(),
                action: saved.action.to_string(),
                granted: saved.granted,
            })
            .await;

        Ok(saved)
    }

    /// Inserts the default role matrix if the table is empty. Returns the
    /// number of rows written.
    #[instrument(skip(self))]
    pub async fn seed_defaults(&self) -> Result<u64, ServiceError> {
        if permission::Entity::find().count(&*self.db).await? > 0 {
            debug!("Permissions already present; skipping seed");
            return Ok(0);
        }

        let grants = default_grants();
        let txn = self.db.begin().await?;
        for (role, resource, action) in &grants {
            permission::ActiveModel {
                id: Set(Uuid::new_v4()),
                role: Set((*role).to_string()),
                resource: Set(*resource),
                action: Set(*action),
                granted: Set(true),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        info!(count = grants.len(), "Seeded default permissions");
        Ok(grants.len() as u64)
    }
}
