use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use serde_json::Value;
use std::{marker::PhantomData, str::FromStr, sync::Arc};

use super::live::SnapshotLoader;
use crate::entities::{
    assignment_action, department, device, incident, inventory_item, notification, permission,
    pr_approval, pr_attachment, pr_comment, pr_item, pr_status_history, project, purchase_request,
    request, user,
};
use crate::entities::permission::Resource;
use crate::errors::ServiceError;

/// Loads every row of `E` as JSON.
pub struct EntityLoader<E> {
    db: Arc<DatabaseConnection>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> EntityLoader<E> {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E> SnapshotLoader<Value> for EntityLoader<E>
where
    E: EntityTrait,
    E::Model: Serialize + Send + Sync,
{
    async fn load(&self) -> Result<Vec<Value>, ServiceError> {
        let rows = E::find().all(&*self.db).await?;
        rows.iter()
            .map(|row| serde_json::to_value(row).map_err(ServiceError::from))
            .collect()
    }
}

/// Tables exposed to live subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SyncTable {
    PurchaseRequests,
    PrItems,
    AssignmentActions,
    PrStatusHistory,
    PrApprovals,
    PrComments,
    PrAttachments,
    Notifications,
    Permissions,
    Users,
    Departments,
    InventoryItems,
    Devices,
    Incidents,
    Projects,
    Requests,
}

impl SyncTable {
    pub fn parse(name: &str) -> Result<Self, ServiceError> {
        Self::from_str(name)
            .map_err(|_| ServiceError::NotFound(format!("Unknown realtime table: {}", name)))
    }

    /// Permission family whose `read` grant covers a subscription.
    pub fn resource(self) -> Resource {
        match self {
            Self::PurchaseRequests
            | Self::PrItems
            | Self::AssignmentActions
            | Self::PrStatusHistory
            | Self::PrApprovals
            | Self::PrComments
            | Self::PrAttachments
            | Self::Requests => Resource::Pr,
            Self::Notifications | Self::Users => Resource::Users,
            Self::Permissions => Resource::Settings,
            Self::Departments | Self::Projects => Resource::Departments,
            Self::InventoryItems | Self::Devices => Resource::Inventory,
            Self::Incidents => Resource::Incidents,
        }
    }

    /// Snapshot loader for this table's rows as JSON.
    pub fn loader(self, db: Arc<DatabaseConnection>) -> Box<dyn SnapshotLoader<Value>> {
        match self {
            Self::PurchaseRequests => Box::new(EntityLoader::<purchase_request::Entity>::new(db)),
            Self::PrItems => Box::new(EntityLoader::<pr_item::Entity>::new(db)),
            Self::AssignmentActions => Box::new(EntityLoader::<assignment_action::Entity>::new(db)),
            Self::PrStatusHistory => Box::new(EntityLoader::<pr_status_history::Entity>::new(db)),
            Self::PrApprovals => Box::new(EntityLoader::<pr_approval::Entity>::new(db)),
            Self::PrComments => Box::new(EntityLoader::<pr_comment::Entity>::new(db)),
            Self::PrAttachments => Box::new(EntityLoader::<pr_attachment::Entity>::new(db)),
            Self::Notifications => Box::new(EntityLoader::<notification::Entity>::new(db)),
            Self::Permissions => Box::new(EntityLoader::<permission::Entity>::new(db)),
            Self::Users => Box::new(EntityLoader::<user::Entity>::new(db)),
            Self::Departments => Box::new(EntityLoader::<department::Entity>::new(db)),
            Self::InventoryItems => Box::new(EntityLoader::<inventory_item::Entity>::new(db)),
            Self::Devices => Box::new(EntityLoader::<device::Entity>::new(db)),
            Self::Incidents => Box::new(EntityLoader::<incident::Entity>::new(db)),
            Self::Projects => Box::new(EntityLoader::<project::Entity>::new(db)),
            Self::Requests => Box::new(EntityLoader::<request::Entity>::new(db)),
        }
    }
}

#[async_trait]
impl SnapshotLoader<Value> for Box<dyn SnapshotLoader<Value>> {
    async fn load(&self) -> Result<Vec<Value>, ServiceError> {
        (**self).load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::EntityName;

    #[test]
    fn names_match_entity_tables() {
        assert_eq!(
            SyncTable::PurchaseRequests.as_ref(),
            purchase_request::Entity.table_name()
        );
        assert_eq!(
            SyncTable::InventoryItems.as_ref(),
            inventory_item::Entity.table_name()
        );
        assert_eq!(
            SyncTable::PrStatusHistory.as_ref(),
            pr_status_history::Entity.table_name()
        );
        assert!(SyncTable::parse("sessions").is_err());
    }
}
