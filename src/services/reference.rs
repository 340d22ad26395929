use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityName, EntityTrait, IntoActiveModel,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    common::now_micros,
    entities::{
        department, device, incident, inventory_item, permission::Resource, project, request, user,
    },
    errors::ServiceError,
    realtime::{feed::json_field_equals, ChangeFeed, ChangeKind},
};

/// Plain CRUD collections served under their own path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReferenceKind {
    Users,
    Departments,
    Devices,
    Inventory,
    Incidents,
    Projects,
    Requests,
}

impl ReferenceKind {
    /// Permission family guarding the collection.
    pub fn resource(self) -> Resource {
        match self {
            Self::Users => Resource::Users,
            Self::Departments | Self::Projects => Resource::Departments,
            Self::Devices | Self::Inventory => Resource::Inventory,
            Self::Incidents => Resource::Incidents,
            Self::Requests => Resource::Pr,
        }
    }
}

/// Uniform list/create over the reference tables, exchanged as JSON rows.
#[derive(Clone)]
pub struct ReferenceService {
    db: Arc<DatabaseConnection>,
    feed: Arc<ChangeFeed>,
}

impl ReferenceService {
    pub fn new(db: Arc<DatabaseConnection>, feed: Arc<ChangeFeed>) -> Self {
        Self { db, feed }
    }

    /// Rows whose fields equal every `(column, value)` pair.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        kind: ReferenceKind,
        filters: &[(String, String)],
    ) -> Result<Vec<Value>, ServiceError> {
        match kind {
            ReferenceKind::Users => self.list_rows::<user::Entity>(filters).await,
            ReferenceKind::Departments => self.list_rows::<department::Entity>(filters).await,
            ReferenceKind::Devices => self.list_rows::<device::Entity>(filters).await,
            ReferenceKind::Inventory => self.list_rows::<inventory_item::Entity>(filters).await,
            ReferenceKind::Incidents => self.list_rows::<incident::Entity>(filters).await,
            ReferenceKind::Projects => self.list_rows::<project::Entity>(filters).await,
            ReferenceKind::Requests => self.list_rows::<request::Entity>(filters).await,
        }
    }

    /// Inserts one row. `id` and `created_at` are assigned here.
    #[instrument(skip(self, body))]
    pub async fn create(&self, kind: ReferenceKind, body: Value) -> Result<Value, ServiceError> {
        match kind {
            ReferenceKind::Users => self.create_row::<user::Entity>(body).await,
            ReferenceKind::Departments => self.create_row::<department::Entity>(body).await,
            ReferenceKind::Devices => self.create_row::<device::Entity>(body).await,
            ReferenceKind::Inventory => self.create_row::<inventory_item::Entity>(body).await,
            ReferenceKind::Incidents => self.create_row::<incident::Entity>(body).await,
            ReferenceKind::Projects => self.create_row::<project::Entity>(body).await,
            ReferenceKind::Requests => self.create_row::<request::Entity>(body).await,
        }
    }

    async fn list_rows<E>(&self, filters: &[(String, String)]) -> Result<Vec<Value>, ServiceError>
    where
        E: EntityTrait,
        E::Model: Serialize,
    {
        let rows = E::find().all(&*self.db).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let value = serde_json::to_value(&row)?;
            let keep = filters.iter().all(|(column, expected)| {
                value
                    .get(column)
                    .map_or(false, |field| json_field_equals(field, expected))
            });
            if keep {
                out.push(value);
            }
        }
        Ok(out)
    }

    async fn create_row<E>(&self, body: Value) -> Result<Value, ServiceError>
    where
        E: EntityTrait,
        E::Model: Serialize + DeserializeOwned + IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: Send,
    {
        let Value::Object(mut fields) = body else {
            return Err(ServiceError::ValidationError(
                "request body must be a JSON object".to_string(),
            ));
        };
        stamp(&mut fields);

        let model: E::Model = serde_json::from_value(Value::Object(fields))
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let inserted = model
            .into_active_model()
            .reset_all()
            .insert(&*self.db)
            .await?;

        let table = E::default().table_name().to_string();
        self.feed.publish_row(&table, ChangeKind::Insert, &inserted);
        info!(table = %table, "Reference row created");

        Ok(serde_json::to_value(&inserted)?)
    }
}

fn stamp(fields: &mut Map<String, Value>) {
    fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    fields.insert(
        "created_at".to_string(),
        serde_json::to_value(now_micros()).unwrap_or(Value::Null),
    );
}
