use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssignmentActionType {
    #[sea_orm(string_value = "assign_to_inventory")]
    AssignToInventory,
    #[sea_orm(string_value = "assign_to_user")]
    AssignToUser,
    #[sea_orm(string_value = "assign_to_department")]
    AssignToDepartment,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssignmentActionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Where a PR item is routed. Stored flat as `(action_type, target_id)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AssignmentTarget {
    Inventory(Uuid),
    User(Uuid),
    Department(Uuid),
}

impl AssignmentTarget {
    pub fn from_parts(action_type: AssignmentActionType, target_id: Uuid) -> Self {
        match action_type {
            AssignmentActionType::AssignToInventory => Self::Inventory(target_id),
            AssignmentActionType::AssignToUser => Self::User(target_id),
            AssignmentActionType::AssignToDepartment => Self::Department(target_id),
        }
    }

    pub fn action_type(&self) -> AssignmentActionType {
        match self {
            Self::Inventory(_) => AssignmentActionType::AssignToInventory,
            Self::User(_) => AssignmentActionType::AssignToUser,
            Self::Department(_) => AssignmentActionType::AssignToDepartment,
        }
    }

    pub fn target_id(&self) -> Uuid {
        match self {
            Self::Inventory(id) | Self::User(id) | Self::Department(id) => *id,
        }
    }
}

/// The `assignment_actions` table. Append-only; only `status` is ever updated.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "assignment_actions")]
#[schema(as = AssignmentAction)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub pr_item_id: Uuid,
    pub action_type: AssignmentActionType,
    pub target_id: Uuid,
    pub assigned_by: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub status: AssignmentActionStatus,
}

impl Model {
    pub fn target(&self) -> AssignmentTarget {
        AssignmentTarget::from_parts(self.action_type, self.target_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pr_item::Entity",
        from = "Column::PrItemId",
        to = "super::pr_item::Column::Id",
        on_delete = "Cascade"
    )]
    PrItem,
}

impl Related<super::pr_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PrItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
