use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Protected resource families.
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
pub enum Resource {
    #[sea_orm(string_value = "pr")]
    Pr,
    #[sea_orm(string_value = "inventory")]
    Inventory,
    #[sea_orm(string_value = "departments")]
    Departments,
    #[sea_orm(string_value = "users")]
    Users,
    #[sea_orm(string_value = "incidents")]
    Incidents,
    #[sea_orm(string_value = "reports")]
    Reports,
    #[sea_orm(string_value = "settings")]
    Settings,
}

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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PermissionAction {
    #[sea_orm(string_value = "create")]
    Create,
    #[sea_orm(string_value = "read")]
    Read,
    #[sea_orm(string_value = "update")]
    Update,
    #[sea_orm(string_value = "delete")]
    Delete,
    #[sea_orm(string_value = "approve")]
    Approve,
    #[sea_orm(string_value = "assign")]
    Assign,
    #[sea_orm(string_value = "export")]
    Export,
}

/// The `permissions` table, unique on `(role, resource, action)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "permissions")]
#[schema(as = Permission)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub role: String,
    pub resource: Resource,
    pub action: PermissionAction,
    pub granted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
