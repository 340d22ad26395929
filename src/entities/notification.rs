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
pub enum NotificationType {
    #[sea_orm(string_value = "info")]
    Info,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "warning")]
    Warning,
    #[sea_orm(string_value = "error")]
    Error,
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
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationCategory {
    #[sea_orm(string_value = "pr_status")]
    PrStatus,
    #[sea_orm(string_value = "pr_approval")]
    PrApproval,
    #[sea_orm(string_value = "pr_assignment")]
    PrAssignment,
    #[sea_orm(string_value = "pr_delivery")]
    PrDelivery,
    #[sea_orm(string_value = "pr_incomplete")]
    PrIncomplete,
}

/// The `notifications` table: a pull-based per-user inbox.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "notifications")]
#[schema(as = Notification)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub category: NotificationCategory,
    pub related_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub action_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
