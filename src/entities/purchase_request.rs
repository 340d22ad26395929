use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of a purchase request.
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
pub enum PrStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "pending_approval")]
    PendingApproval,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl PrStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected | Self::Cancelled)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: PrStatus) -> bool {
        use PrStatus::*;
        match (self, next) {
            (Draft, PendingApproval) => true,
            (PendingApproval, Approved) | (PendingApproval, Rejected) => true,
            (Approved, InProgress) => true,
            (InProgress, Delivered) => true,
            (Delivered, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Approval outcomes; reaching them needs the approve grant.
    pub fn is_decision(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Statuses under which items may be marked delivered.
    pub fn accepts_deliveries(self) -> bool {
        matches!(self, Self::InProgress | Self::Delivered | Self::Completed)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
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
pub enum PrPriority {
    #[sea_orm(string_value = "low")]
    Low,
    #[default]
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "critical")]
    Critical,
}

/// The `purchase_requests` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "purchase_requests")]
#[schema(as = PurchaseRequest)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human readable number, `PR-YYYYMMDD-XXXXXX`.
    #[sea_orm(unique)]
    pub pr_number: String,
    pub title: String,
    pub description: Option<String>,
    pub requester_id: Uuid,
    pub requester_name: String,
    pub department_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub status: PrStatus,
    pub priority: PrPriority,
    /// Sum of the item totals.
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Model {
    /// Missing description or requester name, or nothing priced yet.
    pub fn has_incomplete_info(&self) -> bool {
        self.description
            .as_deref()
            .map_or(true, |d| d.trim().is_empty())
            || self.requester_name.trim().is_empty()
            || self.total_amount.is_zero()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::pr_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::pr_status_history::Entity")]
    StatusHistory,
    #[sea_orm(has_many = "super::pr_approval::Entity")]
    Approvals,
    #[sea_orm(has_many = "super::pr_comment::Entity")]
    Comments,
    #[sea_orm(has_many = "super::pr_attachment::Entity")]
    Attachments,
}

impl Related<super::pr_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::pr_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

impl Related<super::pr_approval::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Approvals.def()
    }
}

impl Related<super::pr_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::pr_attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case(PrStatus::Draft, PrStatus::PendingApproval, true)]
    #[case(PrStatus::PendingApproval, PrStatus::Approved, true)]
    #[case(PrStatus::PendingApproval, PrStatus::Rejected, true)]
    #[case(PrStatus::Approved, PrStatus::InProgress, true)]
    #[case(PrStatus::InProgress, PrStatus::Delivered, true)]
    #[case(PrStatus::Delivered, PrStatus::Completed, true)]
    #[case(PrStatus::InProgress, PrStatus::Cancelled, true)]
    #[case(PrStatus::Draft, PrStatus::Approved, false)]
    #[case(PrStatus::Approved, PrStatus::Delivered, false)]
    #[case(PrStatus::Completed, PrStatus::Cancelled, false)]
    #[case(PrStatus::Rejected, PrStatus::PendingApproval, false)]
    #[case(PrStatus::Draft, PrStatus::Draft, false)]
    fn lifecycle_table(#[case] from: PrStatus, #[case] to: PrStatus, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn status_string_forms_match_storage() {
        assert_eq!(PrStatus::PendingApproval.to_string(), "pending_approval");
        assert_eq!(
            PrStatus::from_str("in_progress").unwrap(),
            PrStatus::InProgress
        );
        assert!(PrStatus::from_str("shipped").is_err());
        assert_eq!(
            serde_json::to_value(PrStatus::Delivered).unwrap(),
            serde_json::json!("delivered")
        );
    }
}
