use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The `pr_status_history` table. Append-only; one row per transition.
///
/// `status` holds a PR status for request transitions and an item status when
/// `pr_item_id` is set.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "pr_status_history")]
#[schema(as = PrStatusHistory)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub pr_id: Uuid,
    pub pr_item_id: Option<Uuid>,
    pub status: String,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
    pub remarks: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_request::Entity",
        from = "Column::PrId",
        to = "super::purchase_request::Column::Id",
        on_delete = "Cascade"
    )]
    PurchaseRequest,
}

impl Related<super::purchase_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
