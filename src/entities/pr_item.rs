use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrItemStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "ordered")]
    Ordered,
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
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
pub enum ItemCategory {
    #[sea_orm(string_value = "device")]
    Device,
    #[sea_orm(string_value = "software")]
    Software,
    #[sea_orm(string_value = "consumable")]
    Consumable,
    #[sea_orm(string_value = "service")]
    Service,
    #[sea_orm(string_value = "other")]
    Other,
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
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

/// The `pr_items` table. Rows are owned by their purchase request.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "pr_items")]
#[schema(as = PrItem)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub pr_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: ItemCategory,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Always `quantity * unit_price`.
    pub total_price: Decimal,
    pub status: PrItemStatus,
    pub delivery_status: DeliveryStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrItemStatus {
    pub fn is_terminal(self) -> bool {
        self == Self::Cancelled
    }

    /// Whether an item may move from `self` to `next`. Delivered items only
    /// move on to an assignment; nothing leaves `cancelled`.
    pub fn can_transition_to(self, next: PrItemStatus) -> bool {
        use PrItemStatus::*;
        match (self, next) {
            (Pending, Ordered | Assigned | Delivered) => true,
            (Ordered, Assigned | Delivered) => true,
            (Assigned, Ordered | Delivered) => true,
            (Delivered, Assigned) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Largest amount a `decimal(14, 2)` money column holds.
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999_99, 2)
}

/// Line total for a quantity and unit price, or `None` when it overflows or
/// does not fit a money column.
pub fn line_total(quantity: i32, unit_price: Decimal) -> Option<Decimal> {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .filter(|total| *total <= max_amount())
}

/// Sum of amounts under the same bound as [`line_total`].
pub fn sum_amounts(amounts: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .filter(|total| *total <= max_amount())
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
    #[sea_orm(has_many = "super::assignment_action::Entity")]
    AssignmentActions,
}

impl Related<super::purchase_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseRequest.def()
    }
}

impl Related<super::assignment_action::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssignmentActions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use sea_orm::Iterable;

    #[test]
    fn line_total_multiplies_quantity_by_unit_price() {
        assert_eq!(line_total(2, dec!(50)), Some(dec!(100)));
        assert_eq!(line_total(3, dec!(19.99)), Some(dec!(59.97)));
        assert_eq!(line_total(1, Decimal::ZERO), Some(Decimal::ZERO));
    }

    #[test]
    fn oversized_amounts_are_refused() {
        assert_eq!(line_total(2, Decimal::MAX), None);
        assert_eq!(line_total(1, dec!(1000000000000)), None);
        assert_eq!(line_total(1, max_amount()), Some(max_amount()));
        assert_eq!(sum_amounts([max_amount(), dec!(0.01)]), None);
        assert_eq!(sum_amounts([Decimal::MAX, Decimal::MAX]), None);
        assert_eq!(sum_amounts([dec!(100), dec!(300)]), Some(dec!(400)));
    }

    #[test]
    fn item_lifecycle() {
        use PrItemStatus::*;
        assert!(Pending.can_transition_to(Delivered));
        assert!(Delivered.can_transition_to(Assigned));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Delivered.can_transition_to(Ordered));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Assigned.can_transition_to(Assigned));
        for status in PrItemStatus::iter() {
            assert_eq!(status.can_transition_to(Cancelled), !status.is_terminal());
        }
    }

    proptest! {
        #[test]
        fn line_total_is_exact(quantity in 1i32..10_000, cents in 0i64..10_000_000) {
            let unit_price = Decimal::new(cents, 2);
            let total = line_total(quantity, unit_price).unwrap();
            prop_assert_eq!(total, unit_price * Decimal::from(quantity));
            prop_assert_eq!(total / Decimal::from(quantity), unit_price);
        }

        #[test]
        fn line_total_never_panics(quantity in 1i32..=i32::MAX, mantissa in any::<i64>(), scale in 0u32..28) {
            let unit_price = Decimal::new(mantissa, scale).abs();
            if let Some(total) = line_total(quantity, unit_price) {
                prop_assert!(total <= max_amount());
            }
        }
    }
}
