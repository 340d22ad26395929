use std::{collections::HashMap, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::DateRangeParams,
    entities::{
        department,
        pr_item::{self, ItemCategory},
        purchase_request::{self, PrStatus},
    },
    errors::ServiceError,
};

/// Filters over purchase requests. Empty sets and `None` fields do not
/// constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrSearchFilters {
    /// Case-insensitive substring of the PR number.
    pub pr_number: Option<String>,
    pub requester_id: Option<Uuid>,
    /// Case-insensitive substring of the requester name.
    pub requester_name: Option<String>,
    #[serde(default)]
    pub status: Vec<PrStatus>,
    /// Matches when any item has one of these categories.
    #[serde(default)]
    pub category: Vec<ItemCategory>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub has_incomplete_info: Option<bool>,
    pub is_delivered: Option<bool>,
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, ServiceError> {
    raw.parse::<T>()
        .map_err(|_| ServiceError::ValidationError(format!("Invalid value '{}' for {}", raw, key)))
}

fn push_list<T: FromStr>(key: &str, raw: &str, into: &mut Vec<T>) -> Result<(), ServiceError> {
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        into.push(parse_value(key, part)?);
    }
    Ok(())
}

impl PrSearchFilters {
    /// Parses a raw query string. `status` and `category` may repeat or be
    /// comma-separated; keys this type does not know are ignored.
    pub fn from_query(raw: &str) -> Result<Self, ServiceError> {
        let mut filters = Self::default();
        let mut range = DateRangeParams::default();

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match &*key {
                "pr_number" => filters.pr_number = Some(value.to_string()),
                "requester_id" => filters.requester_id = Some(parse_value(&key, value)?),
                "requester_name" => filters.requester_name = Some(value.to_string()),
                "status" => push_list(&key, value, &mut filters.status)?,
                "category" => push_list(&key, value, &mut filters.category)?,
                "date_from" => range.date_from = Some(value.to_string()),
                "date_to" => range.date_to = Some(value.to_string()),
                "assigned_to" => filters.assigned_to = Some(parse_value(&key, value)?),
                "department_id" => filters.department_id = Some(parse_value(&key, value)?),
                "has_incomplete_info" => {
                    filters.has_incomplete_info = Some(parse_value(&key, value)?)
                }
                "is_delivered" => filters.is_delivered = Some(parse_value(&key, value)?),
                _ => {}
            }
        }

        let (from, to) = range.to_datetime_range()?;
        filters.date_from = from;
        filters.date_to = to;
        Ok(filters)
    }

    fn condition(&self) -> Condition {
        let mut cond = Condition::all();

        if let Some(pr_number) = &self.pr_number {
            cond = cond.add(
                Expr::expr(Func::lower(Expr::col((
                    purchase_request::Entity,
                    purchase_request::Column::PrNumber,
                ))))
                .like(contains_pattern(pr_number)),
            );
        }
        if let Some(requester_id) = self.requester_id {
            cond = cond.add(purchase_request::Column::RequesterId.eq(requester_id));
        }
        if let Some(name) = &self.requester_name {
            cond = cond.add(
                Expr::expr(Func::lower(Expr::col((
                    purchase_request::Entity,
                    purchase_request::Column::RequesterName,
                ))))
                .like(contains_pattern(name)),
            );
        }
        if !self.status.is_empty() {
            cond = cond.add(purchase_request::Column::Status.is_in(self.status.iter().copied()));
        }
        if let Some(from) = self.date_from {
            cond = cond.add(purchase_request::Column::CreatedAt.gte(from));
        }
        if let Some(to) = self.date_to {
            cond = cond.add(purchase_request::Column::CreatedAt.lte(to));
        }
        if let Some(assigned_to) = self.assigned_to {
            cond = cond.add(purchase_request::Column::AssignedTo.eq(assigned_to));
        }
        if let Some(department_id) = self.department_id {
            cond = cond.add(purchase_request::Column::DepartmentId.eq(department_id));
        }

        cond
    }

    /// Predicates that need the request's items.
    fn keeps(&self, request: &purchase_request::Model, items: &[pr_item::Model]) -> bool {
        if !self.category.is_empty() && !items.iter().any(|i| self.category.contains(&i.category))
        {
            return false;
        }
        if let Some(wanted) = self.has_incomplete_info {
            if request.has_incomplete_info() != wanted {
                return false;
            }
        }
        if let Some(wanted) = self.is_delivered {
            if items.iter().any(|i| i.delivered_at.is_some()) != wanted {
                return false;
            }
        }
        true
    }
}

/// `%needle%`, lowercased, with LIKE wildcards in the needle escaped.
fn contains_pattern(needle: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape('\\')
}

/// A purchase request row as listed by search and export.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseRequestListing {
    #[serde(flatten)]
    pub request: purchase_request::Model,
    pub items: Vec<pr_item::Model>,
    pub department_name: Option<String>,
}

#[derive(Clone)]
pub struct SearchService {
    db: Arc<DatabaseConnection>,
}

impl SearchService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Runs the store-side filters, then the item-based ones. Newest first.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        filters: &PrSearchFilters,
    ) -> Result<Vec<PurchaseRequestListing>, ServiceError> {
        let requests = purchase_request::Entity::find()
            .filter(filters.condition())
            .order_by_desc(purchase_request::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = requests.iter().map(|r| r.id).collect();
        let mut items_by_pr: HashMap<Uuid, Vec<pr_item::Model>> = HashMap::new();
        for item in pr_item::Entity::find()
            .filter(pr_item::Column::PrId.is_in(ids))
            .order_by_asc(pr_item::Column::CreatedAt)
            .all(&*self.db)
            .await?
        {
            items_by_pr.entry(item.pr_id).or_default().push(item);
        }

        let department_ids: Vec<Uuid> = requests.iter().filter_map(|r| r.department_id).collect();
        let department_names: HashMap<Uuid, String> = if department_ids.is_empty() {
            HashMap::new()
        } else {
            department::Entity::find()
                .filter(department::Column::Id.is_in(department_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|d| (d.id, d.name))
                .collect()
        };

        let fetched = requests.len();
        let listings: Vec<_> = requests
            .into_iter()
            .filter_map(|request| {
                let items = items_by_pr.remove(&request.id).unwrap_or_default();
                if !filters.keeps(&request, &items) {
                    return None;
                }
                let department_name = request
                    .department_id
                    .and_then(|id| department_names.get(&id).cloned());
                Some(PurchaseRequestListing {
                    request,
                    items,
                    department_name,
                })
            })
            .collect();

        debug!(fetched, returned = listings.len(), "Purchase request search");
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn repeated_and_comma_separated_lists_accumulate() {
        let filters =
            PrSearchFilters::from_query("status=draft,approved&status=rejected&category=device")
                .unwrap();
        assert_eq!(
            filters.status,
            vec![PrStatus::Draft, PrStatus::Approved, PrStatus::Rejected]
        );
        assert_eq!(filters.category, vec![ItemCategory::Device]);
    }

    #[test]
    fn unknown_keys_and_blank_values_are_ignored() {
        let filters = PrSearchFilters::from_query("format=csv&pr_number=&is_delivered=true").unwrap();
        assert_eq!(filters.pr_number, None);
        assert_eq!(filters.is_delivered, Some(true));
    }

    #[test]
    fn invalid_values_are_validation_errors() {
        assert_matches!(
            PrSearchFilters::from_query("status=shipped"),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            PrSearchFilters::from_query("requester_id=nope"),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            PrSearchFilters::from_query("date_from=yesterday"),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn date_bounds_are_parsed() {
        let filters =
            PrSearchFilters::from_query("date_from=2024-01-01&date_to=2024-01-31").unwrap();
        assert!(filters.date_from.unwrap() < filters.date_to.unwrap());
    }
}
