//! File exports of purchase-request search results.

mod delimited;
mod pdf;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    services::search::{PrSearchFilters, PurchaseRequestListing, SearchService},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Excel,
    Pdf,
    Json,
}

impl FromStr for ExportFormat {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "excel" | "xls" => Ok(Self::Excel),
            "pdf" => Ok(Self::Pdf),
            "json" => Ok(Self::Json),
            other => Err(ServiceError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Excel => "application/vnd.ms-excel",
            Self::Pdf => "application/pdf",
            Self::Json => "application/json",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xls",
            Self::Pdf => "pdf",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub filters: PrSearchFilters,
    pub include_items: bool,
}

impl ExportOptions {
    /// Reads `format` (default csv), `include_items` and the search filters
    /// from one query string.
    pub fn from_query(raw: &str) -> Result<Self, ServiceError> {
        let mut format = ExportFormat::Csv;
        let mut include_items = false;

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match &*key {
                "format" if !value.trim().is_empty() => format = value.parse()?,
                "include_items" => {
                    include_items = matches!(value.trim(), "true" | "1" | "yes");
                }
                _ => {}
            }
        }

        Ok(Self {
            format,
            filters: PrSearchFilters::from_query(raw)?,
            include_items,
        })
    }
}

/// A rendered export ready to be served as a download.
#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
}

/// Runs a search and renders the result in the requested format.
#[derive(Clone)]
pub struct ExportService {
    search: SearchService,
    max_rows: usize,
}

impl ExportService {
    pub fn new(search: SearchService, max_rows: usize) -> Self {
        Self { search, max_rows }
    }

    #[instrument(skip(self), fields(format = %options.format))]
    pub async fn export(&self, options: &ExportOptions) -> Result<ExportPayload, ServiceError> {
        let mut listings = self.search.search(&options.filters).await?;
        if listings.len() > self.max_rows {
            warn!(
                total = listings.len(),
                max_rows = self.max_rows,
                "Export truncated"
            );
            listings.truncate(self.max_rows);
        }

        let payload = render(&listings, options.format, options.include_items)?;
        metrics::counter!("assetdesk_exports_total", 1, "format" => options.format.to_string());
        info!(rows = listings.len(), bytes = payload.bytes.len(), "Export rendered");
        Ok(payload)
    }
}

pub fn render(
    listings: &[PurchaseRequestListing],
    format: ExportFormat,
    include_items: bool,
) -> Result<ExportPayload, ServiceError> {
    let bytes = match format {
        ExportFormat::Csv => delimited::write_delimited(&table_rows(listings, include_items), b',')?,
        ExportFormat::Excel => {
            delimited::write_delimited(&table_rows(listings, include_items), b'\t')?
        }
        ExportFormat::Pdf => pdf::write_table(&table_rows(listings, include_items)),
        ExportFormat::Json => serde_json::to_vec_pretty(listings)?,
    };

    Ok(ExportPayload {
        bytes,
        content_type: format.content_type(),
        file_name: format!(
            "purchase-requests-{}.{}",
            chrono::Utc::now().format("%Y%m%d-%H%M%S"),
            format.extension()
        ),
    })
}

const REQUEST_COLUMNS: [&str; 8] = [
    "pr_number",
    "title",
    "requester_name",
    "department",
    "status",
    "priority",
    "total_amount",
    "created_at",
];

const ITEM_COLUMNS: [&str; 6] = [
    "item_name",
    "category",
    "quantity",
    "unit_price",
    "total_price",
    "item_status",
];

fn header(include_items: bool) -> Vec<String> {
    let mut cols: Vec<String> = REQUEST_COLUMNS.iter().map(|c| c.to_string()).collect();
    if include_items {
        cols.extend(ITEM_COLUMNS.iter().map(|c| c.to_string()));
    }
    cols
}

/// Header followed by one row per request, or per item when
/// `include_items` is set. Requests without items still get a row.
fn table_rows(listings: &[PurchaseRequestListing], include_items: bool) -> Vec<Vec<String>> {
    let mut rows = vec![header(include_items)];

    for listing in listings {
        let pr = &listing.request;
        let base = vec![
            pr.pr_number.clone(),
            pr.title.clone(),
            pr.requester_name.clone(),
            listing.department_name.clone().unwrap_or_default(),
            pr.status.to_string(),
            pr.priority.to_string(),
            pr.total_amount.to_string(),
            pr.created_at.to_rfc3339(),
        ];

        if !include_items || listing.items.is_empty() {
            let mut row = base;
            if include_items {
                row.extend(std::iter::repeat(String::new()).take(ITEM_COLUMNS.len()));
            }
            rows.push(row);
            continue;
        }

        for item in &listing.items {
            let mut row = base.clone();
            row.extend([
                item.name.clone(),
                item.category.to_string(),
                item.quantity.to_string(),
                item.unit_price.to_string(),
                item.total_price.to_string(),
                item.status.to_string(),
            ]);
            rows.push(row);
        }
    }

    rows
}
