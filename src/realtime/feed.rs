//! Per-table change feed.
//!
//! Every committed write is published here as a [`RowChange`]. Subscribers get
//! their own broadcast receiver per table; a receiver that falls behind sees
//! [`StreamError::Lagged`] and is expected to resync from the store.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::common::now_micros;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One committed row change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    pub table: String,
    pub kind: ChangeKind,
    /// The row as JSON; for deletes, the last known state.
    pub record: Value,
    pub committed_at: DateTime<Utc>,
}

/// `column = value` membership filter evaluated on JSON rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqFilter {
    pub column: String,
    pub value: String,
}

impl EqFilter {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Value) -> bool {
        match record.get(&self.column) {
            Some(field) => json_field_equals(field, &self.value),
            None => false,
        }
    }
}

/// Compares a JSON field against a query-string value. Strings compare
/// verbatim, everything else by its JSON text (`true`, `42`, `null`).
pub fn json_field_equals(field: &Value, expected: &str) -> bool {
    match field {
        Value::String(s) => s == expected,
        other => other.to_string() == expected,
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StreamError {
    #[error("change stream lagged by {0} messages")]
    Lagged(u64),
    #[error("change stream closed")]
    Closed,
}

pub struct ChangeFeed {
    channels: DashMap<String, broadcast::Sender<RowChange>>,
    capacity: usize,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, table: &str) -> broadcast::Sender<RowChange> {
        self.channels
            .entry(table.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Publishes a change; returns how many subscribers received it.
    pub fn publish(&self, table: &str, kind: ChangeKind, record: Value) -> usize {
        let change = RowChange {
            table: table.to_string(),
            kind,
            record,
            committed_at: now_micros(),
        };
        counter!("assetdesk_realtime_changes_total", 1, "table" => table.to_string());

        match self.sender(table).send(change) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(table, "No subscribers for change");
                0
            }
        }
    }

    /// Serializes `row` and publishes it. Serialization failures are logged;
    /// the write they describe is already committed.
    pub fn publish_row<T: Serialize>(&self, table: &str, kind: ChangeKind, row: &T) {
        match serde_json::to_value(row) {
            Ok(record) => {
                self.publish(table, kind, record);
            }
            Err(e) => warn!(table, error = %e, "Failed to serialize row change"),
        }
    }

    pub fn subscribe(&self, table: &str) -> ChangeStream {
        ChangeStream {
            rx: self.sender(table).subscribe(),
            filter: None,
        }
    }

    pub fn subscribe_filtered(&self, table: &str, filter: EqFilter) -> ChangeStream {
        ChangeStream {
            rx: self.sender(table).subscribe(),
            filter: Some(filter),
        }
    }

    pub fn subscriber_count(&self, table: &str) -> usize {
        self.channels
            .get(table)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

/// Receiving half of one table subscription.
pub struct ChangeStream {
    rx: broadcast::Receiver<RowChange>,
    filter: Option<EqFilter>,
}

impl ChangeStream {
    /// Next change passing the filter. Deletes always pass so that consumers
    /// can evict rows they hold.
    pub async fn recv(&mut self) -> Result<RowChange, StreamError> {
        loop {
            match self.rx.recv().await {
                Ok(change) => {
                    if let Some(filter) = &self.filter {
                        if change.kind != ChangeKind::Delete && !filter.matches(&change.record) {
                            continue;
                        }
                    }
                    return Ok(change);
                }
                Err(broadcast::error::RecvError::Closed) => return Err(StreamError::Closed),
                Err(broadcast::error::RecvError::Lagged(n)) => return Err(StreamError::Lagged(n)),
            }
        }
    }
}
