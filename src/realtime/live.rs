use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

use super::feed::{ChangeFeed, ChangeKind, ChangeStream, EqFilter, RowChange, StreamError};
use crate::errors::ServiceError;

/// Primary key of a synced row, as text.
pub trait RowKey {
    fn row_key(&self) -> String;
}

impl RowKey for Value {
    fn row_key(&self) -> String {
        match self.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

/// Source of the full current row set for a table.
#[async_trait]
pub trait SnapshotLoader<T>: Send + Sync + 'static {
    async fn load(&self) -> Result<Vec<T>, ServiceError>;
}

type RefreshAck = oneshot::Sender<Result<(), ServiceError>>;

/// A locally held, continuously updated copy of one table (optionally
/// narrowed by an [`EqFilter`]).
///
/// The subscription is taken before the initial snapshot is loaded so no
/// committed change can fall between the two. The background task stops on
/// [`LiveCollection::close`] or when the collection is dropped.
pub struct LiveCollection<T> {
    table: String,
    rows: watch::Receiver<Vec<T>>,
    refresh_tx: mpsc::Sender<RefreshAck>,
    task: JoinHandle<()>,
}

impl<T> LiveCollection<T>
where
    T: RowKey + Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub async fn open<L>(
        feed: &ChangeFeed,
        table: &str,
        filter: Option<EqFilter>,
        loader: L,
    ) -> Result<Self, ServiceError>
    where
        L: SnapshotLoader<T>,
    {
        let stream = feed.subscribe(table);
        let initial = load_matching(&loader, filter.as_ref()).await?;
        debug!(table, rows = initial.len(), "Opened live collection");

        let (rows_tx, rows) = watch::channel(initial);
        let (refresh_tx, refresh_rx) = mpsc::channel(4);
        let task = tokio::spawn(sync_loop(
            table.to_string(),
            stream,
            rows_tx,
            refresh_rx,
            loader,
            filter,
        ));

        Ok(Self {
            table: table.to_string(),
            rows,
            refresh_tx,
            task,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Current rows. Advisory: the store stays authoritative.
    pub fn snapshot(&self) -> Vec<T> {
        self.rows.borrow().clone()
    }

    /// Receiver notified after every applied change or reload.
    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.rows.clone()
    }

    /// Reloads the snapshot from the store and waits for it to be applied.
    pub async fn refresh(&self) -> Result<(), ServiceError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.refresh_tx
            .send(ack_tx)
            .await
            .map_err(|_| ServiceError::InternalError("live collection closed".to_string()))?;
        ack_rx
            .await
            .map_err(|_| ServiceError::InternalError("live collection closed".to_string()))?
    }

    /// Releases the subscription.
    pub fn close(self) {}
}

impl<T> Drop for LiveCollection<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn load_matching<T, L>(loader: &L, filter: Option<&EqFilter>) -> Result<Vec<T>, ServiceError>
where
    T: Serialize,
    L: SnapshotLoader<T>,
{
    let rows = loader.load().await?;
    Ok(match filter {
        None => rows,
        Some(filter) => rows
            .into_iter()
            .filter(|row| {
                serde_json::to_value(row)
                    .map(|v| filter.matches(&v))
                    .unwrap_or(false)
            })
            .collect(),
    })
}

async fn sync_loop<T, L>(
    table: String,
    mut stream: ChangeStream,
    rows_tx: watch::Sender<Vec<T>>,
    mut refresh_rx: mpsc::Receiver<RefreshAck>,
    loader: L,
    filter: Option<EqFilter>,
) where
    T: RowKey + Serialize + DeserializeOwned + Send + Sync + 'static,
    L: SnapshotLoader<T>,
{
    loop {
        tokio::select! {
            received = stream.recv() => match received {
                Ok(change) => apply_change(&rows_tx, change, filter.as_ref()),
                Err(StreamError::Lagged(missed)) => {
                    warn!(table = %table, missed, "Live collection lagged; resyncing");
                    if let Err(e) = reload(&rows_tx, &loader, filter.as_ref()).await {
                        warn!(table = %table, error = %e, "Resync failed");
                    }
                }
                Err(StreamError::Closed) => break,
            },
            Some(ack) = refresh_rx.recv() => {
                let result = reload(&rows_tx, &loader, filter.as_ref()).await;
                let _ = ack.send(result);
            }
        }
    }
    debug!(table = %table, "Live collection sync loop ended");
}

async fn reload<T, L>(
    rows_tx: &watch::Sender<Vec<T>>,
    loader: &L,
    filter: Option<&EqFilter>,
) -> Result<(), ServiceError>
where
    T: Serialize,
    L: SnapshotLoader<T>,
{
    let rows = load_matching(loader, filter).await?;
    rows_tx.send_replace(rows);
    Ok(())
}

fn apply_change<T>(rows_tx: &watch::Sender<Vec<T>>, change: RowChange, filter: Option<&EqFilter>)
where
    T: RowKey + DeserializeOwned,
{
    let key = change.record.row_key();
    let member = filter.map_or(true, |f| f.matches(&change.record));

    match change.kind {
        ChangeKind::Insert | ChangeKind::Update if member => {
            let row: T = match serde_json::from_value(change.record) {
                Ok(row) => row,
                Err(e) => {
                    warn!(table = %change.table, error = %e, "Skipping undecodable change");
                    return;
                }
            };
            rows_tx.send_modify(|rows| match rows.iter().position(|r| r.row_key() == key) {
                Some(idx) => rows[idx] = row,
                None => rows.push(row),
            });
        }
        // deletes, and updates that left the filter
        _ => {
            rows_tx.send_if_modified(|rows| {
                let before = rows.len();
                rows.retain(|r| r.row_key() != key);
                rows.len() != before
            });
        }
    }
}
