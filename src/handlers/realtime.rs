use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{stream, Stream};
use serde::Deserialize;
use tracing::{debug, warn};
use utoipa::IntoParams;

use super::common::authorize;
use crate::{
    auth::Actor,
    entities::permission::PermissionAction,
    errors::ServiceError,
    realtime::{ChangeKind, ChangeStream, EqFilter, StreamError, SyncTable},
    AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct RealtimeQuery {
    /// Column of the membership filter; requires `value`.
    pub column: Option<String>,
    pub value: Option<String>,
}

fn event_name(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Insert => "INSERT",
        ChangeKind::Update => "UPDATE",
        ChangeKind::Delete => "DELETE",
    }
}

fn is_own_inbox(table: SyncTable, filter: Option<&EqFilter>, actor: &Actor) -> bool {
    table == SyncTable::Notifications
        && filter.map_or(false, |f| {
            f.column == "user_id" && f.value == actor.user_id.to_string()
        })
}

/// Turns a subscription into SSE events. A lagged receiver gets a `resync`
/// event and keeps streaming; a closed feed ends the stream.
fn change_events(
    changes: ChangeStream,
) -> impl Stream<Item = Result<Event, axum::Error>> + Send + 'static {
    stream::unfold(changes, |mut changes| async move {
        match changes.recv().await {
            Ok(change) => {
                let event = Event::default()
                    .event(event_name(change.kind))
                    .json_data(&change);
                Some((event, changes))
            }
            Err(StreamError::Lagged(missed)) => {
                warn!(missed, "Realtime subscriber lagged");
                let event = Event::default().event("resync").data(missed.to_string());
                Some((Ok(event), changes))
            }
            Err(StreamError::Closed) => None,
        }
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/realtime/{table}",
    summary = "Stream table changes",
    description = "Server-sent events, one per committed INSERT, UPDATE or DELETE. \
                   With `column` and `value`, only rows where that column equals the value are sent (deletes always are).",
    params(
        ("table" = String, Path, description = "Table name, e.g. purchase_requests"),
        RealtimeQuery,
    ),
    responses(
        (status = 200, description = "text/event-stream of row changes"),
        (status = 400, description = "Incomplete filter", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown table", body = crate::errors::ErrorResponse),
    ),
    security(("ApiKey" = [])),
    tag = "realtime"
)]
pub async fn stream_table_changes(
    State(state): State<AppState>,
    actor: Actor,
    Path(table): Path<String>,
    Query(query): Query<RealtimeQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ServiceError> {
    let table = SyncTable::parse(&table)?;
    let filter = match (query.column, query.value) {
        (Some(column), Some(value)) => Some(EqFilter::new(column, value)),
        (None, None) => None,
        _ => {
            return Err(ServiceError::ValidationError(
                "column and value must be given together".to_string(),
            ))
        }
    };

    if !is_own_inbox(table, filter.as_ref(), &actor) {
        authorize(&state, &actor, table.resource(), PermissionAction::Read).await?;
    }

    debug!(%table, filter = ?filter, user_id = %actor.user_id, "Realtime subscription opened");
    let changes = match filter {
        Some(filter) => state.feed.subscribe_filtered(table.as_ref(), filter),
        None => state.feed.subscribe(table.as_ref()),
    };

    Ok(Sse::new(change_events(changes)).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::ChangeFeed;
    use futures::StreamExt;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn own_inbox_needs_matching_user_filter() {
        let actor = Actor {
            user_id: Uuid::new_v4(),
            role: "employee".into(),
        };
        let mine = EqFilter::new("user_id", actor.user_id.to_string());
        let theirs = EqFilter::new("user_id", Uuid::new_v4().to_string());

        assert!(is_own_inbox(SyncTable::Notifications, Some(&mine), &actor));
        assert!(!is_own_inbox(SyncTable::Notifications, Some(&theirs), &actor));
        assert!(!is_own_inbox(SyncTable::Notifications, None, &actor));
        assert!(!is_own_inbox(SyncTable::PrItems, Some(&mine), &actor));
    }

    #[tokio::test]
    async fn changes_become_events() {
        let feed = ChangeFeed::new(8);
        let events = change_events(feed.subscribe("pr_items"));
        futures::pin_mut!(events);

        feed.publish("pr_items", ChangeKind::Insert, json!({ "id": 1 }));
        assert!(events.next().await.unwrap().is_ok());
    }
}
