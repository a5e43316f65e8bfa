//! Change feed over server-sent events
//!
//! - GET /api/v1/realtime/{table} - One event per insert, update or delete

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::{Stream, StreamExt};

use crate::api::middleware::{ApiError, AppState};
use crate::services::Table;

pub fn router() -> Router<AppState> {
    Router::new().route("/{table}", get(subscribe))
}

/// GET /api/v1/realtime/{table}
async fn subscribe(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let table: Table = table
        .parse()
        .map_err(|_| ApiError::not_found(format!("Unknown table: {}", table)))?;

    let events = state
        .changes
        .subscribe(table)
        .into_stream()
        .map(|change| Event::default().event(change.op.as_str()).json_data(change));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
