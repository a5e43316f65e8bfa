//! Public site endpoints
//!
//! - GET /api/v1/site/visibility - Current section visibility
//! - GET /api/v1/site/visibility/events - Visibility changes as server-sent events
//! - GET /api/v1/site/theme - Active theme, palette and CSS variables
//! - GET /api/v1/nav - Menu for the current visitor
//! - GET /api/v1/footer - Footer with hidden sections removed

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::api::middleware::{ApiError, AppState, Viewer};
use crate::models::VisibilityState;
use crate::services::{FooterView, NavLink, ThemeDescriptor, VisibilityEvent};

#[derive(Debug, Serialize)]
pub struct NavResponse {
    pub items: Vec<NavLink>,
    pub is_admin: bool,
    pub is_authenticated: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/visibility", get(get_visibility))
        .route("/visibility/events", get(visibility_events))
        .route("/theme", get(get_theme))
}

/// GET /api/v1/site/visibility
async fn get_visibility(State(state): State<AppState>) -> Json<VisibilityState> {
    Json(state.visibility.load().await)
}

fn changed_event(visibility: &VisibilityState) -> Result<Event, axum::Error> {
    Event::default().event("changed").json_data(visibility)
}

fn invalidated_event() -> Result<Event, axum::Error> {
    Ok(Event::default().event("invalidated").data("{}"))
}

/// GET /api/v1/site/visibility/events
///
/// Sends the current state first, then a `changed` event per local write and
/// an `invalidated` event whenever the stored value changed elsewhere.
async fn visibility_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let receiver = state.visibility.events();
    let current = state.visibility.load().await;

    let updates = stream::unfold(receiver, |mut receiver| async move {
        let event = match receiver.recv().await {
            Ok(VisibilityEvent::Changed(visibility)) => changed_event(&visibility),
            Ok(VisibilityEvent::Invalidated) => invalidated_event(),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("visibility stream lagged by {}", skipped);
                invalidated_event()
            }
            Err(RecvError::Closed) => return None,
        };
        Some((event, receiver))
    });

    Sse::new(stream::once(async move { changed_event(&current) }).chain(updates))
        .keep_alive(KeepAlive::default())
}

/// GET /api/v1/site/theme
async fn get_theme(State(state): State<AppState>) -> Result<Json<ThemeDescriptor>, ApiError> {
    Ok(Json(state.theme.describe().await?))
}

/// GET /api/v1/nav
pub async fn get_nav(State(state): State<AppState>, viewer: Viewer) -> Json<NavResponse> {
    let items = state
        .navigation
        .menu(viewer.is_admin, viewer.is_authenticated())
        .await;
    Json(NavResponse {
        items,
        is_admin: viewer.is_admin,
        is_authenticated: viewer.is_authenticated(),
    })
}

/// GET /api/v1/footer
pub async fn get_footer(State(state): State<AppState>) -> Result<Json<FooterView>, ApiError> {
    Ok(Json(state.footer.view().await?))
}
