//! Front-end routes
//!
//! The single-page app shell (`index.html` from the static directory) is
//! served for every client-side route, behind the same guards the app
//! applies: the dashboard is admin-only and hidden sections do not exist.
//! Other files under the static directory are served as-is.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};

use crate::api::middleware::{AppState, Viewer};
use crate::models::Section;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(shell))
        .route("/blog", get(shell))
        .route("/blog/{id}", get(shell))
        .route("/blog/category/{id}", get(category_page))
        .route("/about", get(about_page))
        .route("/contact", get(contact_page))
        .route("/dashboard", get(dashboard))
        .route("/login", get(shell))
}

async fn shell(State(state): State<AppState>) -> Response {
    let index = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => ([(header::CACHE_CONTROL, "no-cache")], Html(html)).into_response(),
        Err(e) => {
            tracing::warn!("Front-end shell unavailable at {:?}: {}", index, e);
            not_found()
        }
    }
}

/// Serve the shell only while `section` is visible
async fn guarded(state: AppState, section: Section) -> Response {
    if state.visibility_view.current().is_visible(section) {
        shell(State(state)).await
    } else {
        not_found()
    }
}

async fn about_page(State(state): State<AppState>) -> Response {
    guarded(state, Section::About).await
}

async fn contact_page(State(state): State<AppState>) -> Response {
    guarded(state, Section::Contact).await
}

async fn category_page(State(state): State<AppState>, Path(_id): Path<i64>) -> Response {
    guarded(state, Section::Categories).await
}

/// Admins get the shell; everyone else is sent to the login page
async fn dashboard(State(state): State<AppState>, viewer: Viewer) -> Response {
    if viewer.is_admin {
        shell(State(state)).await
    } else {
        Redirect::to("/login").into_response()
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Html("<html><body><h1>404 Not Found</h1></body></html>"),
    )
        .into_response()
}
