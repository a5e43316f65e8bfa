//! Page API endpoints
//!
//! - GET /api/v1/pages/{slug} - Public page; `about` and `contact` are 404 while hidden

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Page, Section, ABOUT_SLUG, CONTACT_SLUG};

pub fn router() -> Router<AppState> {
    Router::new().route("/{slug}", get(get_page))
}

/// Section that gates a page, if any
pub(crate) fn page_section(slug: &str) -> Option<Section> {
    match slug {
        ABOUT_SLUG => Some(Section::About),
        CONTACT_SLUG => Some(Section::Contact),
        _ => None,
    }
}

/// GET /api/v1/pages/{slug}
async fn get_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Page>, ApiError> {
    if let Some(section) = page_section(&slug) {
        if !state.visibility_view.current().is_visible(section) {
            return Err(ApiError::not_found(format!("Page not found: {}", slug)));
        }
    }
    Ok(Json(state.pages.get_by_slug(&slug).await?))
}
