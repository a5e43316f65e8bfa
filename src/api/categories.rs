//! Category API endpoints
//!
//! - GET /api/v1/categories - All categories by name
//! - GET /api/v1/categories/{id} - One category
//! - GET /api/v1/categories/{id}/posts - Published posts in a category
//!
//! Every route is a 404 while the categories section is hidden.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::api::posts::clamp_limit;
use crate::models::{Category, PostSummary};

#[derive(Debug, Deserialize)]
pub struct CategoryPostsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct CategoryPostsResponse {
    pub category: Category,
    pub posts: Vec<PostSummary>,
}

/// Build the categories router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/{id}", get(get_category))
        .route("/{id}/posts", get(get_category_posts))
}

fn ensure_visible(state: &AppState) -> Result<(), ApiError> {
    if state.visibility_view.current().categories {
        Ok(())
    } else {
        Err(ApiError::not_found("Categories are hidden"))
    }
}

/// GET /api/v1/categories
async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoryListResponse>, ApiError> {
    ensure_visible(&state)?;
    let categories = state.categories.list().await?;
    Ok(Json(CategoryListResponse { categories }))
}

/// GET /api/v1/categories/{id}
async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    ensure_visible(&state)?;
    Ok(Json(state.categories.get(id).await?))
}

/// GET /api/v1/categories/{id}/posts
async fn get_category_posts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<CategoryPostsQuery>,
) -> Result<Json<CategoryPostsResponse>, ApiError> {
    ensure_visible(&state)?;
    let category = state.categories.get(id).await?;
    let posts = state
        .posts
        .list_published(Some(id), clamp_limit(query.limit))
        .await?;

    Ok(Json(CategoryPostsResponse {
        category,
        posts: posts.iter().map(PostSummary::from).collect(),
    }))
}
