//! Admin API endpoints
//!
//! Every route here runs behind `require_auth` and `require_admin`.
//!
//! Posts:
//! - GET /api/v1/admin/posts?q= - Dashboard table with optional title search
//! - POST /api/v1/admin/posts - Create
//! - PUT /api/v1/admin/posts/{id} - Update
//! - DELETE /api/v1/admin/posts/{id} - Delete
//! - POST /api/v1/admin/posts/{id}/toggle-publish
//! - POST /api/v1/admin/posts/{id}/duplicate
//!
//! Site content:
//! - POST/PUT/DELETE /api/v1/admin/categories[/{id}]
//! - GET /api/v1/admin/pages, PUT /api/v1/admin/pages/{slug}
//! - GET/PUT /api/v1/admin/footer
//! - PUT /api/v1/admin/visibility, PUT /api/v1/admin/theme
//! - GET /api/v1/admin/secrets/{name}
//! - DELETE /api/v1/admin/comments/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    Category, CategoryInput, FooterContent, Page, PostRow, SavePostInput, SiteTheme,
    UpdateFooterInput, UpdatePageInput, VisibilityState,
};
use crate::services::ThemeDescriptor;

#[derive(Debug, Deserialize)]
pub struct AdminPostsQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminPostListResponse {
    pub posts: Vec<PostRow>,
}

#[derive(Debug, Serialize)]
pub struct PublishStateResponse {
    pub id: i64,
    pub published: bool,
}

#[derive(Debug, Serialize)]
pub struct PageListResponse {
    pub pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
pub struct SetThemeRequest {
    pub theme: String,
}

#[derive(Debug, Serialize)]
pub struct SecretResponse {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct ThemeListResponse {
    pub themes: Vec<SiteTheme>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", put(update_post).delete(delete_post))
        .route("/posts/{id}/toggle-publish", post(toggle_publish))
        .route("/posts/{id}/duplicate", post(duplicate_post))
        .route("/categories", post(create_category))
        .route("/categories/{id}", put(rename_category).delete(delete_category))
        .route("/pages", get(list_pages))
        .route("/pages/{slug}", put(update_page))
        .route("/footer", get(get_footer).put(update_footer))
        .route("/visibility", put(set_visibility))
        .route("/theme", get(list_themes).put(set_theme))
        .route("/secrets/{name}", get(get_secret))
        .route("/comments/{id}", delete(delete_comment))
}

// ============================================================================
// Posts
// ============================================================================

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<AdminPostsQuery>,
) -> Result<Json<AdminPostListResponse>, ApiError> {
    let posts = state.posts.list_all(query.q.as_deref()).await?;
    Ok(Json(AdminPostListResponse { posts }))
}

async fn create_post(
    State(state): State<AppState>,
    Json(body): Json<SavePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.posts.save(None, body).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SavePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.posts.save(Some(id), body).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.posts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_publish(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PublishStateResponse>, ApiError> {
    let published = state.posts.toggle_publish(id).await?;
    Ok(Json(PublishStateResponse { id, published }))
}

async fn duplicate_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let copy = state.posts.duplicate(id).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

// ============================================================================
// Categories
// ============================================================================

async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.categories.create(&body.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn rename_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.categories.rename(id, &body.name).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Pages & footer
// ============================================================================

async fn list_pages(State(state): State<AppState>) -> Result<Json<PageListResponse>, ApiError> {
    let pages = state.pages.list().await?;
    Ok(Json(PageListResponse { pages }))
}

async fn update_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<UpdatePageInput>,
) -> Result<Json<Page>, ApiError> {
    Ok(Json(state.pages.update(&slug, body).await?))
}

async fn get_footer(State(state): State<AppState>) -> Result<Json<FooterContent>, ApiError> {
    Ok(Json(state.footer.get().await?))
}

async fn update_footer(
    State(state): State<AppState>,
    Json(body): Json<UpdateFooterInput>,
) -> Result<Json<FooterContent>, ApiError> {
    Ok(Json(state.footer.update(body).await?))
}

// ============================================================================
// Site settings
// ============================================================================

/// PUT /api/v1/admin/visibility
///
/// Missing flags in the body default to visible.
async fn set_visibility(
    State(state): State<AppState>,
    Json(body): Json<VisibilityState>,
) -> Result<Json<VisibilityState>, ApiError> {
    state.visibility.set(body).await?;
    Ok(Json(body))
}

async fn list_themes() -> Json<ThemeListResponse> {
    Json(ThemeListResponse {
        themes: SiteTheme::ALL.to_vec(),
    })
}

async fn set_theme(
    State(state): State<AppState>,
    Json(body): Json<SetThemeRequest>,
) -> Result<Json<ThemeDescriptor>, ApiError> {
    let theme = state.theme.set(&body.theme).await?;
    Ok(Json(theme.into()))
}

async fn get_secret(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SecretResponse>, ApiError> {
    let value = state
        .secrets
        .get(&name)
        .ok_or_else(|| ApiError::not_found(format!("Secret not found: {}", name)))?;

    Ok(Json(SecretResponse {
        value: value.to_string(),
        name,
    }))
}

// ============================================================================
// Comments
// ============================================================================

async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comments.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
