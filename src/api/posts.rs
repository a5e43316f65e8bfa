//! Public post endpoints
//!
//! - GET /api/v1/posts?category_id=&limit= - Published posts, newest first
//! - GET /api/v1/posts/{id} - One published post
//! - GET /api/v1/posts/{id}/related - Other posts of the same category
//! - GET /api/v1/posts/{id}/comments - Comments, oldest first
//! - POST /api/v1/posts/{id}/comments - Leave a comment

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Comment, CreateCommentInput, Post, PostSummary};
use crate::services::DEFAULT_RELATED_LIMIT;

const MAX_LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub category_id: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostSummary>,
}

/// A full post with its derived fields
#[derive(Debug, Serialize)]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: Post,
    pub excerpt: String,
    pub reading_time: usize,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            excerpt: post.excerpt(),
            reading_time: post.reading_time(),
            post,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<Comment>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts))
        .route("/{id}", get(get_post))
        .route("/{id}/related", get(related_posts))
        .route("/{id}/comments", get(list_comments).post(create_comment))
}

/// Clamp a client supplied limit to `1..=MAX_LIST_LIMIT`
pub(crate) fn clamp_limit(limit: Option<i64>) -> Option<i64> {
    limit.map(|l| l.clamp(1, MAX_LIST_LIMIT))
}

/// GET /api/v1/posts
async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    if query.category_id.is_some() && !state.visibility_view.current().categories {
        return Err(ApiError::not_found("Categories are hidden"));
    }

    let posts = state
        .posts
        .list_published(query.category_id, clamp_limit(query.limit))
        .await?;
    Ok(Json(PostListResponse {
        posts: posts.iter().map(PostSummary::from).collect(),
    }))
}

/// GET /api/v1/posts/{id}
async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state.posts.get_published(id).await?;
    Ok(Json(post.into()))
}

/// GET /api/v1/posts/{id}/related
async fn related_posts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<RelatedQuery>,
) -> Result<Json<PostListResponse>, ApiError> {
    let limit = clamp_limit(query.limit).unwrap_or(DEFAULT_RELATED_LIMIT);
    let posts = state.posts.related(id, limit).await?;
    Ok(Json(PostListResponse {
        posts: posts.iter().map(PostSummary::from).collect(),
    }))
}

/// GET /api/v1/posts/{id}/comments
async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CommentListResponse>, ApiError> {
    state.posts.get_published(id).await?;
    let comments = state.comments.list_for_post(id).await?;
    Ok(Json(CommentListResponse { comments }))
}

/// POST /api/v1/posts/{id}/comments
async fn create_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CreateCommentInput>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state.comments.create(id, body).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
