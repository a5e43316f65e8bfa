//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and service error mapping
//! - Authentication (session token validation)
//! - Authorization through the admin gate

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxCategoryRepository, SqlxCommentRepository, SqlxFooterRepository, SqlxPageRepository,
    SqlxPostRepository, SqlxSessionRepository, SqlxSettingsRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    AdminGate, AuthError, AuthListener, AuthService, AuthSession, CategoryService,
    CategoryServiceError, ChangeFeed, CommentService, CommentServiceError, FooterService,
    FooterServiceError, LoginRateLimiter, NavigationService, PageService, PageServiceError,
    PostService, PostServiceError, SecretService, ThemeService, ThemeServiceError,
    VisibilityError, VisibilityStore, VisibilityView, WatchHandle,
};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub auth: Arc<AuthService>,
    pub gate: Arc<AdminGate>,
    pub visibility: Arc<VisibilityStore>,
    pub visibility_view: Arc<VisibilityView>,
    pub posts: Arc<PostService>,
    pub categories: Arc<CategoryService>,
    pub pages: Arc<PageService>,
    pub comments: Arc<CommentService>,
    pub footer: Arc<FooterService>,
    pub navigation: Arc<NavigationService>,
    pub theme: Arc<ThemeService>,
    pub secrets: Arc<SecretService>,
    pub changes: ChangeFeed,
    pub static_dir: PathBuf,
    pub session_max_age_secs: i64,
    _tasks: Arc<BackgroundTasks>,
}

/// Subscriptions that live as long as the state does
struct BackgroundTasks {
    _auth_listener: AuthListener,
    _visibility_watch: WatchHandle,
}

impl AppState {
    /// Wire every service on top of a migrated pool
    pub async fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let cache = create_cache(&config.cache);
        let changes = ChangeFeed::new();

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let settings_repo = SqlxSettingsRepository::boxed(pool.clone());
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());

        let auth = Arc::new(AuthService::with_session_expiration(
            user_repo,
            session_repo,
            Arc::new(LoginRateLimiter::new()),
            config.auth.session_expiration_days,
        ));
        let gate = Arc::new(AdminGate::with_cache_ttl(
            config.auth.admin_emails.clone(),
            auth.clone(),
            Duration::from_secs(config.auth.admin_cache_seconds),
        ));
        let auth_listener = gate.listen(auth.events());

        let visibility = Arc::new(VisibilityStore::new(settings_repo.clone()));
        let visibility_view = Arc::new(VisibilityView::attach(&visibility).await);
        let visibility_watch =
            visibility.watch(Duration::from_millis(config.visibility.watch_interval_ms));

        let categories = Arc::new(CategoryService::new(
            category_repo.clone(),
            cache.clone(),
            changes.clone(),
        ));
        let posts = Arc::new(PostService::new(
            post_repo.clone(),
            category_repo,
            cache.clone(),
            changes.clone(),
        ));
        let pages = Arc::new(PageService::new(
            SqlxPageRepository::boxed(pool.clone()),
            cache.clone(),
            changes.clone(),
        ));
        let comments = Arc::new(CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            post_repo,
            changes.clone(),
        ));
        let footer = Arc::new(FooterService::new(
            SqlxFooterRepository::boxed(pool.clone()),
            visibility_view.clone(),
            cache,
            changes.clone(),
        ));
        let navigation = Arc::new(NavigationService::new(
            visibility_view.clone(),
            categories.clone(),
        ));

        Self {
            pool,
            auth,
            gate,
            visibility,
            visibility_view,
            posts,
            categories,
            pages,
            comments,
            footer,
            navigation,
            theme: Arc::new(ThemeService::new(settings_repo)),
            secrets: Arc::new(SecretService::new(config.secrets.clone())),
            changes,
            static_dir: config.server.static_dir.clone(),
            session_max_age_secs: config.auth.session_expiration_days * 24 * 60 * 60,
            _tasks: Arc::new(BackgroundTasks {
                _auth_listener: auth_listener,
                _visibility_watch: visibility_watch,
            }),
        }
    }
}

/// Session attached by [`require_auth`]
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AuthSession);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Whoever is making the request, signed in or not. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub session: Option<AuthSession>,
    pub is_admin: bool,
}

impl Viewer {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_session_token(&parts.headers) else {
            return Ok(Viewer::default());
        };

        let session = match state.auth.get_session(&token).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Session lookup failed: {}", e);
                None
            }
        };
        let is_admin = match &session {
            Some(_) => state.gate.resolve(&token).await,
            None => false,
        };
        Ok(Viewer { session, is_admin })
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_secs: u64) -> Self {
        Self::with_details(
            "RATE_LIMIT",
            message,
            serde_json::json!({ "retry_after": retry_after_secs }),
        )
    }

    /// Log the cause and hide it from the client
    pub fn internal_error(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Request failed: {}", cause);
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => ApiError::unauthorized(e.to_string()),
            AuthError::ValidationError(msg) => ApiError::validation_error(msg),
            AuthError::EmailTaken(_) => ApiError::conflict(e.to_string()),
            AuthError::RateLimited => ApiError::rate_limited(e.to_string(), 900),
            AuthError::SessionNotFound => ApiError::unauthorized("Invalid or expired session"),
            AuthError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<PostServiceError> for ApiError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            PostServiceError::CategoryNotFound(_) | PostServiceError::ValidationError(_) => {
                ApiError::validation_error(e.to_string())
            }
            PostServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::DuplicateName(_) => ApiError::conflict(e.to_string()),
            CategoryServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            CategoryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CategoryServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<PageServiceError> for ApiError {
    fn from(e: PageServiceError) -> Self {
        match e {
            PageServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            PageServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::PostNotFound(_) | CommentServiceError::NotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CommentServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<FooterServiceError> for ApiError {
    fn from(e: FooterServiceError) -> Self {
        match e {
            FooterServiceError::NotFound => ApiError::not_found(e.to_string()),
            FooterServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<ThemeServiceError> for ApiError {
    fn from(e: ThemeServiceError) -> Self {
        match e {
            ThemeServiceError::UnknownTheme(_) => ApiError::validation_error(e.to_string()),
            ThemeServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<VisibilityError> for ApiError {
    fn from(e: VisibilityError) -> Self {
        ApiError::internal_error(e)
    }
}

/// Extract session token from the `Authorization` header or the session cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie
                    .trim()
                    .strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
                {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let session = state
        .auth
        .get_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(session));
    Ok(next.run(request).await)
}

/// Admin authorization middleware. Runs after [`require_auth`].
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !state.gate.resolve(&user.0.token).await {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_session_token_from_bearer() {
        let headers = headers(header::AUTHORIZATION, "Bearer abc123");
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let headers = headers(header::COOKIE, "theme=dark; session=xyz789");
        assert_eq!(extract_session_token(&headers), Some("xyz789".to_string()));
    }

    #[test]
    fn test_extract_session_token_bearer_priority() {
        let mut headers = headers(header::AUTHORIZATION, "Bearer from_header");
        headers.insert(header::COOKIE, HeaderValue::from_static("session=from_cookie"));
        assert_eq!(extract_session_token(&headers), Some("from_header".to_string()));
    }

    #[test]
    fn test_extract_session_token_ignores_lookalike_cookies() {
        let headers = headers(header::COOKIE, "session_hint=1; session=");
        assert_eq!(extract_session_token(&headers), None);
        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::rate_limited("x", 60).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::new("SOMETHING_ELSE", "x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_hides_cause() {
        let error: ApiError = PostServiceError::InternalError(anyhow::anyhow!("disk on fire")).into();
        assert_eq!(error.error.code, "INTERNAL_ERROR");
        assert!(!error.error.message.contains("disk"));
    }

    #[test]
    fn test_rate_limit_details() {
        let error: ApiError = AuthError::RateLimited.into();
        assert_eq!(error.error.code, "RATE_LIMIT");
        assert_eq!(error.error.details.unwrap()["retry_after"], 900);
    }
}
