//! Authentication API endpoints
//!
//! - POST /api/v1/auth/signup - Create an account
//! - POST /api/v1/auth/login - Sign in
//! - POST /api/v1/auth/logout - Sign out
//! - POST /api/v1/auth/refresh - Extend the current session
//! - GET /api/v1/auth/session - Current session and admin classification

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, SESSION_COOKIE};
use crate::models::User;
use crate::services::AuthSession;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub is_admin: bool,
}

impl SessionResponse {
    fn new(session: AuthSession, is_admin: bool) -> Self {
        Self {
            user: session.user.into(),
            token: session.token,
            expires_at: session.expires_at,
            is_admin,
        }
    }
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(sign_up))
        .route("/login", post(login))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/session", get(current_session))
}

/// POST /api/v1/auth/signup
async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .auth
        .sign_up(&body.email, &body.password, body.display_name)
        .await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /api/v1/auth/login
///
/// Sets an HttpOnly session cookie and also returns the token for bearer use.
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ip = extract_ip_address(&headers);
    let session = state.auth.sign_in(&body.email, &body.password, ip).await?;
    let is_admin = state.gate.resolve(&session.token).await;

    let cookie = session_cookie(&session.token, state.session_max_age_secs);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse::new(session, is_admin)),
    ))
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.sign_out(&user.0.token).await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, session_cookie("", 0))],
    ))
}

/// POST /api/v1/auth/refresh
async fn refresh(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.refresh(&user.0.token).await?;
    let is_admin = state.gate.resolve(&session.token).await;

    let cookie = session_cookie(&session.token, state.session_max_age_secs);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SessionResponse::new(session, is_admin)),
    ))
}

/// GET /api/v1/auth/session
async fn current_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Json<SessionResponse> {
    let is_admin = state.gate.resolve(&user.0.token).await;
    Json(SessionResponse::new(user.0, is_admin))
}

fn session_cookie(token: &str, max_age_secs: i64) -> HeaderValue {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    );
    // Tokens are UUIDs, so the value is always valid header text
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("session=; Max-Age=0"))
}

/// Client address as reported by a reverse proxy
fn extract_ip_address(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next());
    let real_ip = headers.get("x-real-ip").and_then(|h| h.to_str().ok());

    forwarded
        .or(real_ip)
        .and_then(|ip| ip.trim().parse().ok())
}
