//! Authentication service
//!
//! Email/password accounts with opaque session tokens. Every session
//! transition is published on a broadcast channel so that derived state,
//! such as the admin classification, can follow sign-in, refresh and
//! sign-out without polling.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User};
use crate::services::password::{hash_password, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;
const MIN_PASSWORD_CHARS: usize = 8;
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Email '{0}' is already registered")]
    EmailTaken(String),

    #[error("Too many sign-in attempts, try again later")]
    RateLimited,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A live session together with its user
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// Auth-state transition for one session token
#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub token: String,
    /// Absent for `SignedOut`
    pub session: Option<AuthSession>,
}

pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    rate_limiter: Arc<LoginRateLimiter>,
    session_expiration_days: i64,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        rate_limiter: Arc<LoginRateLimiter>,
    ) -> Self {
        Self::with_session_expiration(
            user_repo,
            session_repo,
            rate_limiter,
            DEFAULT_SESSION_EXPIRATION_DAYS,
        )
    }

    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        rate_limiter: Arc<LoginRateLimiter>,
        session_expiration_days: i64,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            user_repo,
            session_repo,
            rate_limiter,
            session_expiration_days,
            events,
        }
    }

    /// Subscribe to auth-state transitions
    pub fn events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn rate_limiter(&self) -> &Arc<LoginRateLimiter> {
        &self.rate_limiter
    }

    fn emit(&self, kind: AuthEventKind, token: &str, session: Option<AuthSession>) {
        let event = AuthEvent {
            kind,
            token: token.to_string(),
            session,
        };
        match self.events.send(event) {
            Ok(count) => tracing::debug!("auth: emitted {:?} to {} subscriber(s)", kind, count),
            Err(_) => tracing::debug!("auth: no subscribers for {:?}", kind),
        }
    }

    /// Create an account
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<String>,
    ) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();
        validate_credentials(&email, password)?;

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(AuthError::EmailTaken(email));
        }

        let password_hash = hash_password(password)?;
        let display_name = display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let user = self
            .user_repo
            .create(&User::new(email, password_hash, display_name))
            .await
            .context("Failed to create user")?;

        tracing::info!("New account registered: {}", user.email);
        Ok(user)
    }

    /// Verify credentials and open a session
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        ip: Option<IpAddr>,
    ) -> Result<AuthSession, AuthError> {
        if let Some(ip) = ip {
            if self.rate_limiter.is_ip_limited(ip).await {
                tracing::warn!("Sign-in rate limited for IP {}", ip);
                return Err(AuthError::RateLimited);
            }
            self.rate_limiter.record_ip_request(ip).await;
        }

        let email = email.trim().to_lowercase();
        if self.rate_limiter.is_email_limited(&email).await {
            tracing::warn!("Sign-in rate limited for {}", email);
            return Err(AuthError::RateLimited);
        }

        let user = match self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to look up user")?
        {
            Some(user) if verify_password(password, &user.password_hash)? => user,
            _ => {
                self.rate_limiter.record_failed_attempt(&email).await;
                return Err(AuthError::InvalidCredentials);
            }
        };

        self.rate_limiter.clear_email_attempts(&email).await;

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(self.session_expiration_days),
            created_at: now,
        };
        self.session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        let auth_session = AuthSession {
            token: session.id,
            user,
            expires_at: session.expires_at,
        };
        self.emit(
            AuthEventKind::SignedIn,
            &auth_session.token,
            Some(auth_session.clone()),
        );
        Ok(auth_session)
    }

    /// Look up a live session. Expired sessions are deleted and reported as
    /// absent.
    pub async fn get_session(&self, token: &str) -> Result<Option<AuthSession>, AuthError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get session user")?;

        Ok(user.map(|user| AuthSession {
            token: session.id,
            user,
            expires_at: session.expires_at,
        }))
    }

    /// Push a live session's expiry out by the configured lifetime
    pub async fn refresh(&self, token: &str) -> Result<AuthSession, AuthError> {
        let mut session = self
            .get_session(token)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        let expires_at = Utc::now() + Duration::days(self.session_expiration_days);
        if !self
            .session_repo
            .extend(token, expires_at)
            .await
            .context("Failed to extend session")?
        {
            return Err(AuthError::SessionNotFound);
        }
        session.expires_at = expires_at;

        self.emit(AuthEventKind::TokenRefreshed, token, Some(session.clone()));
        Ok(session)
    }

    /// Close a session. Unknown tokens are not an error.
    pub async fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        self.emit(AuthEventKind::SignedOut, token, None);
        Ok(())
    }

    /// Re-announce a session after its user record changed
    pub async fn notify_user_updated(&self, token: &str) -> Result<(), AuthError> {
        if let Some(session) = self.get_session(token).await? {
            self.emit(AuthEventKind::UserUpdated, token, Some(session));
        }
        Ok(())
    }

    pub async fn cleanup_expired_sessions(&self) -> Result<i64, AuthError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to clean up expired sessions")?;
        Ok(count)
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.is_empty() {
        return Err(AuthError::ValidationError("Email is required".to_string()));
    }
    if !email.contains('@') {
        return Err(AuthError::ValidationError("Invalid email format".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    Ok(())
}
