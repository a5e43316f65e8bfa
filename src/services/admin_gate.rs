//! Admin session gate
//!
//! A session is an admin session when its user's email is on the configured
//! allow-list. The comparison is exact and case-sensitive. Classifications
//! are cached per token and kept current by following the auth service's
//! event stream.

use crate::cache::{CacheLayer, MemoryCache};
use crate::services::auth::{AuthEvent, AuthEventKind, AuthService};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CACHE_CAPACITY: u64 = 10_000;

/// Classification of a session token as currently known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStatus {
    /// Not resolved yet; gated content must not be served
    Unknown,
    Admin,
    NotAdmin,
}

pub struct AdminGate {
    admin_emails: Vec<String>,
    auth: Arc<AuthService>,
    classifications: MemoryCache,
    ttl: Duration,
}

fn cache_key(token: &str) -> String {
    format!("admin:{}", token)
}

impl AdminGate {
    pub fn new(admin_emails: Vec<String>, auth: Arc<AuthService>) -> Self {
        Self::with_cache_ttl(admin_emails, auth, DEFAULT_CACHE_TTL)
    }

    pub fn with_cache_ttl(admin_emails: Vec<String>, auth: Arc<AuthService>, ttl: Duration) -> Self {
        Self {
            admin_emails,
            auth,
            classifications: MemoryCache::with_capacity_and_ttl(CACHE_CAPACITY, ttl),
            ttl,
        }
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|allowed| allowed == email)
    }

    /// Ask the auth service about a token. Fails closed: a missing session
    /// or a lookup error both classify as not admin.
    pub async fn check_admin_status(&self, token: &str) -> bool {
        match self.auth.get_session(token).await {
            Ok(Some(session)) => self.is_admin_email(&session.user.email),
            Ok(None) => false,
            Err(e) => {
                tracing::error!("Admin status check failed: {}", e);
                false
            }
        }
    }

    pub async fn status(&self, token: &str) -> AdminStatus {
        match self.classifications.get::<bool>(&cache_key(token)).await {
            Ok(Some(true)) => AdminStatus::Admin,
            Ok(Some(false)) => AdminStatus::NotAdmin,
            Ok(None) => AdminStatus::Unknown,
            Err(e) => {
                tracing::warn!("Unreadable admin classification: {}", e);
                AdminStatus::Unknown
            }
        }
    }

    /// The token's classification, waiting on the auth service if it is not
    /// known yet
    pub async fn resolve(&self, token: &str) -> bool {
        match self.status(token).await {
            AdminStatus::Admin => true,
            AdminStatus::NotAdmin => false,
            AdminStatus::Unknown => {
                let is_admin = self.check_admin_status(token).await;
                self.remember(token, is_admin).await;
                is_admin
            }
        }
    }

    /// Update the cached classification for an auth transition. Returns the
    /// new classification.
    pub async fn on_auth_state_change(&self, event: &AuthEvent) -> bool {
        match event.kind {
            AuthEventKind::SignedOut => {
                self.forget(&event.token).await;
                false
            }
            AuthEventKind::SignedIn
            | AuthEventKind::TokenRefreshed
            | AuthEventKind::UserUpdated => {
                let is_admin = match &event.session {
                    Some(session) => self.is_admin_email(&session.user.email),
                    None => self.check_admin_status(&event.token).await,
                };
                self.remember(&event.token, is_admin).await;
                tracing::debug!("Session reclassified after {:?}: admin={}", event.kind, is_admin);
                is_admin
            }
        }
    }

    /// Follow an auth event stream until the returned listener is dropped
    pub fn listen(self: &Arc<Self>, mut events: broadcast::Receiver<AuthEvent>) -> AuthListener {
        let gate = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        gate.on_auth_state_change(&event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Missed transitions could leave stale entries
                        tracing::warn!("Admin gate lagged by {} auth event(s), clearing", skipped);
                        if let Err(e) = gate.classifications.clear().await {
                            tracing::error!("Failed to clear admin classifications: {}", e);
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        AuthListener { task }
    }

    async fn remember(&self, token: &str, is_admin: bool) {
        if let Err(e) = self
            .classifications
            .set(&cache_key(token), &is_admin, self.ttl)
            .await
        {
            tracing::warn!("Failed to cache admin classification: {}", e);
        }
    }

    async fn forget(&self, token: &str) {
        if let Err(e) = self.classifications.delete(&cache_key(token)).await {
            tracing::warn!("Failed to drop admin classification: {}", e);
        }
    }
}

/// Background auth-event subscription; aborts on drop
pub struct AuthListener {
    task: JoinHandle<()>,
}

impl AuthListener {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for AuthListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::services::auth::AuthSession;
    use crate::services::rate_limiter::LoginRateLimiter;

    const ADMIN: &str = "admin@psalter.test";
    const READER: &str = "reader@psalter.test";
    const PASSWORD: &str = "password123";

    async fn bare_auth() -> Arc<AuthService> {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        Arc::new(AuthService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            Arc::new(LoginRateLimiter::new()),
        ))
    }

    async fn setup() -> (Arc<AuthService>, Arc<AdminGate>) {
        let auth = bare_auth().await;
        auth.sign_up(ADMIN, PASSWORD, None).await.unwrap();
        auth.sign_up(READER, PASSWORD, None).await.unwrap();

        let gate = Arc::new(AdminGate::new(vec![ADMIN.to_string()], Arc::clone(&auth)));
        (auth, gate)
    }

    async fn sign_in(auth: &AuthService, email: &str) -> AuthSession {
        auth.sign_in(email, PASSWORD, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_is_admin_email_is_exact() {
        let (_, gate) = setup().await;
        assert!(gate.is_admin_email(ADMIN));
        assert!(!gate.is_admin_email("Admin@psalter.test"));
        assert!(!gate.is_admin_email(" admin@psalter.test"));
        assert!(!gate.is_admin_email(READER));
        assert!(!gate.is_admin_email(""));
    }

    #[tokio::test]
    async fn test_check_admin_status() {
        let (auth, gate) = setup().await;
        let admin = sign_in(&auth, ADMIN).await;
        let reader = sign_in(&auth, READER).await;

        assert!(gate.check_admin_status(&admin.token).await);
        assert!(!gate.check_admin_status(&reader.token).await);
        assert!(!gate.check_admin_status("no-such-token").await);
    }

    #[tokio::test]
    async fn test_status_unknown_until_resolved() {
        let (auth, gate) = setup().await;
        let admin = sign_in(&auth, ADMIN).await;

        assert_eq!(gate.status(&admin.token).await, AdminStatus::Unknown);
        assert!(gate.resolve(&admin.token).await);
        assert_eq!(gate.status(&admin.token).await, AdminStatus::Admin);
    }

    #[tokio::test]
    async fn test_auth_events_update_classification() {
        let (auth, gate) = setup().await;
        let admin = sign_in(&auth, ADMIN).await;

        let signed_in = AuthEvent {
            kind: AuthEventKind::SignedIn,
            token: admin.token.clone(),
            session: Some(admin.clone()),
        };
        assert!(gate.on_auth_state_change(&signed_in).await);
        assert_eq!(gate.status(&admin.token).await, AdminStatus::Admin);

        let signed_out = AuthEvent {
            kind: AuthEventKind::SignedOut,
            token: admin.token.clone(),
            session: None,
        };
        assert!(!gate.on_auth_state_change(&signed_out).await);
        assert_eq!(gate.status(&admin.token).await, AdminStatus::Unknown);
    }

    #[tokio::test]
    async fn test_listener_follows_sign_in_and_out() {
        let (auth, gate) = setup().await;
        let _listener = gate.listen(auth.events());

        let admin = sign_in(&auth, ADMIN).await;
        wait_for(&gate, &admin.token, AdminStatus::Admin).await;

        auth.sign_out(&admin.token).await.unwrap();
        wait_for(&gate, &admin.token, AdminStatus::Unknown).await;
        assert!(!gate.resolve(&admin.token).await);
    }

    #[tokio::test]
    async fn test_dropping_listener_stops_it() {
        let (auth, gate) = setup().await;
        let listener = gate.listen(auth.events());
        drop(listener);

        let reader = sign_in(&auth, READER).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(gate.status(&reader.token).await, AdminStatus::Unknown);
    }

    async fn wait_for(gate: &AdminGate, token: &str, expected: AdminStatus) {
        for _ in 0..100 {
            if gate.status(token).await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("admin status never became {:?}", expected);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            /// Only byte-identical emails are admins
            #[test]
            fn allow_list_membership_is_exact(email in "[a-zA-Z]{1,8}@[a-z]{1,8}\\.[a-z]{2,3}") {
                let rt = tokio::runtime::Runtime::new().unwrap();
                let auth = rt.block_on(bare_auth());
                let listed = AdminGate::new(vec![email.clone()], auth);

                prop_assert!(listed.is_admin_email(&email));
                let upper = email.to_uppercase();
                prop_assert_eq!(listed.is_admin_email(&upper), upper == email);
                let padded = format!("{} ", email);
                prop_assert!(!listed.is_admin_email(&padded));
            }
        }
    }
}
