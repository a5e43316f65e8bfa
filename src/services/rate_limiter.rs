//! Rate limiter for sign-in attempts
//!
//! Two sliding windows: failed attempts per account email and raw requests
//! per client IP.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;

const MAX_FAILED_ATTEMPTS: usize = 5;
const FAILED_ATTEMPT_WINDOW_MINUTES: i64 = 15;
const MAX_IP_REQUESTS: usize = 10;
const IP_WINDOW_MINUTES: i64 = 1;

type Window<K> = Arc<RwLock<HashMap<K, Vec<DateTime<Utc>>>>>;

pub struct LoginRateLimiter {
    /// Failed sign-ins keyed by lower-cased email
    email_attempts: Window<String>,
    ip_requests: Window<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            email_attempts: Arc::new(RwLock::new(HashMap::new())),
            ip_requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// True once an email has 5 failures in the last 15 minutes
    pub async fn is_email_limited(&self, email: &str) -> bool {
        let cutoff = Utc::now() - Duration::minutes(FAILED_ATTEMPT_WINDOW_MINUTES);
        let mut attempts = self.email_attempts.write().await;
        match attempts.get_mut(&email.to_lowercase()) {
            Some(times) => {
                times.retain(|time| *time > cutoff);
                times.len() >= MAX_FAILED_ATTEMPTS
            }
            None => false,
        }
    }

    pub async fn record_failed_attempt(&self, email: &str) {
        let mut attempts = self.email_attempts.write().await;
        attempts
            .entry(email.to_lowercase())
            .or_default()
            .push(Utc::now());
    }

    /// Forget failures after a successful sign-in
    pub async fn clear_email_attempts(&self, email: &str) {
        self.email_attempts
            .write()
            .await
            .remove(&email.to_lowercase());
    }

    /// True once an IP has made 10 requests in the last minute
    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        let cutoff = Utc::now() - Duration::minutes(IP_WINDOW_MINUTES);
        let mut requests = self.ip_requests.write().await;
        match requests.get_mut(&ip) {
            Some(times) => {
                times.retain(|time| *time > cutoff);
                times.len() >= MAX_IP_REQUESTS
            }
            None => false,
        }
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.ip_requests
            .write()
            .await
            .entry(ip)
            .or_default()
            .push(Utc::now());
    }

    /// Drop expired timestamps and empty keys
    pub async fn cleanup(&self) {
        let now = Utc::now();
        let email_cutoff = now - Duration::minutes(FAILED_ATTEMPT_WINDOW_MINUTES);
        let ip_cutoff = now - Duration::minutes(IP_WINDOW_MINUTES);

        self.email_attempts.write().await.retain(|_, times| {
            times.retain(|time| *time > email_cutoff);
            !times.is_empty()
        });

        self.ip_requests.write().await.retain(|_, times| {
            times.retain(|time| *time > ip_cutoff);
            !times.is_empty()
        });
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> (usize, usize) {
        (
            self.email_attempts.read().await.len(),
            self.ip_requests.read().await.len(),
        )
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn test_email_rate_limit() {
        let limiter = LoginRateLimiter::new();

        for _ in 0..4 {
            assert!(!limiter.is_email_limited("reader@psalter.test").await);
            limiter.record_failed_attempt("reader@psalter.test").await;
        }
        limiter.record_failed_attempt("reader@psalter.test").await;
        assert!(limiter.is_email_limited("reader@psalter.test").await);

        limiter.clear_email_attempts("reader@psalter.test").await;
        assert!(!limiter.is_email_limited("reader@psalter.test").await);
    }

    #[tokio::test]
    async fn test_ip_rate_limit() {
        let limiter = LoginRateLimiter::new();
        let ip = IpAddr::from_str("127.0.0.1").unwrap();

        for _ in 0..9 {
            assert!(!limiter.is_ip_limited(ip).await);
            limiter.record_ip_request(ip).await;
        }
        limiter.record_ip_request(ip).await;
        assert!(limiter.is_ip_limited(ip).await);

        let other = IpAddr::from_str("10.0.0.2").unwrap();
        assert!(!limiter.is_ip_limited(other).await);
    }

    #[tokio::test]
    async fn test_email_keys_are_case_insensitive() {
        let limiter = LoginRateLimiter::new();
        for email in ["A@B.io", "a@b.io", "A@b.IO", "a@B.io", "a@b.io"] {
            limiter.record_failed_attempt(email).await;
        }
        assert!(limiter.is_email_limited("a@b.io").await);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_recent_entries() {
        let limiter = LoginRateLimiter::new();
        limiter.record_failed_attempt("a@b.io").await;
        limiter
            .record_ip_request(IpAddr::from_str("::1").unwrap())
            .await;

        limiter.cleanup().await;
        assert_eq!(limiter.tracked_keys().await, (1, 1));
    }
}
