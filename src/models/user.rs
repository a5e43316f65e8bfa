//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account. Admin rights are not stored here; they are derived
/// from the configured allow-list by the admin gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Email address (unique, compared exactly)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a user that has not been stored yet.
    ///
    /// The password must already be hashed with
    /// [`hash_password`](crate::services::password::hash_password).
    pub fn new(email: String, password_hash: String, display_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            email,
            password_hash,
            display_name,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name shown next to comments and in the navigation bar
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prefers_display_name() {
        let mut user = User::new("marie@example.org".into(), "hash".into(), None);
        assert_eq!(user.label(), "marie@example.org");

        user.display_name = Some("Marie".into());
        assert_eq!(user.label(), "Marie");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("marie@example.org".into(), "secret-hash".into(), None);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
