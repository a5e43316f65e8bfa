//! Footer content model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single editable footer row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FooterContent {
    pub id: i64,
    pub about_text: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub contact_address: String,
    pub social_facebook: Option<String>,
    pub social_twitter: Option<String>,
    pub social_instagram: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full replacement of the editable footer fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFooterInput {
    #[serde(default)]
    pub about_text: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub contact_address: String,
    #[serde(default)]
    pub social_facebook: Option<String>,
    #[serde(default)]
    pub social_twitter: Option<String>,
    #[serde(default)]
    pub social_instagram: Option<String>,
}

impl UpdateFooterInput {
    /// Trim every field and turn blank social links into `None`
    pub fn normalized(self) -> Self {
        fn link(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            about_text: self.about_text.trim().to_string(),
            contact_email: self.contact_email.trim().to_string(),
            contact_phone: self.contact_phone.trim().to_string(),
            contact_address: self.contact_address.trim().to_string(),
            social_facebook: link(self.social_facebook),
            social_twitter: link(self.social_twitter),
            social_instagram: link(self.social_instagram),
        }
    }
}
