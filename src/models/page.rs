//! Static page model (about, contact)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Slug of the page gated by the `about` visibility flag
pub const ABOUT_SLUG: &str = "about";
/// Slug of the page gated by the `contact` visibility flag
pub const CONTACT_SLUG: &str = "contact";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub slug: String,
    pub title: String,
    /// HTML produced by the rich-text editor
    pub content: String,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input for updating a page by slug
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePageInput {
    pub title: Option<String>,
    pub content: String,
}
