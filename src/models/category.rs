//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder rendered where a post's category is missing or was deleted.
pub const MISSING_CATEGORY_LABEL: &str = "-";

/// A flat grouping of posts, listed by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: String) -> Self {
        Self {
            id: 0,
            name,
            created_at: Utc::now(),
        }
    }
}

/// Input for creating or renaming a category
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}
