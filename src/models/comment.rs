//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author recorded when a commenter leaves the name blank
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    #[serde(default)]
    pub author: Option<String>,
    pub content: String,
}
