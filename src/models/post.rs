//! Post model
//!
//! Posts hold editor-produced HTML. Excerpts and reading time are derived
//! from the text content with markup stripped.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum excerpt length in characters, before the ellipsis
pub const EXCERPT_MAX_CHARS: usize = 160;

/// Words per minute used for the reading-time estimate
pub const WORDS_PER_MINUTE: usize = 200;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid space regex"));

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    pub title: String,
    /// HTML body
    pub content: String,
    pub published: bool,
    /// Publication date shown to readers; listing order for public pages
    pub date: DateTime<Utc>,
    pub author: String,
    /// Cover image URL or data URL
    pub image: Option<String>,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Body text without markup, whitespace collapsed
    pub fn plain_text(&self) -> String {
        plain_text(&self.content)
    }

    pub fn excerpt(&self) -> String {
        excerpt(&self.content, EXCERPT_MAX_CHARS)
    }

    /// Estimated reading time in minutes, never below one
    pub fn reading_time(&self) -> usize {
        reading_time(&self.content)
    }
}

pub fn plain_text(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    SPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// First `max_chars` characters of the text, cut at a word boundary when
/// possible, with `...` appended if anything was dropped.
pub fn excerpt(html: &str, max_chars: usize) -> String {
    let text = plain_text(html);
    if text.chars().count() <= max_chars {
        return text;
    }

    let cut: String = text.chars().take(max_chars).collect();
    let trimmed = match cut.rfind(' ') {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}...", trimmed.trim_end())
}

pub fn reading_time(html: &str) -> usize {
    let words = plain_text(html).split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

/// Post as listed on the public blog pages
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub image: Option<String>,
    pub author: String,
    pub date: DateTime<Utc>,
    pub category_id: Option<i64>,
    pub reading_time: usize,
}

impl From<&Post> for PostSummary {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            excerpt: post.excerpt(),
            image: post.image.clone(),
            author: post.author.clone(),
            date: post.date,
            category_id: post.category_id,
            reading_time: post.reading_time(),
        }
    }
}

/// A row of the admin posts table
#[derive(Debug, Clone, Serialize)]
pub struct PostRow {
    #[serde(flatten)]
    pub post: Post,
    /// Resolved category name, or `"-"` when missing
    pub category_name: String,
}

/// Input for creating (no `id`) or updating a post
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SavePostInput {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_strips_tags_and_entities() {
        let html = "<p>Blessed&nbsp;are <strong>the meek</strong></p>\n<p>for they&#39;ll</p>";
        assert_eq!(plain_text(html), "Blessed are the meek for they'll");
    }

    #[test]
    fn test_short_excerpt_is_untouched() {
        assert_eq!(excerpt("<p>Short word</p>", 160), "Short word");
    }

    #[test]
    fn test_long_excerpt_cuts_on_word_boundary() {
        let html = "<p>one two three four five</p>";
        assert_eq!(excerpt(html, 12), "one two...");
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time(""), 1);
        assert_eq!(reading_time(&"word ".repeat(200)), 1);
        assert_eq!(reading_time(&"word ".repeat(201)), 2);
        assert_eq!(reading_time(&format!("<p>{}</p>", "word ".repeat(1000))), 5);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            /// Excerpts never exceed the limit plus the ellipsis and never contain markup.
            #[test]
            fn excerpt_is_bounded(words in proptest::collection::vec("[a-zA-Z]{1,12}", 0..120), max in 10usize..200) {
                let html = format!("<div><p>{}</p></div>", words.join(" "));
                let result = excerpt(&html, max);
                prop_assert!(result.chars().count() <= max + 3);
                prop_assert!(!result.contains('<'));
            }
        }
    }
}
