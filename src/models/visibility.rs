//! Site section visibility flags

use serde::{Deserialize, Serialize};

fn visible() -> bool {
    true
}

/// Which optional site sections are shown to visitors.
///
/// Every flag defaults to `true`, and a stored document missing a flag is
/// completed with `true`, so a value of this type is never partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityState {
    #[serde(default = "visible")]
    pub about: bool,
    #[serde(default = "visible")]
    pub contact: bool,
    #[serde(default = "visible")]
    pub categories: bool,
    #[serde(default = "visible")]
    pub quick_links: bool,
    #[serde(default = "visible")]
    pub social: bool,
}

impl Default for VisibilityState {
    fn default() -> Self {
        Self {
            about: true,
            contact: true,
            categories: true,
            quick_links: true,
            social: true,
        }
    }
}

/// One toggleable section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    About,
    Contact,
    Categories,
    QuickLinks,
    Social,
}

impl VisibilityState {
    pub fn is_visible(&self, section: Section) -> bool {
        match section {
            Section::About => self.about,
            Section::Contact => self.contact,
            Section::Categories => self.categories,
            Section::QuickLinks => self.quick_links,
            Section::Social => self.social,
        }
    }

    /// Copy of this state with one section changed
    pub fn with(mut self, section: Section, visible: bool) -> Self {
        match section {
            Section::About => self.about = visible,
            Section::Contact => self.contact = visible,
            Section::Categories => self.categories = visible,
            Section::QuickLinks => self.quick_links = visible,
            Section::Social => self.social = visible,
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_complete_to_visible() {
        let state: VisibilityState =
            serde_json::from_str(r#"{"about":false,"contact":true,"categories":false}"#).unwrap();
        assert!(!state.about);
        assert!(!state.categories);
        assert!(state.quick_links);
        assert!(state.social);
    }

    #[test]
    fn test_serializes_every_key_in_camel_case() {
        let json = serde_json::to_value(VisibilityState::default()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        for key in ["about", "contact", "categories", "quickLinks", "social"] {
            assert!(keys.contains(&key), "missing {}", key);
        }
    }

    #[test]
    fn test_with_changes_one_section() {
        let state = VisibilityState::default().with(Section::Categories, false);
        assert!(!state.is_visible(Section::Categories));
        assert!(state.is_visible(Section::About));
    }
}
