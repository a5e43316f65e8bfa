//! Site navigation
//!
//! The menu follows section visibility through a [`VisibilityView`], so a
//! section hidden from the dashboard disappears from the next menu built.

use crate::services::category::CategoryService;
use crate::services::visibility::VisibilityView;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NavAction {
    Navigate,
    SignOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
    pub action: NavAction,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavLink>,
}

impl NavLink {
    pub fn to(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            action: NavAction::Navigate,
            children: Vec::new(),
        }
    }

    fn sign_out() -> Self {
        Self {
            action: NavAction::SignOut,
            ..Self::to("Logout", "/api/v1/auth/logout")
        }
    }
}

pub struct NavigationService {
    visibility: Arc<VisibilityView>,
    categories: Arc<CategoryService>,
}

impl NavigationService {
    pub fn new(visibility: Arc<VisibilityView>, categories: Arc<CategoryService>) -> Self {
        Self {
            visibility,
            categories,
        }
    }

    /// Build the top-level menu for a visitor.
    ///
    /// A category lookup failure only drops the category entries.
    pub async fn menu(&self, is_admin: bool, is_authenticated: bool) -> Vec<NavLink> {
        let visibility = self.visibility.current();
        let mut menu = vec![NavLink::to("Home", "/")];

        if visibility.about {
            menu.push(NavLink::to("About", "/about"));
        }
        if visibility.contact {
            menu.push(NavLink::to("Contact", "/contact"));
        }

        let mut blog = NavLink::to("Blog", "/blog");
        if visibility.categories {
            blog.children.push(NavLink::to("All posts", "/blog"));
            match self.categories.list().await {
                Ok(categories) => blog.children.extend(
                    categories
                        .into_iter()
                        .map(|c| NavLink::to(c.name, format!("/blog/category/{}", c.id))),
                ),
                Err(e) => tracing::warn!("Failed to load categories for navigation: {}", e),
            }
        }
        menu.push(blog);

        if is_admin {
            menu.push(NavLink::to("Dashboard", "/dashboard"));
        }

        menu.push(if is_authenticated {
            NavLink::sign_out()
        } else {
            NavLink::to("Login", "/login")
        });
        menu
    }
}
