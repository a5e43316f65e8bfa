//! Footer service
//!
//! The footer is a single row. [`FooterService::view`] renders the public
//! footer with hidden sections removed.

use crate::cache::{CacheLayer, SharedCache};
use crate::db::repositories::FooterRepository;
use crate::models::{FooterContent, UpdateFooterInput};
use crate::services::navigation::NavLink;
use crate::services::realtime::{ChangeFeed, ChangeOp, Table};
use crate::services::visibility::VisibilityView;
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const FOOTER_CACHE_TTL_SECS: u64 = 3600;
const CACHE_KEY_FOOTER: &str = "footer:content";

/// Shown when the about text has never been filled in
pub const DEFAULT_ABOUT_TEXT: &str =
    "A place to share reflections, prayers and news with our community.";

#[derive(Debug, thiserror::Error)]
pub enum FooterServiceError {
    #[error("Footer content not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactBlock {
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocialLink {
    pub network: &'static str,
    pub url: String,
}

/// Public footer. A `None` section is hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterView {
    pub about: Option<String>,
    pub quick_links: Option<Vec<NavLink>>,
    pub contact: Option<ContactBlock>,
    pub social: Option<Vec<SocialLink>>,
}

pub struct FooterService {
    repo: Arc<dyn FooterRepository>,
    visibility: Arc<VisibilityView>,
    cache: SharedCache,
    feed: ChangeFeed,
    cache_ttl: Duration,
}

impl FooterService {
    pub fn new(
        repo: Arc<dyn FooterRepository>,
        visibility: Arc<VisibilityView>,
        cache: SharedCache,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            repo,
            visibility,
            cache,
            feed,
            cache_ttl: Duration::from_secs(FOOTER_CACHE_TTL_SECS),
        }
    }

    pub async fn get(&self) -> Result<FooterContent, FooterServiceError> {
        if let Some(footer) = self
            .cache
            .get::<FooterContent>(CACHE_KEY_FOOTER)
            .await
            .ok()
            .flatten()
        {
            return Ok(footer);
        }

        let footer = self
            .repo
            .get()
            .await
            .context("Failed to get footer content")?
            .ok_or(FooterServiceError::NotFound)?;
        let _ = self.cache.set(CACHE_KEY_FOOTER, &footer, self.cache_ttl).await;
        Ok(footer)
    }

    pub async fn update(
        &self,
        input: UpdateFooterInput,
    ) -> Result<FooterContent, FooterServiceError> {
        let footer = self
            .repo
            .update(&input.normalized())
            .await
            .context("Failed to update footer content")?;

        if let Err(e) = self.cache.delete(CACHE_KEY_FOOTER).await {
            tracing::warn!("Failed to invalidate footer cache: {}", e);
        }
        self.feed
            .publish(Table::FooterContent, ChangeOp::Update, footer.id);
        Ok(footer)
    }

    /// The footer as visitors see it
    pub async fn view(&self) -> Result<FooterView, FooterServiceError> {
        let visibility = self.visibility.current();
        let footer = match self.get().await {
            Ok(footer) => Some(footer),
            Err(FooterServiceError::NotFound) => None,
            Err(e) => return Err(e),
        };

        let about = visibility.about.then(|| {
            footer
                .as_ref()
                .map(|f| f.about_text.trim())
                .filter(|text| !text.is_empty())
                .unwrap_or(DEFAULT_ABOUT_TEXT)
                .to_string()
        });

        let quick_links = visibility.quick_links.then(|| {
            let mut links = vec![NavLink::to("Blog", "/blog")];
            if visibility.about {
                links.push(NavLink::to("About", "/about"));
            }
            if visibility.contact {
                links.push(NavLink::to("Contact", "/contact"));
            }
            links
        });

        let contact = visibility.contact.then(|| match &footer {
            Some(f) => ContactBlock {
                email: f.contact_email.clone(),
                phone: f.contact_phone.clone(),
                address: f.contact_address.clone(),
            },
            None => ContactBlock {
                email: String::new(),
                phone: String::new(),
                address: String::new(),
            },
        });

        let social = visibility.social.then(|| {
            footer
                .as_ref()
                .map(|f| {
                    [
                        ("facebook", &f.social_facebook),
                        ("twitter", &f.social_twitter),
                        ("instagram", &f.social_instagram),
                    ]
                    .into_iter()
                    .filter_map(|(network, url)| {
                        url.clone().map(|url| SocialLink { network, url })
                    })
                    .collect()
                })
                .unwrap_or_default()
        });

        Ok(FooterView {
            about,
            quick_links,
            contact,
            social,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::{SqlxFooterRepository, SqlxSettingsRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Section, VisibilityState};
    use crate::services::visibility::VisibilityStore;

    async fn setup() -> (FooterService, Arc<VisibilityStore>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let store = Arc::new(VisibilityStore::new(SqlxSettingsRepository::boxed(
            pool.clone(),
        )));
        let view = Arc::new(VisibilityView::attach(&store).await);
        let service = FooterService::new(
            SqlxFooterRepository::boxed(pool),
            view,
            Arc::new(MemoryCache::new()),
            ChangeFeed::new(),
        );
        (service, store)
    }

    #[tokio::test]
    async fn test_empty_about_falls_back_to_default() {
        let (service, _) = setup().await;
        let view = service.view().await.unwrap();
        assert_eq!(view.about.as_deref(), Some(DEFAULT_ABOUT_TEXT));
        assert_eq!(view.social, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_update_normalizes_and_refreshes_view() {
        let (service, _) = setup().await;
        service.view().await.unwrap();

        service
            .update(UpdateFooterInput {
                about_text: "  Saint Anne parish  ".to_string(),
                contact_email: "office@parish.test".to_string(),
                social_instagram: Some(" https://instagram.com/parish ".to_string()),
                social_facebook: Some("  ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let view = service.view().await.unwrap();
        assert_eq!(view.about.as_deref(), Some("Saint Anne parish"));
        assert_eq!(view.contact.unwrap().email, "office@parish.test");
        assert_eq!(
            view.social.unwrap(),
            vec![SocialLink {
                network: "instagram",
                url: "https://instagram.com/parish".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_hidden_sections_are_omitted() {
        let (service, store) = setup().await;
        store
            .set(
                VisibilityState::default()
                    .with(Section::Contact, false)
                    .with(Section::Social, false),
            )
            .await
            .unwrap();

        let view = service.view().await.unwrap();
        assert!(view.about.is_some());
        assert!(view.contact.is_none());
        assert!(view.social.is_none());

        let links = view.quick_links.unwrap();
        let hrefs: Vec<&str> = links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(hrefs, vec!["/blog", "/about"]);
    }
}
