//! Page service

use crate::cache::{CacheLayer, SharedCache};
use crate::db::repositories::PageRepository;
use crate::models::{Page, UpdatePageInput};
use crate::services::realtime::{ChangeFeed, ChangeOp, Table};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

const PAGE_CACHE_TTL_SECS: u64 = 3600;
const CACHE_KEY_PAGE_BY_SLUG: &str = "page:slug:";

#[derive(Debug, thiserror::Error)]
pub enum PageServiceError {
    #[error("Page not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PageService {
    repo: Arc<dyn PageRepository>,
    cache: SharedCache,
    feed: ChangeFeed,
    cache_ttl: Duration,
}

impl PageService {
    pub fn new(repo: Arc<dyn PageRepository>, cache: SharedCache, feed: ChangeFeed) -> Self {
        Self {
            repo,
            cache,
            feed,
            cache_ttl: Duration::from_secs(PAGE_CACHE_TTL_SECS),
        }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Page, PageServiceError> {
        let key = format!("{}{}", CACHE_KEY_PAGE_BY_SLUG, slug);
        if let Some(page) = self.cache.get::<Page>(&key).await.ok().flatten() {
            return Ok(page);
        }

        let page = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get page")?
            .ok_or_else(|| PageServiceError::NotFound(slug.to_string()))?;
        let _ = self.cache.set(&key, &page, self.cache_ttl).await;
        Ok(page)
    }

    pub async fn list(&self) -> Result<Vec<Page>, PageServiceError> {
        Ok(self.repo.list().await.context("Failed to list pages")?)
    }

    /// Replace a page's content. The title is kept unless a new one is given.
    pub async fn update(
        &self,
        slug: &str,
        input: UpdatePageInput,
    ) -> Result<Page, PageServiceError> {
        let current = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get page")?
            .ok_or_else(|| PageServiceError::NotFound(slug.to_string()))?;

        let title = input
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or(current.title);

        let page = self
            .repo
            .update_by_slug(slug, &title, &input.content)
            .await
            .context("Failed to update page")?
            .ok_or_else(|| PageServiceError::NotFound(slug.to_string()))?;

        if let Err(e) = self
            .cache
            .delete(&format!("{}{}", CACHE_KEY_PAGE_BY_SLUG, slug))
            .await
        {
            tracing::warn!("Failed to invalidate page cache: {}", e);
        }
        self.feed.publish(Table::Pages, ChangeOp::Update, page.id);
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxPageRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{ABOUT_SLUG, CONTACT_SLUG};

    async fn setup() -> (PageService, ChangeFeed) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let feed = ChangeFeed::new();
        let service = PageService::new(
            SqlxPageRepository::boxed(pool),
            Arc::new(MemoryCache::new()),
            feed.clone(),
        );
        (service, feed)
    }

    #[tokio::test]
    async fn test_seeded_pages_exist() {
        let (service, _) = setup().await;
        assert_eq!(service.get_by_slug(ABOUT_SLUG).await.unwrap().slug, "about");
        assert_eq!(service.get_by_slug(CONTACT_SLUG).await.unwrap().slug, "contact");
        assert_eq!(service.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_title_and_refreshes_cache() {
        let (service, feed) = setup().await;
        let before = service.get_by_slug(ABOUT_SLUG).await.unwrap();
        let mut changes = feed.subscribe(Table::Pages);

        let updated = service
            .update(
                ABOUT_SLUG,
                UpdatePageInput {
                    title: None,
                    content: "<p>We gather to pray.</p>".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, before.title);
        assert!(updated.last_updated >= before.last_updated);

        assert_eq!(
            service.get_by_slug(ABOUT_SLUG).await.unwrap().content,
            "<p>We gather to pray.</p>"
        );
        assert_eq!(changes.recv().await.unwrap().id, before.id);
    }

    #[tokio::test]
    async fn test_unknown_slug() {
        let (service, _) = setup().await;
        assert!(matches!(
            service.get_by_slug("missing").await,
            Err(PageServiceError::NotFound(_))
        ));
        assert!(matches!(
            service
                .update(
                    "missing",
                    UpdatePageInput {
                        title: Some("Missing".to_string()),
                        content: String::new(),
                    }
                )
                .await,
            Err(PageServiceError::NotFound(_))
        ));
    }
}
