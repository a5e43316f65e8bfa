//! Category service
//!
//! The category list is read on nearly every public page (navigation, blog
//! filters), so it is cached and invalidated on every write.

use crate::cache::{CacheLayer, SharedCache};
use crate::db::repositories::CategoryRepository;
use crate::models::Category;
use crate::services::realtime::{ChangeFeed, ChangeOp, Table};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

const CATEGORY_CACHE_TTL_SECS: u64 = 3600;
const CACHE_KEY_CATEGORY_LIST: &str = "category:list";
const CACHE_KEY_CATEGORY_BY_ID: &str = "category:id:";

#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    #[error("Category name already exists: {0}")]
    DuplicateName(String),

    #[error("Category not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    cache: SharedCache,
    feed: ChangeFeed,
    cache_ttl: Duration,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, cache: SharedCache, feed: ChangeFeed) -> Self {
        Self {
            repo,
            cache,
            feed,
            cache_ttl: Duration::from_secs(CATEGORY_CACHE_TTL_SECS),
        }
    }

    /// All categories ordered by name
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        if let Some(list) = self
            .cache
            .get::<Vec<Category>>(CACHE_KEY_CATEGORY_LIST)
            .await
            .ok()
            .flatten()
        {
            return Ok(list);
        }

        let list = self.repo.list().await.context("Failed to list categories")?;
        let _ = self
            .cache
            .set(CACHE_KEY_CATEGORY_LIST, &list, self.cache_ttl)
            .await;
        Ok(list)
    }

    pub async fn get(&self, id: i64) -> Result<Category, CategoryServiceError> {
        let key = format!("{}{}", CACHE_KEY_CATEGORY_BY_ID, id);
        if let Some(category) = self.cache.get::<Category>(&key).await.ok().flatten() {
            return Ok(category);
        }

        let category = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or(CategoryServiceError::NotFound(id))?;
        let _ = self.cache.set(&key, &category, self.cache_ttl).await;
        Ok(category)
    }

    /// Create a category from a trimmed, non-empty, unused name
    pub async fn create(&self, name: &str) -> Result<Category, CategoryServiceError> {
        let name = self.validate_name(name, None).await?;
        let category = self
            .repo
            .create(&Category::new(name))
            .await
            .context("Failed to create category")?;

        self.after_write(ChangeOp::Insert, category.id).await;
        tracing::info!("Category created: {}", category.name);
        Ok(category)
    }

    pub async fn rename(&self, id: i64, name: &str) -> Result<Category, CategoryServiceError> {
        let name = self.validate_name(name, Some(id)).await?;
        let category = self
            .repo
            .rename(id, &name)
            .await
            .context("Failed to rename category")?
            .ok_or(CategoryServiceError::NotFound(id))?;

        self.after_write(ChangeOp::Update, id).await;
        Ok(category)
    }

    /// Delete a category. Its posts stay, uncategorized.
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        if !self
            .repo
            .delete(id)
            .await
            .context("Failed to delete category")?
        {
            return Err(CategoryServiceError::NotFound(id));
        }

        // Cached posts still carry the old category id
        if let Err(e) = self.cache.delete_pattern("post:*").await {
            tracing::warn!("Failed to invalidate post cache: {}", e);
        }
        self.after_write(ChangeOp::Delete, id).await;
        Ok(())
    }

    async fn validate_name(
        &self,
        name: &str,
        current_id: Option<i64>,
    ) -> Result<String, CategoryServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryServiceError::ValidationError(
                "Category name is required".to_string(),
            ));
        }

        if let Some(existing) = self
            .repo
            .get_by_name(name)
            .await
            .context("Failed to check category name")?
        {
            if Some(existing.id) != current_id {
                return Err(CategoryServiceError::DuplicateName(name.to_string()));
            }
        }
        Ok(name.to_string())
    }

    async fn after_write(&self, op: ChangeOp, id: i64) {
        if let Err(e) = self.cache.delete_pattern("category:*").await {
            tracing::warn!("Failed to invalidate category cache: {}", e);
        }
        self.feed.publish(Table::Categories, op, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (CategoryService, ChangeFeed) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let feed = ChangeFeed::new();
        let service = CategoryService::new(
            SqlxCategoryRepository::boxed(pool),
            Arc::new(MemoryCache::new()),
            feed.clone(),
        );
        (service, feed)
    }

    #[tokio::test]
    async fn test_create_trims_and_rejects_blank() {
        let (service, _) = setup().await;
        let created = service.create("  Psalms  ").await.unwrap();
        assert_eq!(created.name, "Psalms");

        assert!(matches!(
            service.create("   ").await,
            Err(CategoryServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate() {
        let (service, _) = setup().await;
        service.create("Psalms").await.unwrap();
        assert!(matches!(
            service.create("Psalms").await,
            Err(CategoryServiceError::DuplicateName(_))
        ));
    }

    #[tokio::test]
    async fn test_list_cache_invalidated_on_write() {
        let (service, _) = setup().await;
        service.create("Hymns").await.unwrap();
        assert_eq!(service.list().await.unwrap().len(), 1);

        service.create("Anthems").await.unwrap();
        let names: Vec<String> = service.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Anthems", "Hymns"]);
    }

    #[tokio::test]
    async fn test_rename_allows_same_name_for_same_category() {
        let (service, _) = setup().await;
        let cat = service.create("Prayer").await.unwrap();
        let other = service.create("Praise").await.unwrap();

        assert_eq!(service.rename(cat.id, "Prayer").await.unwrap().name, "Prayer");
        assert!(matches!(
            service.rename(other.id, "Prayer").await,
            Err(CategoryServiceError::DuplicateName(_))
        ));
        assert_eq!(service.get(cat.id).await.unwrap().name, "Prayer");
    }

    #[tokio::test]
    async fn test_delete_publishes_change() {
        let (service, feed) = setup().await;
        let cat = service.create("Prayer").await.unwrap();
        let mut changes = feed.subscribe(Table::Categories);

        service.delete(cat.id).await.unwrap();
        let event = changes.recv().await.unwrap();
        assert_eq!(event.op, ChangeOp::Delete);
        assert_eq!(event.id, cat.id);

        assert!(matches!(
            service.delete(cat.id).await,
            Err(CategoryServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.get(cat.id).await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }
}
