//! Post service
//!
//! Public readers only ever see published posts; the dashboard sees every
//! post with its category resolved.

use crate::cache::{CacheLayer, SharedCache};
use crate::db::repositories::{CategoryRepository, PostRepository, PublishedFilter};
use crate::models::{Post, PostRow, SavePostInput};
use crate::services::realtime::{ChangeFeed, ChangeOp, Table};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

const POST_CACHE_TTL_SECS: u64 = 600;
const CACHE_KEY_PUBLISHED_LIST: &str = "post:published:";
const CACHE_KEY_POST_BY_ID: &str = "post:id:";

/// Default number of related posts shown under an article
pub const DEFAULT_RELATED_LIMIT: i64 = 3;

#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    #[error("Post not found: {0}")]
    NotFound(i64),

    #[error("Category not found: {0}")]
    CategoryNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    cache: SharedCache,
    feed: ChangeFeed,
    cache_ttl: Duration,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        cache: SharedCache,
        feed: ChangeFeed,
    ) -> Self {
        Self {
            repo,
            categories,
            cache,
            feed,
            cache_ttl: Duration::from_secs(POST_CACHE_TTL_SECS),
        }
    }

    /// Published posts, newest first
    pub async fn list_published(
        &self,
        category_id: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Post>, PostServiceError> {
        let key = format!(
            "{}{}:{}",
            CACHE_KEY_PUBLISHED_LIST,
            category_id.map(|id| id.to_string()).unwrap_or_default(),
            limit.map(|l| l.to_string()).unwrap_or_default()
        );
        if let Some(posts) = self.cache.get::<Vec<Post>>(&key).await.ok().flatten() {
            return Ok(posts);
        }

        let posts = self
            .repo
            .list_published(PublishedFilter { category_id, limit })
            .await
            .context("Failed to list published posts")?;
        let _ = self.cache.set(&key, &posts, self.cache_ttl).await;
        Ok(posts)
    }

    /// A single published post. Drafts are reported as not found.
    pub async fn get_published(&self, id: i64) -> Result<Post, PostServiceError> {
        let post = self.get(id).await?;
        if !post.published {
            return Err(PostServiceError::NotFound(id));
        }
        Ok(post)
    }

    /// A post regardless of its publication state
    pub async fn get(&self, id: i64) -> Result<Post, PostServiceError> {
        let key = format!("{}{}", CACHE_KEY_POST_BY_ID, id);
        if let Some(post) = self.cache.get::<Post>(&key).await.ok().flatten() {
            return Ok(post);
        }

        let post = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound(id))?;
        let _ = self.cache.set(&key, &post, self.cache_ttl).await;
        Ok(post)
    }

    /// Dashboard listing with an optional title search
    pub async fn list_all(&self, query: Option<&str>) -> Result<Vec<PostRow>, PostServiceError> {
        Ok(self
            .repo
            .list_all(query)
            .await
            .context("Failed to list posts")?)
    }

    /// Create a post, or update post `id` when given
    pub async fn save(
        &self,
        id: Option<i64>,
        input: SavePostInput,
    ) -> Result<Post, PostServiceError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(PostServiceError::ValidationError(
                "Title is required".to_string(),
            ));
        }

        if let Some(category_id) = input.category_id {
            if self
                .categories
                .get_by_id(category_id)
                .await
                .context("Failed to check category")?
                .is_none()
            {
                return Err(PostServiceError::CategoryNotFound(category_id));
            }
        }

        let author = input.author.map(|a| a.trim().to_string()).unwrap_or_default();
        let image = input
            .image
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty());

        match id {
            Some(id) => {
                let existing = self
                    .repo
                    .get_by_id(id)
                    .await
                    .context("Failed to get post")?
                    .ok_or(PostServiceError::NotFound(id))?;
                let post = Post {
                    title,
                    content: input.content,
                    published: input.published,
                    date: input.date.unwrap_or(existing.date),
                    author,
                    image,
                    category_id: input.category_id,
                    ..existing
                };
                let updated = self
                    .repo
                    .update(&post)
                    .await
                    .context("Failed to update post")?
                    .ok_or(PostServiceError::NotFound(id))?;
                self.after_write(ChangeOp::Update, id).await;
                Ok(updated)
            }
            None => {
                let now = Utc::now();
                let post = Post {
                    id: 0,
                    title,
                    content: input.content,
                    published: input.published,
                    date: input.date.unwrap_or(now),
                    author,
                    image,
                    category_id: input.category_id,
                    created_at: now,
                    updated_at: now,
                };
                let created = self
                    .repo
                    .create(&post)
                    .await
                    .context("Failed to create post")?;
                self.after_write(ChangeOp::Insert, created.id).await;
                tracing::info!("Post created: {} ({})", created.title, created.id);
                Ok(created)
            }
        }
    }

    /// Flip the published flag and return the new state
    pub async fn toggle_publish(&self, id: i64) -> Result<bool, PostServiceError> {
        let post = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound(id))?;
        let published = !post.published;

        if !self
            .repo
            .set_published(id, published)
            .await
            .context("Failed to toggle publish state")?
        {
            return Err(PostServiceError::NotFound(id));
        }
        self.after_write(ChangeOp::Update, id).await;
        Ok(published)
    }

    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete post")? {
            return Err(PostServiceError::NotFound(id));
        }
        self.after_write(ChangeOp::Delete, id).await;
        Ok(())
    }

    /// Copy a post as an unpublished draft titled `"<title> (copy)"`
    pub async fn duplicate(&self, id: i64) -> Result<Post, PostServiceError> {
        let source = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound(id))?;

        let copy = Post {
            title: format!("{} (copy)", source.title),
            published: false,
            ..source
        };
        let created = self
            .repo
            .create(&copy)
            .await
            .context("Failed to duplicate post")?;
        self.after_write(ChangeOp::Insert, created.id).await;
        Ok(created)
    }

    /// Other published posts in the same category. Uncategorized posts have none.
    pub async fn related(&self, id: i64, limit: i64) -> Result<Vec<Post>, PostServiceError> {
        let post = self.get_published(id).await?;
        match post.category_id {
            Some(category_id) => Ok(self
                .repo
                .related(category_id, id, limit)
                .await
                .context("Failed to list related posts")?),
            None => Ok(Vec::new()),
        }
    }

    async fn after_write(&self, op: ChangeOp, id: i64) {
        if let Err(e) = self.cache.delete_pattern("post:*").await {
            tracing::warn!("Failed to invalidate post cache: {}", e);
        }
        self.feed.publish(Table::Posts, op, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::repositories::SqlxPostRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, MISSING_CATEGORY_LABEL};

    struct Fixture {
        service: PostService,
        categories: Arc<dyn CategoryRepository>,
        feed: ChangeFeed,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let feed = ChangeFeed::new();
        let service = PostService::new(
            SqlxPostRepository::boxed(pool),
            categories.clone(),
            Arc::new(MemoryCache::new()),
            feed.clone(),
        );
        Fixture {
            service,
            categories,
            feed,
        }
    }

    fn input(title: &str, published: bool) -> SavePostInput {
        SavePostInput {
            title: title.to_string(),
            content: "<p>Grace and peace</p>".to_string(),
            published,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_requires_title() {
        let f = setup().await;
        assert!(matches!(
            f.service.save(None, input("   ", true)).await,
            Err(PostServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_save_rejects_unknown_category() {
        let f = setup().await;
        let mut post = input("Lauds", true);
        post.category_id = Some(999);
        assert!(matches!(
            f.service.save(None, post).await,
            Err(PostServiceError::CategoryNotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_drafts_are_hidden_from_public_reads() {
        let f = setup().await;
        let published = f.service.save(None, input("Vespers", true)).await.unwrap();
        let draft = f.service.save(None, input("Compline", false)).await.unwrap();

        let listed = f.service.list_published(None, None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, published.id);

        assert!(matches!(
            f.service.get_published(draft.id).await,
            Err(PostServiceError::NotFound(_))
        ));
        assert_eq!(f.service.get(draft.id).await.unwrap().title, "Compline");
    }

    #[tokio::test]
    async fn test_update_invalidates_cached_post() {
        let f = setup().await;
        let post = f.service.save(None, input("Matins", true)).await.unwrap();
        assert_eq!(f.service.get_published(post.id).await.unwrap().title, "Matins");

        f.service
            .save(Some(post.id), input("Morning Prayer", true))
            .await
            .unwrap();
        assert_eq!(
            f.service.get_published(post.id).await.unwrap().title,
            "Morning Prayer"
        );
        assert_eq!(f.service.list_published(None, None).await.unwrap()[0].title, "Morning Prayer");
    }

    #[tokio::test]
    async fn test_toggle_publish_emits_update() {
        let f = setup().await;
        let post = f.service.save(None, input("Sext", false)).await.unwrap();
        let mut changes = f.feed.subscribe(Table::Posts);

        assert!(f.service.toggle_publish(post.id).await.unwrap());
        let event = changes.recv().await.unwrap();
        assert_eq!(event.op, ChangeOp::Update);
        assert_eq!(event.id, post.id);

        assert!(!f.service.toggle_publish(post.id).await.unwrap());
        assert!(matches!(
            f.service.toggle_publish(404).await,
            Err(PostServiceError::NotFound(404))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_is_unpublished_copy() {
        let f = setup().await;
        let post = f.service.save(None, input("Terce", true)).await.unwrap();

        let copy = f.service.duplicate(post.id).await.unwrap();
        assert_ne!(copy.id, post.id);
        assert_eq!(copy.title, "Terce (copy)");
        assert!(!copy.published);
        assert_eq!(copy.content, post.content);
    }

    #[tokio::test]
    async fn test_deleted_category_renders_placeholder() {
        let f = setup().await;
        let category = f
            .categories
            .create(&Category::new("Hours".to_string()))
            .await
            .unwrap();
        let mut post = input("None", true);
        post.category_id = Some(category.id);
        f.service.save(None, post).await.unwrap();

        assert_eq!(f.service.list_all(None).await.unwrap()[0].category_name, "Hours");
        f.categories.delete(category.id).await.unwrap();
        assert_eq!(
            f.service.list_all(None).await.unwrap()[0].category_name,
            MISSING_CATEGORY_LABEL
        );
    }

    #[tokio::test]
    async fn test_related_excludes_self_and_other_categories() {
        let f = setup().await;
        let hours = f
            .categories
            .create(&Category::new("Hours".to_string()))
            .await
            .unwrap();
        let psalms = f
            .categories
            .create(&Category::new("Psalms".to_string()))
            .await
            .unwrap();

        let mut ids = Vec::new();
        for (title, category) in [("Prime", hours.id), ("Nones", hours.id), ("Psalm 23", psalms.id)] {
            let mut post = input(title, true);
            post.category_id = Some(category);
            ids.push(f.service.save(None, post).await.unwrap().id);
        }

        let related = f.service.related(ids[0], DEFAULT_RELATED_LIMIT).await.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, ids[1]);
    }

    #[tokio::test]
    async fn test_delete_missing_post() {
        let f = setup().await;
        assert!(matches!(
            f.service.delete(7).await,
            Err(PostServiceError::NotFound(7))
        ));
    }
}
