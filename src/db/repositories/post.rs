//! Post repository
//!
//! Public listings only ever see published posts; the admin listing sees
//! everything and resolves each post's category name.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{Post, PostRow, MISSING_CATEGORY_LABEL};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Filter for the public post listing
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishedFilter {
    pub category_id: Option<i64>,
    pub limit: Option<i64>,
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: &Post) -> Result<Post>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Published posts, newest `date` first
    async fn list_published(&self, filter: PublishedFilter) -> Result<Vec<Post>>;

    /// Every post, newest `created_at` first, optionally filtered by a
    /// case-insensitive title search
    async fn list_all(&self, title_query: Option<&str>) -> Result<Vec<PostRow>>;

    /// Published posts sharing `category_id`, excluding `exclude_id`
    async fn related(&self, category_id: i64, exclude_id: i64, limit: i64) -> Result<Vec<Post>>;

    /// Overwrite all editable fields. Returns `None` if the post is gone.
    async fn update(&self, post: &Post) -> Result<Option<Post>>;

    async fn set_published(&self, id: i64, published: bool) -> Result<bool>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_COLUMNS: &str = "p.id, p.title, p.content, p.published, p.date, p.author, p.image, \
                            p.category_id, p.created_at, p.updated_at";

fn published_sql(filter: &PublishedFilter) -> String {
    let mut sql = format!("SELECT {} FROM posts p WHERE p.published = TRUE", POST_COLUMNS);
    if filter.category_id.is_some() {
        sql.push_str(" AND p.category_id = ?");
    }
    sql.push_str(" ORDER BY p.date DESC, p.id DESC");
    if filter.limit.is_some() {
        sql.push_str(" LIMIT ?");
    }
    sql
}

fn list_all_sql(title_query: Option<&str>) -> String {
    let mut sql = format!(
        "SELECT {}, c.name AS category_name FROM posts p \
         LEFT JOIN categories c ON c.id = p.category_id",
        POST_COLUMNS
    );
    if title_query.is_some() {
        sql.push_str(" WHERE LOWER(p.title) LIKE ? ESCAPE '!'");
    }
    sql.push_str(" ORDER BY p.created_at DESC, p.id DESC");
    sql
}

/// Substring pattern with `!`, `%` and `_` matched literally
fn like_pattern(query: &str) -> String {
    let mut pattern = String::from("%");
    for c in query.trim().to_lowercase().chars() {
        if matches!(c, '!' | '%' | '_') {
            pattern.push('!');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

const RELATED_SQL: &str = "SELECT p.id, p.title, p.content, p.published, p.date, p.author, \
     p.image, p.category_id, p.created_at, p.updated_at FROM posts p \
     WHERE p.published = TRUE AND p.category_id = ? AND p.id <> ? \
     ORDER BY p.date DESC, p.id DESC LIMIT ?";

const UPDATE_SQL: &str = "UPDATE posts SET title = ?, content = ?, published = ?, date = ?, \
     author = ?, image = ?, category_id = ?, updated_at = ? WHERE id = ?";

const INSERT_SQL: &str = "INSERT INTO posts (title, content, published, date, author, image, \
     category_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        let now = Utc::now();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(INSERT_SQL)
                .bind(&post.title)
                .bind(&post.content)
                .bind(post.published)
                .bind(post.date)
                .bind(&post.author)
                .bind(&post.image)
                .bind(post.category_id)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create post")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(INSERT_SQL)
                .bind(&post.title)
                .bind(&post.content)
                .bind(post.published)
                .bind(post.date)
                .bind(&post.author)
                .bind(&post.image)
                .bind(post.category_id)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create post")?
                .last_insert_id() as i64,
        };

        Ok(Post {
            id,
            created_at: now,
            updated_at: now,
            ..post.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts p WHERE p.id = ?", POST_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get post by ID")?;
                row.map(|r| row_to_post_sqlite(&r)).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get post by ID")?;
                row.map(|r| row_to_post_mysql(&r)).transpose()
            }
        }
    }

    async fn list_published(&self, filter: PublishedFilter) -> Result<Vec<Post>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_published_sqlite(pool, &filter).await,
            Backend::Mysql(pool) => list_published_mysql(pool, &filter).await,
        }
    }

    async fn list_all(&self, title_query: Option<&str>) -> Result<Vec<PostRow>> {
        let title_query = title_query.filter(|q| !q.trim().is_empty());
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_all_sqlite(pool, title_query).await,
            Backend::Mysql(pool) => list_all_mysql(pool, title_query).await,
        }
    }

    async fn related(&self, category_id: i64, exclude_id: i64, limit: i64) -> Result<Vec<Post>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(RELATED_SQL)
                    .bind(category_id)
                    .bind(exclude_id)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list related posts")?;
                rows.iter().map(row_to_post_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(RELATED_SQL)
                    .bind(category_id)
                    .bind(exclude_id)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                    .context("Failed to list related posts")?;
                rows.iter().map(row_to_post_mysql).collect()
            }
        }
    }

    async fn update(&self, post: &Post) -> Result<Option<Post>> {
        let now = Utc::now();
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(UPDATE_SQL)
                    .bind(&post.title)
                    .bind(&post.content)
                    .bind(post.published)
                    .bind(post.date)
                    .bind(&post.author)
                    .bind(&post.image)
                    .bind(post.category_id)
                    .bind(now)
                    .bind(post.id)
                    .execute(pool)
                    .await
                    .context("Failed to update post")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(UPDATE_SQL)
                    .bind(&post.title)
                    .bind(&post.content)
                    .bind(post.published)
                    .bind(post.date)
                    .bind(&post.author)
                    .bind(&post.image)
                    .bind(post.category_id)
                    .bind(now)
                    .bind(post.id)
                    .execute(pool)
                    .await
                    .context("Failed to update post")?;
            }
        }
        self.get_by_id(post.id).await
    }

    async fn set_published(&self, id: i64, published: bool) -> Result<bool> {
        let sql = "UPDATE posts SET published = ?, updated_at = ? WHERE id = ?";
        let now = Utc::now();
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(published)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to set post published flag")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(published)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to set post published flag")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM posts WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete post")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_published_sqlite(pool: &SqlitePool, filter: &PublishedFilter) -> Result<Vec<Post>> {
    let sql = published_sql(filter);
    let mut query = sqlx::query(&sql);
    if let Some(category_id) = filter.category_id {
        query = query.bind(category_id);
    }
    if let Some(limit) = filter.limit {
        query = query.bind(limit);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list published posts")?;
    rows.iter().map(row_to_post_sqlite).collect()
}

async fn list_all_sqlite(pool: &SqlitePool, title_query: Option<&str>) -> Result<Vec<PostRow>> {
    let sql = list_all_sql(title_query);
    let mut query = sqlx::query(&sql);
    if let Some(q) = title_query {
        query = query.bind(like_pattern(q));
    }

    let rows = query.fetch_all(pool).await.context("Failed to list posts")?;
    rows.iter()
        .map(|row| {
            let category_name: Option<String> = row.try_get("category_name")?;
            Ok(PostRow {
                post: row_to_post_sqlite(row)?,
                category_name: category_name
                    .unwrap_or_else(|| MISSING_CATEGORY_LABEL.to_string()),
            })
        })
        .collect()
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        published: row.try_get("published")?,
        date: row.try_get("date")?,
        author: row.try_get("author")?,
        image: row.try_get("image")?,
        category_id: row.try_get("category_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn list_published_mysql(pool: &MySqlPool, filter: &PublishedFilter) -> Result<Vec<Post>> {
    let sql = published_sql(filter);
    let mut query = sqlx::query(&sql);
    if let Some(category_id) = filter.category_id {
        query = query.bind(category_id);
    }
    if let Some(limit) = filter.limit {
        query = query.bind(limit);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list published posts")?;
    rows.iter().map(row_to_post_mysql).collect()
}

async fn list_all_mysql(pool: &MySqlPool, title_query: Option<&str>) -> Result<Vec<PostRow>> {
    let sql = list_all_sql(title_query);
    let mut query = sqlx::query(&sql);
    if let Some(q) = title_query {
        query = query.bind(like_pattern(q));
    }

    let rows = query.fetch_all(pool).await.context("Failed to list posts")?;
    rows.iter()
        .map(|row| {
            let category_name: Option<String> = row.try_get("category_name")?;
            Ok(PostRow {
                post: row_to_post_mysql(row)?,
                category_name: category_name
                    .unwrap_or_else(|| MISSING_CATEGORY_LABEL.to_string()),
            })
        })
        .collect()
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        published: row.try_get("published")?,
        date: row.try_get("date")?,
        author: row.try_get("author")?,
        image: row.try_get("image")?,
        category_id: row.try_get("category_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{CategoryRepository, SqlxCategoryRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::Category;
    use chrono::{Duration, TimeZone};

    async fn setup() -> (DynDatabasePool, SqlxPostRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (pool.clone(), SqlxPostRepository::new(pool))
    }

    fn draft(title: &str, published: bool, days_ago: i64, category_id: Option<i64>) -> Post {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        Post {
            id: 0,
            title: title.to_string(),
            content: "<p>Blessed is the one</p>".to_string(),
            published,
            date: base - Duration::days(days_ago),
            author: "Editor".to_string(),
            image: None,
            category_id,
            created_at: base,
            updated_at: base,
        }
    }

    #[tokio::test]
    async fn test_list_published_excludes_drafts_and_orders_by_date() {
        let (_, repo) = setup().await;
        repo.create(&draft("Older", true, 5, None)).await.unwrap();
        repo.create(&draft("Newer", true, 1, None)).await.unwrap();
        repo.create(&draft("Draft", false, 0, None)).await.unwrap();

        let titles: Vec<String> = repo
            .list_published(PublishedFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["Newer", "Older"]);
    }

    #[tokio::test]
    async fn test_list_published_filters_by_category_and_limit() {
        let (pool, repo) = setup().await;
        let cat = SqlxCategoryRepository::new(pool)
            .create(&Category::new("Psalms".into()))
            .await
            .unwrap();

        repo.create(&draft("A", true, 3, Some(cat.id))).await.unwrap();
        repo.create(&draft("B", true, 2, Some(cat.id))).await.unwrap();
        repo.create(&draft("C", true, 1, None)).await.unwrap();

        let in_cat = repo
            .list_published(PublishedFilter {
                category_id: Some(cat.id),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(in_cat.len(), 2);

        let limited = repo
            .list_published(PublishedFilter {
                category_id: None,
                limit: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].title, "C");
    }

    #[tokio::test]
    async fn test_list_all_resolves_category_name_or_placeholder() {
        let (pool, repo) = setup().await;
        let categories = SqlxCategoryRepository::new(pool);
        let cat = categories.create(&Category::new("Prayer".into())).await.unwrap();

        repo.create(&draft("Morning Prayer", false, 0, Some(cat.id))).await.unwrap();
        repo.create(&draft("Loose", true, 0, None)).await.unwrap();

        let rows = repo.list_all(None).await.unwrap();
        assert_eq!(rows.len(), 2);
        let named = rows.iter().find(|r| r.post.title == "Morning Prayer").unwrap();
        assert_eq!(named.category_name, "Prayer");

        categories.delete(cat.id).await.unwrap();
        let rows = repo.list_all(None).await.unwrap();
        assert!(rows.iter().all(|r| r.category_name == MISSING_CATEGORY_LABEL));
        assert!(rows.iter().all(|r| r.post.category_id.is_none()));
    }

    #[tokio::test]
    async fn test_list_all_title_search_is_case_insensitive() {
        let (_, repo) = setup().await;
        repo.create(&draft("Psalm 23", true, 0, None)).await.unwrap();
        repo.create(&draft("Lament", true, 0, None)).await.unwrap();

        let rows = repo.list_all(Some("PSALM")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].post.title, "Psalm 23");

        assert_eq!(repo.list_all(Some("  ")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_all_title_search_matches_wildcards_literally() {
        let (_, repo) = setup().await;
        repo.create(&draft("100% Grace", true, 0, None)).await.unwrap();
        repo.create(&draft("snake_case notes", true, 0, None)).await.unwrap();
        repo.create(&draft("Plain", true, 0, None)).await.unwrap();

        let titles = |rows: Vec<PostRow>| -> Vec<String> {
            rows.into_iter().map(|r| r.post.title).collect()
        };
        assert_eq!(titles(repo.list_all(Some("_")).await.unwrap()), vec!["snake_case notes"]);
        assert_eq!(titles(repo.list_all(Some("100%")).await.unwrap()), vec!["100% Grace"]);
        assert_eq!(repo.list_all(Some("%")).await.unwrap().len(), 1);
        assert!(repo.list_all(Some("!")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_toggle_and_delete() {
        let (_, repo) = setup().await;
        let created = repo.create(&draft("Title", false, 0, None)).await.unwrap();

        let mut edited = created.clone();
        edited.title = "Edited".to_string();
        let updated = repo.update(&edited).await.unwrap().unwrap();
        assert_eq!(updated.title, "Edited");

        assert!(repo.set_published(created.id, true).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().unwrap().published);

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(!repo.set_published(created.id, false).await.unwrap());
    }

    #[tokio::test]
    async fn test_related_excludes_self_and_drafts() {
        let (pool, repo) = setup().await;
        let cat = SqlxCategoryRepository::new(pool)
            .create(&Category::new("Hymns".into()))
            .await
            .unwrap();

        let main = repo.create(&draft("Main", true, 0, Some(cat.id))).await.unwrap();
        repo.create(&draft("Sibling", true, 1, Some(cat.id))).await.unwrap();
        repo.create(&draft("Hidden", false, 1, Some(cat.id))).await.unwrap();
        repo.create(&draft("Elsewhere", true, 1, None)).await.unwrap();

        let related = repo.related(cat.id, main.id, 5).await.unwrap();
        let titles: Vec<&str> = related.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Sibling"]);
    }
}
