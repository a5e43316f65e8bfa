//! Page repository
//!
//! Static pages are addressed by slug. `about` and `contact` are seeded by
//! the migrations and edited in place.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Page;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>>;

    async fn list(&self) -> Result<Vec<Page>>;

    /// Replace a page's title and content, stamping `last_updated`.
    /// Returns `None` if no page has that slug.
    async fn update_by_slug(&self, slug: &str, title: &str, content: &str)
        -> Result<Option<Page>>;
}

pub struct SqlxPageRepository {
    pool: DynDatabasePool,
}

impl SqlxPageRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PageRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_PAGE: &str = "SELECT id, slug, title, content, last_updated, created_at FROM pages";

#[async_trait]
impl PageRepository for SqlxPageRepository {
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Page>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_by_slug_sqlite(pool, slug).await,
            Backend::Mysql(pool) => get_by_slug_mysql(pool, slug).await,
        }
    }

    async fn list(&self) -> Result<Vec<Page>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_sqlite(pool).await,
            Backend::Mysql(pool) => list_mysql(pool).await,
        }
    }

    async fn update_by_slug(
        &self,
        slug: &str,
        title: &str,
        content: &str,
    ) -> Result<Option<Page>> {
        let sql = "UPDATE pages SET title = ?, content = ?, last_updated = ? WHERE slug = ?";
        let now = Utc::now();
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(title)
                    .bind(content)
                    .bind(now)
                    .bind(slug)
                    .execute(pool)
                    .await
                    .context("Failed to update page")?;
                get_by_slug_sqlite(pool, slug).await
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(title)
                    .bind(content)
                    .bind(now)
                    .bind(slug)
                    .execute(pool)
                    .await
                    .context("Failed to update page")?;
                get_by_slug_mysql(pool, slug).await
            }
        }
    }
}

// SQLite implementations
async fn get_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Page>> {
    let row = sqlx::query(&format!("{} WHERE slug = ?", SELECT_PAGE))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get page by slug")?;
    row.map(|r| row_to_page_sqlite(&r)).transpose()
}

async fn list_sqlite(pool: &SqlitePool) -> Result<Vec<Page>> {
    let rows = sqlx::query(&format!("{} ORDER BY slug", SELECT_PAGE))
        .fetch_all(pool)
        .await
        .context("Failed to list pages")?;
    rows.iter().map(row_to_page_sqlite).collect()
}

fn row_to_page_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Page> {
    Ok(Page {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        last_updated: row.try_get("last_updated")?,
        created_at: row.try_get("created_at")?,
    })
}

// MySQL implementations
async fn get_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Page>> {
    let row = sqlx::query(&format!("{} WHERE slug = ?", SELECT_PAGE))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get page by slug")?;
    row.map(|r| row_to_page_mysql(&r)).transpose()
}

async fn list_mysql(pool: &MySqlPool) -> Result<Vec<Page>> {
    let rows = sqlx::query(&format!("{} ORDER BY slug", SELECT_PAGE))
        .fetch_all(pool)
        .await
        .context("Failed to list pages")?;
    rows.iter().map(row_to_page_mysql).collect()
}

fn row_to_page_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Page> {
    Ok(Page {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        last_updated: row.try_get("last_updated")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::{ABOUT_SLUG, CONTACT_SLUG};

    async fn setup_test_repo() -> SqlxPageRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxPageRepository::new(pool)
    }

    #[tokio::test]
    async fn test_seeded_pages_listed() {
        let repo = setup_test_repo().await;
        let slugs: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.slug).collect();
        assert_eq!(slugs, vec![ABOUT_SLUG, CONTACT_SLUG]);
    }

    #[tokio::test]
    async fn test_update_by_slug_stamps_last_updated() {
        let repo = setup_test_repo().await;
        let before = repo.get_by_slug(ABOUT_SLUG).await.unwrap().unwrap();

        let after = repo
            .update_by_slug(ABOUT_SLUG, "About us", "<p>We pray.</p>")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.title, "About us");
        assert_eq!(after.content, "<p>We pray.</p>");
        assert!(after.last_updated >= before.last_updated);
    }

    #[tokio::test]
    async fn test_update_unknown_slug() {
        let repo = setup_test_repo().await;
        assert!(repo.update_by_slug("faq", "FAQ", "").await.unwrap().is_none());
        assert!(repo.get_by_slug("faq").await.unwrap().is_none());
    }
}
