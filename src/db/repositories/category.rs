//! Category repository
//!
//! Categories are a flat list ordered by name. Deleting one leaves its posts
//! in place with a NULL `category_id`.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &Category) -> Result<Category>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// All categories ordered by name
    async fn list(&self) -> Result<Vec<Category>>;

    /// Rename a category. Returns `None` if it does not exist.
    async fn rename(&self, id: i64, name: &str) -> Result<Option<Category>>;

    /// Returns false if nothing was deleted
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        let now = Utc::now();
        let query = "INSERT INTO categories (name, created_at) VALUES (?, ?)";
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(query)
                .bind(&category.name)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create category")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(query)
                .bind(&category.name)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create category")?
                .last_insert_id() as i64,
        };

        Ok(Category {
            id,
            name: category.name.clone(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_by_id_mysql(pool, id).await,
        }
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_by_name_sqlite(pool, name).await,
            Backend::Mysql(pool) => get_by_name_mysql(pool, name).await,
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_sqlite(pool).await,
            Backend::Mysql(pool) => list_mysql(pool).await,
        }
    }

    async fn rename(&self, id: i64, name: &str) -> Result<Option<Category>> {
        // MySQL reports zero affected rows for an unchanged name, so existence
        // is decided by re-reading rather than by the row count.
        let query = "UPDATE categories SET name = ? WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(query)
                    .bind(name)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to rename category")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(query)
                    .bind(name)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to rename category")?;
            }
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let query = "DELETE FROM categories WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(query)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete category")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(query)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete category")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, created_at FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;
    row.map(|r| row_to_category_sqlite(&r)).transpose()
}

async fn get_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, created_at FROM categories WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by name")?;
    row.map(|r| row_to_category_sqlite(&r)).transpose()
}

async fn list_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name, created_at FROM categories ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;
    rows.iter().map(row_to_category_sqlite).collect()
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, created_at FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;
    row.map(|r| row_to_category_mysql(&r)).transpose()
}

async fn get_by_name_mysql(pool: &MySqlPool, name: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, created_at FROM categories WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by name")?;
    row.map(|r| row_to_category_mysql(&r)).transpose()
}

async fn list_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name, created_at FROM categories ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;
    rows.iter().map(row_to_category_mysql).collect()
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}
