//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::db::{Backend, DynDatabasePool};
use crate::models::Comment;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert an already-validated comment
    async fn create(&self, post_id: i64, author: &str, content: &str) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments on a post, oldest first
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, post_id: i64, author: &str, content: &str) -> Result<Comment> {
        let now = Utc::now();
        let sql = "INSERT INTO comments (post_id, author, content, created_at) VALUES (?, ?, ?, ?)";
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(post_id)
                .bind(author)
                .bind(content)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create comment")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(post_id)
                .bind(author)
                .bind(content)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create comment")?
                .last_insert_id() as i64,
        };

        Ok(Comment {
            id,
            post_id,
            author: author.to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_by_id_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_by_id_mysql(pool, id).await,
        }
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => list_for_post_sqlite(pool, post_id).await,
            Backend::Mysql(pool) => list_for_post_mysql(pool, post_id).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM comments WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to delete comment")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

const SELECT_COMMENT: &str = "SELECT id, post_id, author, content, created_at FROM comments";

// SQLite implementations
async fn get_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COMMENT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;
    row.map(|r| row_to_comment_sqlite(&r)).transpose()
}

async fn list_for_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<Comment>> {
    let rows = sqlx::query(&format!(
        "{} WHERE post_id = ? ORDER BY created_at ASC, id ASC",
        SELECT_COMMENT
    ))
    .bind(post_id)
    .fetch_all(pool)
    .await
    .context("Failed to list comments")?;
    rows.iter().map(row_to_comment_sqlite).collect()
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        author: row.try_get("author")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

// MySQL implementations
async fn get_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COMMENT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment")?;
    row.map(|r| row_to_comment_mysql(&r)).transpose()
}

async fn list_for_post_mysql(pool: &MySqlPool, post_id: i64) -> Result<Vec<Comment>> {
    let rows = sqlx::query(&format!(
        "{} WHERE post_id = ? ORDER BY created_at ASC, id ASC",
        SELECT_COMMENT
    ))
    .bind(post_id)
    .fetch_all(pool)
    .await
    .context("Failed to list comments")?;
    rows.iter().map(row_to_comment_mysql).collect()
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        author: row.try_get("author")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DynDatabasePool, SqlxCommentRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool.execute("INSERT INTO posts (id, title, content, author) VALUES (1, 'Psalm 1', '', 'Editor')")
            .await
            .expect("Failed to seed post");
        (pool.clone(), SqlxCommentRepository::new(pool))
    }

    #[tokio::test]
    async fn test_create_and_list_oldest_first() {
        let (_, repo) = setup().await;
        let first = repo.create(1, "Ann", "Amen").await.unwrap();
        let second = repo.create(1, "Ben", "Hallelujah").await.unwrap();

        let ids: Vec<i64> = repo.list_for_post(1).await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert!(repo.list_for_post(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comment_on_missing_post_fails() {
        let (_, repo) = setup().await;
        assert!(repo.create(99, "Ann", "Amen").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_comment_and_cascade() {
        let (pool, repo) = setup().await;
        let comment = repo.create(1, "Ann", "Amen").await.unwrap();
        assert!(repo.delete(comment.id).await.unwrap());
        assert!(repo.get_by_id(comment.id).await.unwrap().is_none());

        repo.create(1, "Ben", "Selah").await.unwrap();
        pool.execute("DELETE FROM posts WHERE id = 1").await.unwrap();
        assert!(repo.list_for_post(1).await.unwrap().is_empty());
    }
}
