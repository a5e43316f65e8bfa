//! Session repository
//!
//! A session row is keyed by its bearer token. Expired rows are purged by
//! the periodic cleanup task.

use crate::db::{Backend, DynDatabasePool};
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get a session by token, expired or not
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Move a session's expiry. Returns false if the token is unknown.
    async fn extend(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool>;

    /// Delete a session. Unknown tokens are ignored.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete every expired session and return how many were removed
    async fn delete_expired(&self) -> Result<i64>;
}

/// SQLx-based session repository for SQLite and MySQL
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => create_session_sqlite(pool, session).await,
            Backend::Mysql(pool) => create_session_mysql(pool, session).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_session_sqlite(pool, id).await,
            Backend::Mysql(pool) => get_session_mysql(pool, id).await,
        }
    }

    async fn extend(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        let query = "UPDATE sessions SET expires_at = ? WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(query)
                .bind(expires_at)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to extend session")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(query)
                .bind(expires_at)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to extend session")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let query = "DELETE FROM sessions WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(query)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to delete session")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(query)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to delete session")?;
            }
        }
        Ok(())
    }

    async fn delete_expired(&self) -> Result<i64> {
        let query = "DELETE FROM sessions WHERE expires_at < ?";
        let now = Utc::now();
        let removed = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(query)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(query)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to delete expired sessions")?
                .rows_affected(),
        };
        Ok(removed as i64)
    }
}

const SELECT_SESSION: &str = "SELECT id, user_id, expires_at, created_at FROM sessions";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_SESSION))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session")?;

    row.map(|r| row_to_session_sqlite(&r)).transpose()
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Session>> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_SESSION))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get session")?;

    row.map(|r| row_to_session_mysql(&r)).transpose()
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;
    use chrono::Duration;

    async fn setup_test_repo() -> (SqlxSessionRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new("reader@example.com".to_string(), "hash".to_string(), None))
            .await
            .expect("Failed to create user");
        (SqlxSessionRepository::new(pool), user.id)
    }

    fn session(id: &str, user_id: i64, expires_in: Duration) -> Session {
        let now = Utc::now();
        Session {
            id: id.to_string(),
            user_id,
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_session() {
        let (repo, user_id) = setup_test_repo().await;
        let created = repo
            .create(&session("token-1", user_id, Duration::days(7)))
            .await
            .expect("Failed to create session");

        let found = repo.get_by_id("token-1").await.unwrap().unwrap();
        assert_eq!(found.user_id, user_id);
        assert_eq!(found.expires_at.timestamp(), created.expires_at.timestamp());
        assert!(!found.is_expired());
    }

    #[tokio::test]
    async fn test_get_session_by_id_not_found() {
        let (repo, _) = setup_test_repo().await;
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_extend_session() {
        let (repo, user_id) = setup_test_repo().await;
        let original = repo
            .create(&session("token-1", user_id, Duration::hours(1)))
            .await
            .unwrap();

        let later = original.expires_at + Duration::days(7);
        assert!(repo.extend("token-1", later).await.unwrap());
        let found = repo.get_by_id("token-1").await.unwrap().unwrap();
        assert_eq!(found.expires_at.timestamp(), later.timestamp());

        assert!(!repo.extend("missing", later).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (repo, user_id) = setup_test_repo().await;
        repo.create(&session("token-1", user_id, Duration::days(7)))
            .await
            .unwrap();

        repo.delete("token-1").await.unwrap();
        assert!(repo.get_by_id("token-1").await.unwrap().is_none());

        // Unknown tokens are fine
        repo.delete("token-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let (repo, user_id) = setup_test_repo().await;
        repo.create(&session("old-1", user_id, Duration::hours(-2)))
            .await
            .unwrap();
        repo.create(&session("old-2", user_id, Duration::minutes(-1)))
            .await
            .unwrap();
        repo.create(&session("live", user_id, Duration::days(1)))
            .await
            .unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 2);
        assert!(repo.get_by_id("old-1").await.unwrap().is_none());
        assert!(repo.get_by_id("live").await.unwrap().is_some());
        assert_eq!(repo.delete_expired().await.unwrap(), 0);
    }
}
