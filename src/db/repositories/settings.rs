//! Settings repository
//!
//! Key/value storage for site-wide settings such as section visibility and
//! the colour theme. Values are opaque strings, usually JSON.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::db::{Backend, DynDatabasePool};

#[derive(Debug, Clone)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Setting>>;

    /// Insert or replace a setting
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

pub struct SqlxSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxSettingsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<Setting>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_sqlite(pool, key).await,
            Backend::Mysql(pool) => get_mysql(pool, key).await,
        }
        .with_context(|| format!("Failed to read setting: {}", key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => set_sqlite(pool, key, value).await,
            Backend::Mysql(pool) => set_mysql(pool, key, value).await,
        }
        .with_context(|| format!("Failed to write setting: {}", key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query("DELETE FROM settings WHERE key = ?")
                    .bind(key)
                    .execute(pool)
                    .await?;
            }
            Backend::Mysql(pool) => {
                sqlx::query("DELETE FROM settings WHERE `key` = ?")
                    .bind(key)
                    .execute(pool)
                    .await?;
            }
        }
        Ok(())
    }
}

// SQLite implementations
async fn get_sqlite(pool: &SqlitePool, key: &str) -> Result<Option<Setting>> {
    let row = sqlx::query("SELECT key, value, updated_at FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    row.map(|r| {
        Ok(Setting {
            key: r.try_get("key")?,
            value: r.try_get("value")?,
            updated_at: r.try_get("updated_at")?,
        })
    })
    .transpose()
}

async fn set_sqlite(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

// MySQL implementations
async fn get_mysql(pool: &MySqlPool, key: &str) -> Result<Option<Setting>> {
    let row = sqlx::query("SELECT `key`, value, updated_at FROM settings WHERE `key` = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    row.map(|r| {
        Ok(Setting {
            key: r.try_get("key")?,
            value: r.try_get("value")?,
            updated_at: r.try_get("updated_at")?,
        })
    })
    .transpose()
}

async fn set_mysql(pool: &MySqlPool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (`key`, value) VALUES (?, ?)
         ON DUPLICATE KEY UPDATE value = VALUES(value)",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}
