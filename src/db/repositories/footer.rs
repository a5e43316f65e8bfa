//! Footer repository
//!
//! The footer is a single seeded row; reads take the lowest ID.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::db::{Backend, DynDatabasePool};
use crate::models::{FooterContent, UpdateFooterInput};

#[async_trait]
pub trait FooterRepository: Send + Sync {
    async fn get(&self) -> Result<Option<FooterContent>>;

    /// Overwrite the footer row, creating it if it was removed
    async fn update(&self, input: &UpdateFooterInput) -> Result<FooterContent>;
}

pub struct SqlxFooterRepository {
    pool: DynDatabasePool,
}

impl SqlxFooterRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FooterRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_FOOTER: &str = "SELECT id, about_text, contact_email, contact_phone, contact_address, \
     social_facebook, social_twitter, social_instagram, created_at, updated_at \
     FROM footer_content ORDER BY id LIMIT 1";

const UPDATE_FOOTER: &str = "UPDATE footer_content SET about_text = ?, contact_email = ?, \
     contact_phone = ?, contact_address = ?, social_facebook = ?, social_twitter = ?, \
     social_instagram = ?, updated_at = ? WHERE id = ?";

const INSERT_FOOTER: &str = "INSERT INTO footer_content (about_text, contact_email, contact_phone, \
     contact_address, social_facebook, social_twitter, social_instagram, created_at, updated_at) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";

#[async_trait]
impl FooterRepository for SqlxFooterRepository {
    async fn get(&self) -> Result<Option<FooterContent>> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => get_sqlite(pool).await,
            Backend::Mysql(pool) => get_mysql(pool).await,
        }
    }

    async fn update(&self, input: &UpdateFooterInput) -> Result<FooterContent> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => update_sqlite(pool, input).await,
            Backend::Mysql(pool) => update_mysql(pool, input).await,
        }
    }
}

// SQLite implementations
async fn get_sqlite(pool: &SqlitePool) -> Result<Option<FooterContent>> {
    let row = sqlx::query(SELECT_FOOTER)
        .fetch_optional(pool)
        .await
        .context("Failed to get footer content")?;
    row.map(|r| row_to_footer_sqlite(&r)).transpose()
}

async fn update_sqlite(pool: &SqlitePool, input: &UpdateFooterInput) -> Result<FooterContent> {
    let now = Utc::now();
    match get_sqlite(pool).await? {
        Some(existing) => {
            sqlx::query(UPDATE_FOOTER)
                .bind(&input.about_text)
                .bind(&input.contact_email)
                .bind(&input.contact_phone)
                .bind(&input.contact_address)
                .bind(&input.social_facebook)
                .bind(&input.social_twitter)
                .bind(&input.social_instagram)
                .bind(now)
                .bind(existing.id)
                .execute(pool)
                .await
                .context("Failed to update footer content")?;
        }
        None => {
            sqlx::query(INSERT_FOOTER)
                .bind(&input.about_text)
                .bind(&input.contact_email)
                .bind(&input.contact_phone)
                .bind(&input.contact_address)
                .bind(&input.social_facebook)
                .bind(&input.social_twitter)
                .bind(&input.social_instagram)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create footer content")?;
        }
    }

    get_sqlite(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Footer content missing after update"))
}

fn row_to_footer_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<FooterContent> {
    Ok(FooterContent {
        id: row.try_get("id")?,
        about_text: row.try_get("about_text")?,
        contact_email: row.try_get("contact_email")?,
        contact_phone: row.try_get("contact_phone")?,
        contact_address: row.try_get("contact_address")?,
        social_facebook: row.try_get("social_facebook")?,
        social_twitter: row.try_get("social_twitter")?,
        social_instagram: row.try_get("social_instagram")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// MySQL implementations
async fn get_mysql(pool: &MySqlPool) -> Result<Option<FooterContent>> {
    let row = sqlx::query(SELECT_FOOTER)
        .fetch_optional(pool)
        .await
        .context("Failed to get footer content")?;
    row.map(|r| row_to_footer_mysql(&r)).transpose()
}

async fn update_mysql(pool: &MySqlPool, input: &UpdateFooterInput) -> Result<FooterContent> {
    let now = Utc::now();
    match get_mysql(pool).await? {
        Some(existing) => {
            sqlx::query(UPDATE_FOOTER)
                .bind(&input.about_text)
                .bind(&input.contact_email)
                .bind(&input.contact_phone)
                .bind(&input.contact_address)
                .bind(&input.social_facebook)
                .bind(&input.social_twitter)
                .bind(&input.social_instagram)
                .bind(now)
                .bind(existing.id)
                .execute(pool)
                .await
                .context("Failed to update footer content")?;
        }
        None => {
            sqlx::query(INSERT_FOOTER)
                .bind(&input.about_text)
                .bind(&input.contact_email)
                .bind(&input.contact_phone)
                .bind(&input.contact_address)
                .bind(&input.social_facebook)
                .bind(&input.social_twitter)
                .bind(&input.social_instagram)
                .bind(now)
                .bind(now)
                .execute(pool)
                .await
                .context("Failed to create footer content")?;
        }
    }

    get_mysql(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Footer content missing after update"))
}

fn row_to_footer_mysql(row: &sqlx::mysql::MySqlRow) -> Result<FooterContent> {
    Ok(FooterContent {
        id: row.try_get("id")?,
        about_text: row.try_get("about_text")?,
        contact_email: row.try_get("contact_email")?,
        contact_phone: row.try_get("contact_phone")?,
        contact_address: row.try_get("contact_address")?,
        social_facebook: row.try_get("social_facebook")?,
        social_twitter: row.try_get("social_twitter")?,
        social_instagram: row.try_get("social_instagram")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
