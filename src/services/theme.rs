//! Theme service

use crate::db::repositories::SettingsRepository;
use crate::models::{Palette, SiteTheme};
use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Settings key holding the active theme name
pub const THEME_KEY: &str = "site_theme";

#[derive(Debug, thiserror::Error)]
pub enum ThemeServiceError {
    #[error("Unknown theme: {0}")]
    UnknownTheme(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// What the public theme endpoint returns
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeDescriptor {
    pub name: SiteTheme,
    pub palette: Palette,
    pub css_variables: BTreeMap<&'static str, String>,
}

impl From<SiteTheme> for ThemeDescriptor {
    fn from(theme: SiteTheme) -> Self {
        Self {
            name: theme,
            palette: theme.palette(),
            css_variables: theme.css_variables(),
        }
    }
}

pub struct ThemeService {
    settings: Arc<dyn SettingsRepository>,
}

impl ThemeService {
    pub fn new(settings: Arc<dyn SettingsRepository>) -> Self {
        Self { settings }
    }

    /// The active theme. An unset or unrecognised value reads as the default.
    pub async fn get(&self) -> Result<SiteTheme, ThemeServiceError> {
        let stored = self
            .settings
            .get(THEME_KEY)
            .await
            .context("Failed to read theme")?;

        Ok(match stored {
            None => SiteTheme::default(),
            Some(setting) => setting.value.parse().unwrap_or_else(|_| {
                tracing::warn!("Stored theme {:?} is unknown, using default", setting.value);
                SiteTheme::default()
            }),
        })
    }

    pub async fn describe(&self) -> Result<ThemeDescriptor, ThemeServiceError> {
        Ok(self.get().await?.into())
    }

    pub async fn set(&self, name: &str) -> Result<SiteTheme, ThemeServiceError> {
        let theme: SiteTheme = name
            .trim()
            .parse()
            .map_err(|_| ThemeServiceError::UnknownTheme(name.to_string()))?;

        self.settings
            .set(THEME_KEY, theme.name())
            .await
            .context("Failed to save theme")?;
        tracing::info!("Site theme changed to {}", theme);
        Ok(theme)
    }
}
