//! Settings service
//!
//! Manages client settings persistence using JSON file storage.

use crate::config::{
    API_URL_ENV, AUTOCOMPLETE_DEBOUNCE, DEFAULT_API_URL, DEFAULT_BATCH_TIMEOUT_SECS,
    DEFAULT_LOCATION_CODE, DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS,
};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// Client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientSettings {
    /// Base URL of the back-office API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Location preselected for stock views and imports
    #[serde(default = "default_location")]
    pub default_location: String,
    /// Rows per page in list views (one of 20, 50, 100, 200)
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Budget for a view's joint batch of fetches
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,
    /// Per-request timeout; none by default
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_autocomplete_debounce_ms")]
    pub autocomplete_debounce_ms: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_location() -> String {
    DEFAULT_LOCATION_CODE.to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_batch_timeout_secs() -> u64 {
    DEFAULT_BATCH_TIMEOUT_SECS
}

fn default_autocomplete_debounce_ms() -> u64 {
    AUTOCOMPLETE_DEBOUNCE.as_millis() as u64
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            default_location: default_location(),
            page_size: default_page_size(),
            batch_timeout_secs: default_batch_timeout_secs(),
            request_timeout_secs: None,
            autocomplete_debounce_ms: default_autocomplete_debounce_ms(),
        }
    }
}

impl ClientSettings {
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    pub fn autocomplete_debounce(&self) -> Duration {
        Duration::from_millis(self.autocomplete_debounce_ms)
    }

    /// Apply `PROCLIMA_API_URL` when it is set and not blank
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_url = url.trim().to_string();
            }
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.api_url.trim().is_empty() {
            return Err(AppError::Validation("API URL cannot be empty".to_string()));
        }
        if !PAGE_SIZE_OPTIONS.contains(&self.page_size) {
            return Err(AppError::Validation(format!(
                "Page size must be one of {:?}",
                PAGE_SIZE_OPTIONS
            )));
        }
        Ok(())
    }
}

/// Service for managing client settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            settings_path: data_dir.join("settings.json"),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<ClientSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = ClientSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let mut settings: ClientSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?;

        if !PAGE_SIZE_OPTIONS.contains(&settings.page_size) {
            tracing::warn!(
                "Unsupported page size {} in settings, using {}",
                settings.page_size,
                DEFAULT_PAGE_SIZE
            );
            settings.page_size = DEFAULT_PAGE_SIZE;
        }

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &ClientSettings) -> Result<()> {
        settings.validate()?;

        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Generic(format!("Failed to serialize settings: {}", e)))?;

        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    /// Update the API URL
    pub async fn update_api_url(&self, api_url: &str) -> Result<()> {
        let mut settings = self.load().await?;
        settings.api_url = api_url.trim().trim_end_matches('/').to_string();
        self.save(&settings).await
    }

    /// Update the list page size
    pub async fn update_page_size(&self, page_size: usize) -> Result<()> {
        let mut settings = self.load().await?;
        settings.page_size = page_size;
        self.save(&settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_creates_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = SettingsService::new(temp_dir.path().to_path_buf());

        let settings = service.load().await.unwrap();
        assert_eq!(settings, ClientSettings::default());
        assert!(temp_dir.path().join("settings.json").exists());
        assert_eq!(settings.batch_timeout(), Duration::from_secs(12));
        assert_eq!(settings.request_timeout(), None);
    }

    #[tokio::test]
    async fn test_missing_fields_use_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("settings.json"),
            r#"{"api_url":"https://api.example.test","page_size":33}"#,
        )
        .unwrap();
        let service = SettingsService::new(temp_dir.path().to_path_buf());

        let settings = service.load().await.unwrap();
        assert_eq!(settings.api_url, "https://api.example.test");
        assert_eq!(settings.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(settings.default_location, "ZOR");
        assert_eq!(settings.autocomplete_debounce_ms, 200);
    }

    #[tokio::test]
    async fn test_update_page_size_validates() {
        let temp_dir = TempDir::new().unwrap();
        let service = SettingsService::new(temp_dir.path().to_path_buf());

        service.update_page_size(100).await.unwrap();
        assert_eq!(service.load().await.unwrap().page_size, 100);

        let err = service.update_page_size(7).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(service.load().await.unwrap().page_size, 100);
    }

    #[tokio::test]
    async fn test_update_api_url_trims_slash() {
        let temp_dir = TempDir::new().unwrap();
        let service = SettingsService::new(temp_dir.path().to_path_buf());

        service.update_api_url(" http://10.0.0.5:8080/ ").await.unwrap();
        assert_eq!(service.load().await.unwrap().api_url, "http://10.0.0.5:8080");
    }
}
