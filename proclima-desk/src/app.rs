//! Application state and initialization
//!
//! Resolves the data directory, loads settings and the stored session, and
//! wires every service onto one shared API client. All services are reached
//! through `AppState`.

use crate::api::{build_http_client, ApiClient, Repository, SessionContext};
use crate::config::{DATA_DIR_ENV, DEFAULT_DATA_DIR_NAME};
use crate::error::{AppError, Result};
use crate::services::{
    ClientSettings, ClientsService, LatestLookup, MaterialsService, ProjectsService, SearchService,
    SessionService, SessionStore, SettingsService, StockService, UsersService, WorkersService,
};
use std::path::{Path, PathBuf};

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub settings: ClientSettings,
    pub settings_service: SettingsService,
    pub session: SessionContext,
    pub session_service: SessionService,
    pub search: SearchService,
    pub clients: ClientsService,
    pub projects: ProjectsService,
    pub materials: MaterialsService,
    pub stock: StockService,
    pub workers: WorkersService,
    pub users: UsersService,
}

/// Data directory: explicit flag, then `PROCLIMA_DATA_DIR`, then `$HOME/.proclima-desk`
pub fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    std::env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join(DEFAULT_DATA_DIR_NAME))
        .ok_or_else(|| {
            AppError::Generic(format!(
                "Cannot locate a data directory; pass --data-dir or set {}",
                DATA_DIR_ENV
            ))
        })
}

impl AppState {
    /// Build the state from already-loaded settings.
    /// The session context starts empty; call [`AppState::init`] to restore it.
    pub fn new(data_dir: PathBuf, settings: ClientSettings) -> Result<Self> {
        let http = build_http_client(settings.request_timeout())?;
        let session = SessionContext::default();
        let repo = Repository::new(ApiClient::new(http, &settings.api_url, session.clone()));
        let batch_timeout = settings.batch_timeout();
        // One lookup per picker so typing in one does not cancel the other
        let debounce = settings.autocomplete_debounce();

        Ok(Self {
            settings_service: SettingsService::new(data_dir.clone()),
            session_service: SessionService::new(
                repo.clone(),
                SessionStore::new(data_dir.clone()),
                session.clone(),
            ),
            search: SearchService::new(repo.clone()),
            clients: ClientsService::new(repo.clone(), batch_timeout),
            projects: ProjectsService::new(
                repo.clone(),
                session.clone(),
                batch_timeout,
                LatestLookup::new(debounce),
            ),
            materials: MaterialsService::new(repo.clone(), LatestLookup::new(debounce)),
            stock: StockService::new(repo.clone()),
            workers: WorkersService::new(repo.clone()),
            users: UsersService::new(repo),
            session,
            settings,
            data_dir,
        })
    }

    /// Startup: create the data directory, load settings with overrides,
    /// restore the stored session
    pub async fn init(data_dir: &Path, api_url: Option<&str>) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("Data directory: {:?}", data_dir);

        tokio::fs::create_dir_all(data_dir).await?;

        let settings_service = SettingsService::new(data_dir.to_path_buf());
        let mut settings = settings_service.load().await?.with_env_overrides();
        if let Some(url) = api_url.map(str::trim).filter(|u| !u.is_empty()) {
            settings.api_url = url.to_string();
        }
        tracing::debug!("API base URL: {}", settings.api_url);

        let state = Self::new(data_dir.to_path_buf(), settings)?;
        if state.session_service.init().await.is_some() {
            tracing::debug!("Restored stored session");
        }

        tracing::info!("Application initialized successfully");
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flag_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/tmp/pd"))).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/pd"));
    }

    #[tokio::test]
    async fn test_init_creates_settings_and_honors_url_flag() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");

        let state = AppState::init(&data_dir, Some("http://api.test:9000"))
            .await
            .unwrap();

        assert!(data_dir.join("settings.json").exists());
        assert_eq!(state.settings.api_url, "http://api.test:9000");
        assert!(!state.session.is_authenticated());
    }
}
