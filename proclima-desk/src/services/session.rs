//! Session service
//!
//! Login, logout and the "who am I" gate. The token and profile are kept in
//! `session.json` under the data directory and mirrored into the shared
//! [`SessionContext`] used by the API client.

use crate::api::{LoginRequest, Repository, Session, SessionContext, User};
use crate::error::{AppError, Result};
use std::path::PathBuf;
use tokio::fs;

/// On-disk session storage
#[derive(Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            path: data_dir.join("session.json"),
        }
    }

    /// Stored session, or `None` when absent or unreadable
    pub async fn load(&self) -> Option<Session> {
        let content = fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str::<Session>(&content) {
            Ok(session) if !session.token.is_empty() => Some(session),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file: {}", e);
                None
            }
        }
    }

    pub async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(session)?).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Outcome of the startup gate
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    LoggedIn(User),
    NeedsLogin,
}

/// Service for login state
#[derive(Clone)]
pub struct SessionService {
    repo: Repository,
    store: SessionStore,
    context: SessionContext,
}

impl SessionService {
    pub fn new(repo: Repository, store: SessionStore, context: SessionContext) -> Self {
        Self {
            repo,
            store,
            context,
        }
    }

    /// Load the stored session (or nothing) into the context
    pub async fn init(&self) -> Option<Session> {
        let stored = self.store.load().await;
        match &stored {
            Some(session) => self.context.set(session.clone()),
            None => self.context.clear(),
        }
        stored
    }

    /// Check the token against `/me`. Any failure drops the token and asks for a new login.
    pub async fn check(&self) -> Result<Gate> {
        if !self.context.is_authenticated() {
            return Ok(Gate::NeedsLogin);
        }

        match self.repo.me().await {
            Ok(user) => {
                self.context.set_user(user.clone());
                if let Some(session) = self.context.current() {
                    self.store.save(&session).await?;
                }
                Ok(Gate::LoggedIn(user))
            }
            Err(e) => {
                tracing::info!("Session rejected ({}), clearing token", e);
                self.logout().await?;
                Ok(Gate::NeedsLogin)
            }
        }
    }

    pub async fn login(&self, phone: &str, password: &str) -> Result<Session> {
        let phone = phone.trim();
        if phone.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Phone and password are required".to_string(),
            ));
        }

        tracing::info!("Logging in as {}", phone);

        let response = self
            .repo
            .login(&LoginRequest {
                phone: phone.to_string(),
                password: password.to_string(),
            })
            .await?;

        if response.token.is_empty() {
            return Err(AppError::Generic("Login returned no token".to_string()));
        }

        let session = Session::new(response.token, response.user);
        self.store.save(&session).await?;
        self.context.set(session.clone());

        tracing::info!("Logged in");
        Ok(session)
    }

    /// Tear down the session, on disk and in memory
    pub async fn logout(&self) -> Result<()> {
        self.context.clear();
        self.store.clear().await?;
        tracing::info!("Session cleared");
        Ok(())
    }

    /// Current user, requiring a login
    pub fn current_user(&self) -> Result<User> {
        if !self.context.is_authenticated() {
            return Err(AppError::NotAuthenticated);
        }
        self.context.user().ok_or(AppError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{build_http_client, ApiClient};
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_test_service() -> (SessionService, SessionContext, MockServer, TempDir) {
        let server = MockServer::start().await;
        let temp_dir = TempDir::new().unwrap();
        let context = SessionContext::default();
        let api = ApiClient::new(build_http_client(None).unwrap(), &server.uri(), context.clone());
        let service = SessionService::new(
            Repository::new(api),
            SessionStore::new(temp_dir.path().to_path_buf()),
            context.clone(),
        );
        (service, context, server, temp_dir)
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let (service, context, server, temp_dir) = create_test_service().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "t-1",
                "user": {"id": 1, "name": "Ana", "role": "admin"}
            })))
            .mount(&server)
            .await;

        service.login("0712345678", "pw").await.unwrap();
        assert_eq!(context.token().as_deref(), Some("t-1"));

        let store = SessionStore::new(temp_dir.path().to_path_buf());
        let stored = store.load().await.unwrap();
        assert_eq!(stored.token, "t-1");
        assert!(stored.user.unwrap().is_admin());
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let (service, _context, _server, _temp) = create_test_service().await;
        let err = service.login("  ", "pw").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_check_without_token_needs_login() {
        let (service, _context, _server, _temp) = create_test_service().await;
        assert!(service.init().await.is_none());
        assert_eq!(service.check().await.unwrap(), Gate::NeedsLogin);
    }

    #[tokio::test]
    async fn test_check_refreshes_profile() {
        let (service, context, server, temp_dir) = create_test_service().await;
        SessionStore::new(temp_dir.path().to_path_buf())
            .save(&Session::new("t-2".to_string(), None))
            .await
            .unwrap();
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"user_id": 3, "name": "Dan"})),
            )
            .mount(&server)
            .await;

        service.init().await.unwrap();
        match service.check().await.unwrap() {
            Gate::LoggedIn(user) => assert_eq!(user.id, Some(3)),
            other => panic!("expected login, got {:?}", other),
        }
        assert_eq!(context.user().unwrap().name, "Dan");
        assert_eq!(service.current_user().unwrap().name, "Dan");
    }
}
