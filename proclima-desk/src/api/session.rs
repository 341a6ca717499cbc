//! Session context
//!
//! Holds the token and profile of the current login. One context is created
//! at startup and handed to the API client; it is never a global.

use super::models::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A persisted login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: String, user: Option<User>) -> Self {
        Self {
            token,
            user,
            saved_at: Utc::now(),
        }
    }
}

/// Shared handle to the current session (or its absence)
#[derive(Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionContext {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn token(&self) -> Option<String> {
        self.read()
            .as_ref()
            .map(|s| s.token.clone())
            .filter(|t| !t.is_empty())
    }

    pub fn user(&self) -> Option<User> {
        self.read().as_ref().and_then(|s| s.user.clone())
    }

    pub fn current(&self) -> Option<Session> {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn set(&self, session: Session) {
        *self.write() = Some(session);
    }

    /// Replace the stored profile, keeping the token
    pub fn set_user(&self, user: User) {
        if let Some(session) = self.write().as_mut() {
            session.user = Some(user);
        }
    }

    pub fn clear(&self) {
        *self.write() = None;
    }
}
