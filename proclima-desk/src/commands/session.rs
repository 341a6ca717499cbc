//! Session commands

use super::require_login;
use crate::app::AppState;
use crate::api::User;
use crate::error::Result;

fn describe(user: &User) -> String {
    let role = if user.is_admin() {
        "admin".to_string()
    } else {
        user.role.clone().unwrap_or_else(|| "user".to_string())
    };
    format!("{} ({})", user.name, role)
}

/// Log in and store the session token
pub async fn login(state: &AppState, phone: &str, password: &str) -> Result<String> {
    let session = state.session_service.login(phone, password).await?;
    Ok(match &session.user {
        Some(user) => format!("Logged in as {}", describe(user)),
        None => "Logged in".to_string(),
    })
}

pub async fn logout(state: &AppState) -> Result<String> {
    state.session_service.logout().await?;
    Ok("Logged out".to_string())
}

/// Validate the stored token against the API
pub async fn whoami(state: &AppState) -> Result<String> {
    let user = require_login(state).await?;
    Ok(describe(&user))
}
