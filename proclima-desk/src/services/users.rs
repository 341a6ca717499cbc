//! Users service
//!
//! Login accounts of the back-office. Unlike workers they can be deleted.

use super::listing::{Listable, SortValue};
use crate::api::{Repository, User, UserPayload};
use crate::error::{AppError, Result};
use crate::text::{non_blank, normalize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortKey {
    Name,
    Email,
    Role,
    Active,
}

impl FromStr for UserSortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "name" => Ok(UserSortKey::Name),
            "email" => Ok(UserSortKey::Email),
            "role" => Ok(UserSortKey::Role),
            "active" => Ok(UserSortKey::Active),
            other => Err(format!("Unknown user column '{}'", other)),
        }
    }
}

impl Listable for User {
    type Key = UserSortKey;

    fn haystack(&self) -> Vec<String> {
        [
            Some(self.name.as_str()),
            self.email.as_deref(),
            self.phone.as_deref(),
            self.role.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect()
    }

    fn sort_value(&self, key: UserSortKey) -> SortValue {
        match key {
            UserSortKey::Name => SortValue::text(&self.name),
            UserSortKey::Email => SortValue::optional_text(self.email.as_deref()),
            UserSortKey::Role => SortValue::optional_text(self.role.as_deref()),
            UserSortKey::Active => SortValue::flag(self.is_active()),
        }
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

/// Status filter of the users list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "inactive" => Ok(StatusFilter::Inactive),
            other => Err(format!("Unknown status filter '{}'", other)),
        }
    }
}

/// Apply the status and role filters of the users list
pub fn filter_users<'a>(users: &'a [User], status: StatusFilter, role: Option<&str>) -> Vec<&'a User> {
    let role = role.map(normalize).filter(|r| !r.is_empty() && r != "all");
    users
        .iter()
        .filter(|u| match status {
            StatusFilter::All => true,
            StatusFilter::Active => u.is_active(),
            StatusFilter::Inactive => !u.is_active(),
        })
        .filter(|u| match &role {
            None => true,
            Some(r) => normalize(u.role.as_deref().unwrap_or_default()) == *r,
        })
        .collect()
}

/// Raw user form input
#[derive(Debug, Clone)]
pub struct UserForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub role: String,
    pub active: bool,
    pub password: String,
}

impl Default for UserForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            phone: String::new(),
            email: String::new(),
            role: "user".to_string(),
            active: true,
            password: String::new(),
        }
    }
}

impl UserForm {
    /// Password is mandatory only when creating
    fn into_payload(self, creating: bool) -> Result<UserPayload> {
        let name = non_blank(&self.name)
            .ok_or_else(|| AppError::Validation("Name is required".to_string()))?;
        let phone = non_blank(&self.phone)
            .ok_or_else(|| AppError::Validation("Phone is required".to_string()))?;
        let password = non_blank(&self.password);
        if creating && password.is_none() {
            return Err(AppError::Validation(
                "Password is required for new users".to_string(),
            ));
        }

        Ok(UserPayload {
            name,
            phone,
            email: non_blank(&self.email),
            role: non_blank(&self.role).unwrap_or_else(|| "user".to_string()),
            active: self.active,
            password,
        })
    }
}

/// Service for login accounts
#[derive(Clone)]
pub struct UsersService {
    repo: Repository,
}

impl UsersService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.repo.list_users().await
    }

    pub async fn create(&self, form: UserForm) -> Result<Option<User>> {
        let payload = form.into_payload(true)?;
        tracing::info!("Creating user: {}", payload.name);
        self.repo.create_user(&payload).await
    }

    pub async fn update(&self, id: i64, form: UserForm) -> Result<Option<User>> {
        let payload = form.into_payload(false)?;
        tracing::info!("Updating user: {}", id);
        self.repo.update_user(id, &payload).await
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<Option<User>> {
        tracing::info!("User {} active -> {}", id, active);
        self.repo.set_user_active(id, active).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        tracing::info!("Deleting user: {}", id);
        self.repo.delete_user(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> Vec<User> {
        serde_json::from_value(json!([
            {"id": 1, "name": "Ana", "role": "admin", "active": true},
            {"id": 2, "name": "Dan", "role": "user", "active": false},
            {"id": 3, "name": "Ion", "role": "User"}
        ]))
        .unwrap()
    }

    #[test]
    fn test_filters() {
        let users = users();
        assert_eq!(filter_users(&users, StatusFilter::Active, None).len(), 2);
        assert_eq!(filter_users(&users, StatusFilter::Inactive, None).len(), 1);
        assert_eq!(filter_users(&users, StatusFilter::All, Some("user")).len(), 2);
        assert_eq!(filter_users(&users, StatusFilter::Active, Some("USER")).len(), 1);
        assert_eq!(filter_users(&users, StatusFilter::All, Some("ALL")).len(), 3);
    }

    #[test]
    fn test_password_required_on_create_only() {
        let form = UserForm {
            name: "Ana".to_string(),
            phone: "0722".to_string(),
            ..Default::default()
        };
        assert!(form.clone().into_payload(true).is_err());

        let payload = form.into_payload(false).unwrap();
        assert_eq!(payload.password, None);
        assert_eq!(payload.role, "user");

        let err = UserForm::default().into_payload(false).unwrap_err();
        assert!(err.to_string().contains("Name"));
    }
}
