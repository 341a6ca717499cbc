//! CLI commands
//!
//! Each command takes the application state, runs one service operation and
//! returns the text to print:
//! - `session`: login, logout, whoami
//! - `search`: global search
//! - `clients`: clients and the client details view
//! - `projects`: project details, status, consumption, workers
//! - `materials`: catalog and stock import
//! - `stock`: stock views, movements and export
//! - `workers`: worker records
//! - `users`: login accounts

pub mod clients;
pub mod materials;
pub mod projects;
pub mod search;
pub mod session;
pub mod stock;
pub mod users;
pub mod workers;

use crate::app::AppState;
use crate::api::User;
use crate::error::{AppError, Result};
use crate::services::listing::{ListState, PageView};
use crate::services::{Gate, SortDirection};
use std::fmt::Debug;
use std::str::FromStr;

/// Query, sort and paging flags shared by list commands
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Local filter over the visible columns
    #[arg(short, long)]
    pub filter: Option<String>,
    /// Column to sort by
    #[arg(short, long)]
    pub sort: Option<String>,
    /// Sort descending
    #[arg(long)]
    pub desc: bool,
    /// Page to show (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Rows per page (20, 50, 100 or 200)
    #[arg(long)]
    pub page_size: Option<usize>,
}

impl ListArgs {
    /// List state for these flags, starting from the configured page size
    pub fn state<K>(&self, default_key: K, default_page_size: usize) -> Result<ListState<K>>
    where
        K: FromStr<Err = String> + Copy + PartialEq + Debug,
    {
        let key = match &self.sort {
            Some(raw) => raw.trim().to_lowercase().parse::<K>().map_err(AppError::Validation)?,
            None => default_key,
        };

        let mut state = ListState::new(key);
        state.set_page_size(self.page_size.unwrap_or(default_page_size))?;
        if let Some(q) = &self.filter {
            state.set_query(q.as_str());
        }
        if self.desc {
            state.set_direction(SortDirection::Desc);
        }
        state.set_page(self.page);
        Ok(state)
    }
}

/// Gate for commands that need a valid session
pub async fn require_login(state: &AppState) -> Result<User> {
    match state.session_service.check().await? {
        Gate::LoggedIn(user) => Ok(user),
        Gate::NeedsLogin => Err(AppError::NotAuthenticated),
    }
}

/// "Showing a-b of n (page x/y)"
pub fn page_footer<T>(view: &PageView<T>) -> String {
    if view.total == 0 {
        return "No rows".to_string();
    }
    format!(
        "Showing {}-{} of {} (page {}/{})",
        view.start_index(),
        view.end_index(),
        view.total,
        view.page,
        view.page_count
    )
}

pub(crate) fn or_dash(value: Option<&str>) -> &str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or("-")
}
