//! User commands

use super::{or_dash, page_footer, require_login, ListArgs};
use crate::app::AppState;
use crate::api::User;
use crate::error::Result;
use crate::services::users::{filter_users, StatusFilter, UserSortKey};

pub async fn list(
    state: &AppState,
    status: StatusFilter,
    role: Option<&str>,
    args: &ListArgs,
) -> Result<String> {
    require_login(state).await?;

    let users = state.users.list().await?;
    let filtered: Vec<User> = filter_users(&users, status, role).into_iter().cloned().collect();

    let mut list = args.state(UserSortKey::Name, state.settings.page_size)?;
    let view = list.view(&filtered);

    let mut lines: Vec<String> = view
        .items
        .iter()
        .map(|u| {
            format!(
                "#{:<5} {:<28} {:<14} {:<28} {:<6} {}",
                u.id.unwrap_or_default(),
                u.name,
                or_dash(u.phone.as_deref()),
                or_dash(u.email.as_deref()),
                or_dash(u.role.as_deref()),
                if u.is_active() { "active" } else { "inactive" }
            )
        })
        .collect();
    lines.push(page_footer(&view));
    Ok(lines.join("\n"))
}
