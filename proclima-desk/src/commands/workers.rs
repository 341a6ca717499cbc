//! Worker commands

use super::{or_dash, page_footer, require_login, ListArgs};
use crate::app::AppState;
use crate::error::Result;
use crate::services::workers::WorkerSortKey;

pub async fn list(
    state: &AppState,
    server_query: Option<&str>,
    include_inactive: bool,
    args: &ListArgs,
) -> Result<String> {
    require_login(state).await?;

    let workers = state.workers.list(server_query, include_inactive).await?;
    let mut list = args.state(WorkerSortKey::Name, state.settings.page_size)?;
    let view = list.view(&workers);

    let mut lines: Vec<String> = view
        .items
        .iter()
        .map(|w| {
            format!(
                "#{:<5} {:<32} {:<14} {}",
                w.id,
                w.name,
                or_dash(w.phone.as_deref()),
                if w.is_active() { "active" } else { "inactive" }
            )
        })
        .collect();
    lines.push(page_footer(&view));
    Ok(lines.join("\n"))
}

pub async fn create(state: &AppState, name: &str, phone: Option<&str>) -> Result<String> {
    require_login(state).await?;

    let created = state.workers.create(name, phone.unwrap_or_default()).await?;
    Ok(match created {
        Some(worker) => format!("Created worker #{} {}", worker.id, worker.name),
        None => format!("Created worker {}", name.trim()),
    })
}
