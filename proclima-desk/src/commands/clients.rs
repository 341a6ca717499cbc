//! Client commands

use super::{or_dash, page_footer, require_login, ListArgs};
use crate::app::AppState;
use crate::error::Result;
use crate::services::clients::{ClientForm, ClientSortKey, ProjectForm, ProjectSortKey};
use crate::text::money;

pub async fn list(state: &AppState, server_query: Option<&str>, args: &ListArgs) -> Result<String> {
    require_login(state).await?;

    let clients = state.clients.list(server_query).await?;
    let mut list = args.state(ClientSortKey::Name, state.settings.page_size)?;
    let view = list.view(&clients);

    let mut lines: Vec<String> = view
        .items
        .iter()
        .map(|c| {
            format!(
                "#{:<5} {:<32} {:<14} {}{}",
                c.id,
                c.display_name(),
                or_dash(c.phone.as_deref()),
                c.kind().as_str(),
                if c.is_active() { "" } else { " (inactive)" }
            )
        })
        .collect();
    lines.push(page_footer(&view));
    Ok(lines.join("\n"))
}

/// Client card followed by its projects and their material costs
pub async fn show(state: &AppState, id: i64, args: &ListArgs) -> Result<String> {
    require_login(state).await?;

    let details = state.clients.details(id).await?;
    let client = &details.client;

    let mut lines = vec![
        format!("{} ({})", client.display_name(), client.kind().as_str()),
        format!("  Phone:   {}", or_dash(client.phone.as_deref())),
        format!("  Email:   {}", or_dash(client.email.as_deref())),
        format!("  Address: {}", or_dash(client.address.as_deref())),
    ];
    if let Some(cui) = client.cui.as_deref().filter(|v| !v.trim().is_empty()) {
        lines.push(format!("  CUI:     {}", cui));
    }
    if let Some(cnp) = client.cnp.as_deref().filter(|v| !v.trim().is_empty()) {
        lines.push(format!("  CNP:     {}", cnp));
    }
    lines.push(String::new());

    let rows = details.rows();
    let mut list = args.state(ProjectSortKey::Title, state.settings.page_size)?;
    let view = list.view(&rows);
    lines.push(format!("Projects ({})", rows.len()));
    for row in &view.items {
        lines.push(format!(
            "  #{:<5} {:<32} {:<12} {:>14}",
            row.project.id,
            row.project.display_name(),
            row.project.status_label(),
            money(row.cost)
        ));
    }
    lines.push(page_footer(&view));
    lines.push(format!("Total materials: {}", money(details.grand_total())));
    Ok(lines.join("\n"))
}

pub async fn create(state: &AppState, form: ClientForm) -> Result<String> {
    require_login(state).await?;

    let name = form.name.trim().to_string();
    let created = state.clients.create(form).await?;
    state.search.reset();
    Ok(match created {
        Some(client) => format!("Created client #{} {}", client.id, client.display_name()),
        None => format!("Created client {}", name),
    })
}

pub async fn deactivate(state: &AppState, id: i64) -> Result<String> {
    require_login(state).await?;

    state.clients.deactivate(id).await?;
    state.search.reset();
    Ok(format!("Client #{} deactivated", id))
}

/// New project under a client; a blank address takes the client's
pub async fn add_project(state: &AppState, client_id: i64, form: ProjectForm) -> Result<String> {
    require_login(state).await?;

    let client = state.clients.get(client_id).await?;
    let title = form.title.trim().to_string();
    let created = state.clients.create_project_for(&client, form).await?;
    state.search.reset();
    Ok(match created {
        Some(project) => format!("Created project #{} {}", project.id, project.display_name()),
        None => format!("Created project {}", title),
    })
}
