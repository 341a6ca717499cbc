//! Project commands

use super::{or_dash, require_login};
use crate::app::AppState;
use crate::api::ProjectStatus;
use crate::error::Result;
use crate::services::projects::{ConsumeRequest, ProjectDetails};
use crate::text::{money, sum_number};

/// Project page: header, consumed materials with total, assigned workers
pub fn render(details: &ProjectDetails) -> String {
    let project = &details.project;
    let mut lines = vec![
        format!("{} #{}", project.display_name(), project.id),
        format!("  Client:  {}", details.client.display_name()),
        format!("  Status:  {}", project.status_label()),
        format!("  Address: {}", or_dash(project.address.as_deref())),
        String::new(),
        format!("Materials ({})", details.materials.items.len()),
    ];

    for line in &details.materials.items {
        lines.push(format!(
            "  {:<32} {:>8} {:<5} x {:>12} = {:>14}",
            line.name,
            sum_number(line.qty),
            or_dash(line.unit.as_deref()),
            money(sum_number(line.unit_price_snapshot)),
            money(line.line_cost())
        ));
    }
    lines.push(format!("  Total: {}", money(details.total_cost())));
    lines.push(String::new());

    lines.push(format!("Workers ({})", details.workers.len()));
    for worker in &details.workers {
        lines.push(format!(
            "  #{:<5} {:<28} {:<14} {}",
            worker.id,
            worker.name,
            or_dash(worker.phone.as_deref()),
            or_dash(worker.note.as_deref())
        ));
    }

    lines.join("\n")
}

pub async fn show(state: &AppState, client_id: i64, project_id: i64) -> Result<String> {
    require_login(state).await?;
    let details = state.projects.details(client_id, project_id).await?;
    Ok(render(&details))
}

pub async fn set_status(state: &AppState, project_id: i64, status: ProjectStatus) -> Result<String> {
    require_login(state).await?;
    state.projects.set_status(project_id, status).await?;
    Ok(format!("Project #{} is now {}", project_id, status.label()))
}

/// Consume from stock, then show the refreshed project total
pub async fn consume(
    state: &AppState,
    client_id: i64,
    project_id: i64,
    req: ConsumeRequest,
) -> Result<String> {
    require_login(state).await?;

    let mut details = state.projects.details(client_id, project_id).await?;
    let material_id = req.material_id;
    let location_code = req.location_code.clone();
    state.projects.consume(&mut details, req).await?;

    Ok(format!(
        "Consumed. Project total: {}. Left at {}: {}",
        money(details.total_cost()),
        location_code,
        details.available(material_id, &location_code)
    ))
}

pub async fn assign(
    state: &AppState,
    project_id: i64,
    worker_ids: &[i64],
    note: Option<&str>,
) -> Result<String> {
    require_login(state).await?;

    let workers = state.projects.assign_workers(project_id, worker_ids, note).await?;
    let names: Vec<&str> = workers.iter().map(|w| w.name.as_str()).collect();
    Ok(format!(
        "Project #{} workers: {}",
        project_id,
        if names.is_empty() { "-".to_string() } else { names.join(", ") }
    ))
}

pub async fn unassign(state: &AppState, project_id: i64, worker_id: i64) -> Result<String> {
    require_login(state).await?;
    state.projects.remove_worker(project_id, worker_id).await?;
    Ok(format!("Worker #{} removed from project #{}", worker_id, project_id))
}
