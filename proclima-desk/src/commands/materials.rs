//! Material commands

use super::{or_dash, page_footer, require_login, ListArgs};
use crate::app::AppState;
use crate::error::Result;
use crate::services::materials::{MaterialForm, MaterialSortKey};
use crate::services::transfer::{describe_import_row, read_import_file};
use crate::text::money;
use std::path::Path;

pub async fn list(state: &AppState, server_query: Option<&str>, args: &ListArgs) -> Result<String> {
    require_login(state).await?;

    let materials = state.materials.list(server_query).await?;
    let mut list = args.state(MaterialSortKey::Name, state.settings.page_size)?;
    let view = list.view(&materials);

    let mut lines: Vec<String> = view
        .items
        .iter()
        .map(|m| {
            format!(
                "#{:<5} {:<32} {:<6} {:<12} {:<16} {:>14}{}",
                m.id,
                m.name,
                or_dash(m.unit.as_deref()),
                or_dash(m.sku.as_deref()),
                or_dash(m.category.as_deref()),
                m.price.map(money).unwrap_or_else(|| "-".to_string()),
                if m.is_active() { "" } else { " (inactive)" }
            )
        })
        .collect();
    lines.push(page_footer(&view));
    Ok(lines.join("\n"))
}

pub async fn create(state: &AppState, form: MaterialForm) -> Result<String> {
    require_login(state).await?;

    let name = form.name.trim().to_string();
    let created = state.materials.create(form).await?;
    state.search.reset();
    Ok(match created {
        Some(material) => format!("Created material #{} {}", material.id, material.name),
        None => format!("Created material {}", name),
    })
}

pub async fn deactivate(state: &AppState, id: i64) -> Result<String> {
    require_login(state).await?;

    state.materials.deactivate(id).await?;
    state.search.reset();
    Ok(format!("Material #{} deactivated", id))
}

/// Import a CSV sheet into stock at `location_code`. `dry_run` only previews.
pub async fn import(state: &AppState, location_code: &str, file: &Path, dry_run: bool) -> Result<String> {
    let rows = read_import_file(file).await?;
    let location_code = location_code.trim().to_uppercase();

    if dry_run {
        let mut lines = vec![format!("{} rows ready for {}", rows.len(), location_code)];
        lines.extend(rows.iter().map(|r| format!("  {}", describe_import_row(r))));
        return Ok(lines.join("\n"));
    }

    require_login(state).await?;
    let summary = state.materials.import(&location_code, &rows).await?;
    state.search.reset();

    Ok(format!(
        "Imported {} rows into {}: {} materials created, {} matched, {} stock movements",
        rows.len(),
        summary.location_code.as_deref().unwrap_or(&location_code),
        summary.materials_created.unwrap_or(0),
        summary.materials_matched.unwrap_or(0),
        summary.stock_movements_added.unwrap_or(0)
    ))
}
