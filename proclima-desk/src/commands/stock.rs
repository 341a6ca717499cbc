//! Stock commands

use super::{or_dash, page_footer, require_login, ListArgs};
use crate::app::AppState;
use crate::config::location_display_name;
use crate::error::{AppError, Result};
use crate::services::stock::{resolve_location_id, total_value, LocationFilter, StockSortKey};
use crate::services::transfer::{export_rows, write_export, ExportFormat};
use crate::text::{money, sum_number};
use std::path::Path;

pub async fn list(state: &AppState, location: &LocationFilter, args: &ListArgs) -> Result<String> {
    require_login(state).await?;

    let rows = state.stock.list(location).await?;
    let mut list = args.state(StockSortKey::Material, state.settings.page_size)?;
    let filtered = list.rows(&rows);
    let filtered_value = total_value(filtered.iter().copied());
    let view = list.view(&rows);

    let title = match location {
        LocationFilter::All => "Stock (all locations)".to_string(),
        LocationFilter::Code(code) => format!("Stock at {}", location_display_name(code)),
    };
    let mut lines = vec![title];
    for row in &view.items {
        lines.push(format!(
            "#{:<5} {:<32} {:<16} {:<10} {:>8} {:<5} {:>12} {:>14}",
            row.material_id,
            row.material_name,
            or_dash(row.category.as_deref()),
            row.location_label(),
            row.quantity(),
            or_dash(row.unit.as_deref()),
            money(sum_number(row.unit_price)),
            money(row.value())
        ));
    }
    lines.push(page_footer(&view));
    lines.push(format!("Total value: {}", money(filtered_value)));
    Ok(lines.join("\n"))
}

pub async fn stock_in(
    state: &AppState,
    material_id: i64,
    location_code: &str,
    qty: f64,
    price: Option<f64>,
    note: Option<&str>,
) -> Result<String> {
    require_login(state).await?;

    state
        .stock
        .stock_in(material_id, location_code, qty, price, note)
        .await?;
    state.search.reset();
    Ok(format!(
        "Added {} of material #{} at {}",
        qty,
        material_id,
        location_code.trim().to_uppercase()
    ))
}

/// Location id for a code, from the locations list or the stock rows
async fn location_id(state: &AppState, code: &str) -> Result<i64> {
    let (locations, rows) = tokio::try_join!(
        state.stock.locations(),
        state.stock.list(&LocationFilter::All)
    )?;
    resolve_location_id(&locations, &rows, code)
        .ok_or_else(|| AppError::Validation(format!("Unknown location '{}'", code)))
}

pub async fn adjust(
    state: &AppState,
    material_id: i64,
    location_code: &str,
    qty: f64,
    note: Option<&str>,
) -> Result<String> {
    require_login(state).await?;

    let location_id = location_id(state, location_code).await?;
    state.stock.adjust(material_id, location_id, qty, note).await?;
    state.search.reset();
    Ok(format!(
        "Material #{} at {} set to {}",
        material_id, location_code, qty
    ))
}

pub async fn remove(state: &AppState, material_id: i64, location_code: &str) -> Result<String> {
    require_login(state).await?;

    let location_id = location_id(state, location_code).await?;
    state.stock.remove(material_id, location_id).await?;
    state.search.reset();
    Ok(format!("Material #{} removed from {}", material_id, location_code))
}

/// Export the stock view (filter and sort from `args`) for `location`
pub async fn export(
    state: &AppState,
    location: &LocationFilter,
    args: &ListArgs,
    format: ExportFormat,
    out_dir: &Path,
) -> Result<String> {
    require_login(state).await?;

    let all = state.stock.list(&LocationFilter::All).await?;
    let list = args.state(StockSortKey::Material, state.settings.page_size)?;
    let rows = export_rows(&all, &list, location);

    let today = chrono::Utc::now().date_naive();
    let path = write_export(out_dir, &rows, location, today, format).await?;
    Ok(format!("Exported {} rows to {}", rows.len(), path.display()))
}
