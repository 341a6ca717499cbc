//! Global search command

use super::{or_dash, require_login};
use crate::app::AppState;
use crate::error::Result;
use crate::services::search::{SearchResults, Suggestions};
use crate::text::money;

/// Grouped search output; `full` lifts the per-group cap
pub async fn search(state: &AppState, query: &str, full: bool) -> Result<String> {
    require_login(state).await?;

    let results = if full {
        state.search.search_page(query).await?
    } else {
        match state.search.suggest(query).await? {
            Suggestions::Closed => {
                return Ok("Type at least 2 characters to search".to_string());
            }
            Suggestions::Loading | Suggestions::Empty => SearchResults::default(),
            Suggestions::Found(results) => results,
        }
    };

    Ok(render(&results))
}

pub fn render(results: &SearchResults) -> String {
    if results.is_empty() {
        return "No results".to_string();
    }

    let mut lines = Vec::new();
    if !results.projects.is_empty() {
        lines.push(format!("Projects ({})", results.projects.len()));
        for p in &results.projects {
            lines.push(format!(
                "  #{} {} [{}] client {}",
                p.id,
                p.display_name(),
                p.status_label(),
                or_dash(p.client_name())
            ));
        }
    }
    if !results.clients.is_empty() {
        lines.push(format!("Clients ({})", results.clients.len()));
        for c in &results.clients {
            lines.push(format!("  #{} {} {}", c.id, c.display_name(), or_dash(c.phone.as_deref())));
        }
    }
    if !results.materials.is_empty() {
        lines.push(format!("Materials ({})", results.materials.len()));
        for m in &results.materials {
            lines.push(format!(
                "  #{} {} {} {}",
                m.id,
                m.name,
                or_dash(m.sku.as_deref()),
                m.price.map(money).unwrap_or_else(|| "-".to_string())
            ));
        }
    }
    if !results.stock.is_empty() {
        lines.push(format!("Stock ({})", results.stock.len()));
        for s in &results.stock {
            lines.push(format!(
                "  {} @ {}: {} {}",
                s.material_name,
                s.location_label(),
                s.quantity(),
                or_dash(s.unit.as_deref())
            ));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_groups() {
        let results = SearchResults {
            clients: serde_json::from_value(json!([{"id": 4, "name": "Popescu", "phone": "0722"}])).unwrap(),
            ..Default::default()
        };
        let text = render(&results);
        assert!(text.starts_with("Clients (1)"));
        assert!(text.contains("#4 Popescu 0722"));
        assert!(!text.contains("Projects"));

        assert_eq!(render(&SearchResults::default()), "No results");
    }
}
