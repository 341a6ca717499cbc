//! Derived per-project material cost
//!
//! The authoritative cost of a project is the server-side total of its
//! consumption lines. Lookups run concurrently and a failed lookup counts as
//! zero; legacy cost fields embedded on the project record are only used
//! when a project has no looked-up cost.

use crate::api::{Project, Repository};
use crate::text::sum_number;
use futures::future::join_all;
use std::collections::HashMap;

/// Project id to looked-up material cost
pub type CostMap = HashMap<i64, f64>;

/// Cost shown for a project: looked-up, else embedded, else zero
pub fn cost_for(project: &Project, costs: &CostMap) -> f64 {
    costs
        .get(&project.id)
        .copied()
        .unwrap_or_else(|| sum_number(project.embedded_cost()))
}

/// Sum of [`cost_for`] over every project
pub fn grand_total(projects: &[Project], costs: &CostMap) -> f64 {
    projects.iter().map(|p| cost_for(p, costs)).sum()
}

/// Fetch `/projects-materials/:id` for every project at once
pub async fn load_cost_map(repo: &Repository, projects: &[Project]) -> CostMap {
    let lookups = projects.iter().map(|project| async move {
        let cost = match repo.project_materials(project.id).await {
            Ok(materials) => materials.cost(),
            Err(e) => {
                tracing::warn!("Cost lookup failed for project {}: {}", project.id, e);
                0.0
            }
        };
        (project.id, cost)
    });

    join_all(lookups).await.into_iter().collect()
}
