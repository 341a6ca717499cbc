//! Project details service
//!
//! Loads a project together with everything its page shows, and runs the
//! nested mutations: status change, material consumption and worker
//! assignment.

use super::autocomplete::LatestLookup;
use super::stock::{available_quantity, check_consumption};
use crate::api::{
    AssignmentNote, Client, Consumption, Location, Project, ProjectMaterials, ProjectStatus,
    ProjectWorker, Repository, SessionContext, StockRow, User, Worker, WorkerAssignment,
};
use crate::config::WORKER_SUGGESTION_LIMIT;
use crate::error::{AppError, Result};
use crate::text::non_blank;
use serde::Serialize;
use std::time::Duration;
use tokio::time::timeout;

/// Everything the project page shows
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetails {
    pub me: Option<User>,
    pub client: Client,
    pub project: Project,
    pub materials: ProjectMaterials,
    pub workers: Vec<ProjectWorker>,
    pub locations: Vec<Location>,
    pub stock: Vec<StockRow>,
}

impl ProjectDetails {
    /// Server-side total of the consumption lines
    pub fn total_cost(&self) -> f64 {
        self.materials.cost()
    }

    pub fn available(&self, material_id: i64, location_code: &str) -> f64 {
        available_quantity(&self.stock, material_id, location_code)
    }
}

/// A consumption as entered on the project page
#[derive(Debug, Clone)]
pub struct ConsumeRequest {
    pub material_id: i64,
    pub location_code: String,
    pub qty: f64,
    /// Overrides the list price when positive
    pub unit_price: Option<f64>,
    pub note: Option<String>,
}

fn degrade<T: Default>(what: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!("Could not load {}: {}", what, e);
        T::default()
    })
}

/// Service for a single project and its nested resources
#[derive(Clone)]
pub struct ProjectsService {
    repo: Repository,
    session: SessionContext,
    batch_timeout: Duration,
    worker_picker: LatestLookup,
}

impl ProjectsService {
    pub fn new(
        repo: Repository,
        session: SessionContext,
        batch_timeout: Duration,
        worker_picker: LatestLookup,
    ) -> Self {
        Self {
            repo,
            session,
            batch_timeout,
            worker_picker,
        }
    }

    /// The client and its project list are required; the other parts
    /// degrade to empty when their fetch fails
    pub async fn details(&self, client_id: i64, project_id: i64) -> Result<ProjectDetails> {
        tracing::debug!("Loading project {} of client {}", project_id, client_id);

        let (me, client, projects, materials, workers, locations, stock) = timeout(
            self.batch_timeout,
            async {
                tokio::join!(
                    self.repo.me(),
                    self.repo.get_client(client_id),
                    self.repo.list_client_projects(client_id),
                    self.repo.project_materials(project_id),
                    self.repo.project_workers(project_id),
                    self.repo.list_locations(),
                    self.repo.list_stock(),
                )
            },
        )
        .await
        .map_err(|_| {
            tracing::warn!("Project {} details timed out", project_id);
            AppError::Timeout
        })?;

        let client = client?;
        let project = projects?
            .into_iter()
            .find(|p| p.id == project_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("project {} of client {}", project_id, client_id))
            })?;

        let me = match me {
            Ok(user) => {
                self.session.set_user(user.clone());
                Some(user)
            }
            Err(e) => {
                tracing::warn!("Could not load profile: {}", e);
                self.session.user()
            }
        };

        Ok(ProjectDetails {
            me,
            client,
            project,
            materials: degrade("project materials", materials),
            workers: degrade("project workers", workers),
            locations: degrade("locations", locations),
            stock: degrade("stock", stock),
        })
    }

    pub async fn set_status(&self, project_id: i64, status: ProjectStatus) -> Result<()> {
        tracing::info!("Project {} status -> {}", project_id, status);
        self.repo.set_project_status(project_id, status).await
    }

    /// Check against the loaded stock, send, then refresh the project's
    /// materials and the stock rows
    pub async fn consume(&self, details: &mut ProjectDetails, req: ConsumeRequest) -> Result<()> {
        let check = check_consumption(
            &details.stock,
            &details.locations,
            req.material_id,
            &req.location_code,
            req.qty,
        )?;

        let body = Consumption {
            project_id: details.project.id,
            material_id: req.material_id,
            from_location_id: check.location_id,
            qty: req.qty,
            unit_price: req.unit_price.filter(|p| p.is_finite() && *p > 0.0),
            note: req.note.as_deref().and_then(non_blank),
        };

        tracing::info!(
            "Consuming {} of material {} from location {} on project {}",
            body.qty,
            body.material_id,
            body.from_location_id,
            body.project_id
        );

        self.repo.consume(&body).await?;

        let (materials, stock) = tokio::join!(
            self.repo.project_materials(details.project.id),
            self.repo.list_stock()
        );
        match materials {
            Ok(materials) => details.materials = materials,
            Err(e) => tracing::warn!("Could not refresh project materials: {}", e),
        }
        match stock {
            Ok(stock) => details.stock = stock,
            Err(e) => tracing::warn!("Could not refresh stock: {}", e),
        }

        Ok(())
    }

    /// Assign workers to a project; admins only
    pub async fn assign_workers(
        &self,
        project_id: i64,
        worker_ids: &[i64],
        note: Option<&str>,
    ) -> Result<Vec<ProjectWorker>> {
        let me = self.session.user().ok_or(AppError::NotAuthenticated)?;
        if !me.is_admin() {
            return Err(AppError::Forbidden(
                "only admins can assign workers".to_string(),
            ));
        }

        let mut ids: Vec<i64> = worker_ids.iter().copied().filter(|id| *id > 0).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Err(AppError::Validation(
                "Select at least one worker".to_string(),
            ));
        }

        tracing::info!("Assigning workers {:?} to project {}", ids, project_id);

        self.repo
            .assign_workers(
                project_id,
                &WorkerAssignment {
                    worker_ids: ids,
                    note: note.and_then(non_blank),
                },
            )
            .await?;

        self.repo.project_workers(project_id).await
    }

    pub async fn remove_worker(&self, project_id: i64, worker_id: i64) -> Result<()> {
        tracing::info!("Removing worker {} from project {}", worker_id, project_id);
        self.repo.remove_project_worker(project_id, worker_id).await
    }

    pub async fn update_worker_note(
        &self,
        project_id: i64,
        worker_id: i64,
        note: Option<&str>,
    ) -> Result<()> {
        self.repo
            .update_project_worker(
                project_id,
                worker_id,
                &AssignmentNote {
                    note: note.and_then(non_blank),
                },
            )
            .await
    }

    /// Worker picker, debounced; a blank query lists everyone.
    /// `None` when a newer keystroke superseded this one.
    pub async fn worker_suggestions(&self, query: &str) -> Result<Option<Vec<Worker>>> {
        let q = non_blank(query);
        let found = self
            .worker_picker
            .run(|| self.repo.list_workers(q.as_deref()))
            .await
            .transpose()?;
        Ok(found.map(|mut found| {
            found.truncate(WORKER_SUGGESTION_LIMIT);
            found
        }))
    }
}
