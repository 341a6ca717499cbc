//! Clients service
//!
//! Client CRUD with local validation, the client details view (client,
//! projects and their material costs) and project create/update under a
//! client.

use super::costs::{cost_for, grand_total, load_cost_map, CostMap};
use super::listing::{Listable, SortValue};
use crate::api::{Client, ClientKind, ClientPayload, Project, ProjectPayload, ProjectStatus, Repository};
use crate::config::{MIN_CNP_LEN, MIN_CUI_LEN};
use crate::error::{AppError, Result};
use crate::text::{money, non_blank};
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Raw client form input
#[derive(Debug, Clone, Default)]
pub struct ClientForm {
    pub name: String,
    pub kind: Option<ClientKind>,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub note: String,
    pub cui: String,
    pub cnp: String,
}

impl ClientForm {
    /// Blank fields become `null`; only the tax id matching the type is kept
    pub fn into_payload(self) -> ClientPayload {
        let kind = self.kind.unwrap_or(ClientKind::Individual);
        ClientPayload {
            name: self.name.trim().to_string(),
            kind,
            phone: non_blank(&self.phone),
            email: non_blank(&self.email),
            address: non_blank(&self.address),
            note: non_blank(&self.note),
            cui: match kind {
                ClientKind::Company => non_blank(&self.cui),
                ClientKind::Individual => None,
            },
            cnp: match kind {
                ClientKind::Individual => non_blank(&self.cnp),
                ClientKind::Company => None,
            },
        }
    }

    /// Prefill from an existing client
    pub fn from_client(client: &Client) -> Self {
        Self {
            name: client.name.clone(),
            kind: Some(client.kind()),
            phone: client.phone.clone().unwrap_or_default(),
            email: client.email.clone().unwrap_or_default(),
            address: client.address.clone().unwrap_or_default(),
            note: client.notes.clone().unwrap_or_default(),
            cui: client.cui.clone().unwrap_or_default(),
            cnp: client.cnp.clone().unwrap_or_default(),
        }
    }
}

pub fn validate_client(payload: &ClientPayload) -> Result<()> {
    if payload.name.is_empty() {
        return Err(AppError::Validation("Client name is required".to_string()));
    }
    if let Some(cnp) = &payload.cnp {
        if payload.kind == ClientKind::Individual && cnp.chars().count() < MIN_CNP_LEN {
            return Err(AppError::Validation("CNP looks too short".to_string()));
        }
    }
    if let Some(cui) = &payload.cui {
        if payload.kind == ClientKind::Company && cui.chars().count() < MIN_CUI_LEN {
            return Err(AppError::Validation("CUI looks too short".to_string()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSortKey {
    Name,
    Phone,
    Type,
}

impl FromStr for ClientSortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "name" => Ok(ClientSortKey::Name),
            "phone" => Ok(ClientSortKey::Phone),
            "type" => Ok(ClientSortKey::Type),
            other => Err(format!("Unknown client column '{}'", other)),
        }
    }
}

impl Listable for Client {
    type Key = ClientSortKey;

    fn haystack(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.phone.clone().unwrap_or_default(),
            self.kind_code.clone().unwrap_or_default(),
        ]
    }

    fn sort_value(&self, key: ClientSortKey) -> SortValue {
        match key {
            ClientSortKey::Name => SortValue::text(&self.name),
            ClientSortKey::Phone => SortValue::optional_text(self.phone.as_deref()),
            ClientSortKey::Type => SortValue::optional_text(self.kind_code.as_deref()),
        }
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

/// A project row of the client details view
#[derive(Debug, Clone, Serialize)]
pub struct ProjectRow {
    pub project: Project,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectSortKey {
    Title,
    Status,
    Cost,
}

impl FromStr for ProjectSortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "title" | "name" => Ok(ProjectSortKey::Title),
            "status" => Ok(ProjectSortKey::Status),
            "cost" => Ok(ProjectSortKey::Cost),
            other => Err(format!("Unknown project column '{}'", other)),
        }
    }
}

impl Listable for ProjectRow {
    type Key = ProjectSortKey;

    fn haystack(&self) -> Vec<String> {
        vec![
            self.project.title.clone(),
            self.project.status_code.clone().unwrap_or_default(),
            self.cost.to_string(),
            money(self.cost),
        ]
    }

    fn sort_value(&self, key: ProjectSortKey) -> SortValue {
        match key {
            ProjectSortKey::Title => SortValue::text(&self.project.title),
            ProjectSortKey::Status => SortValue::optional_text(self.project.status_code.as_deref()),
            ProjectSortKey::Cost => SortValue::Number(Some(self.cost)),
        }
    }

    fn display_name(&self) -> String {
        self.project.title.clone()
    }
}

/// Client details view
#[derive(Debug, Clone, Serialize)]
pub struct ClientDetails {
    pub client: Client,
    pub projects: Vec<Project>,
    pub costs: CostMap,
}

impl ClientDetails {
    /// Projects joined with their cost
    pub fn rows(&self) -> Vec<ProjectRow> {
        self.projects
            .iter()
            .map(|p| ProjectRow {
                project: p.clone(),
                cost: cost_for(p, &self.costs),
            })
            .collect()
    }

    pub fn grand_total(&self) -> f64 {
        grand_total(&self.projects, &self.costs)
    }
}

/// Raw project form input
#[derive(Debug, Clone, Default)]
pub struct ProjectForm {
    pub title: String,
    pub address: String,
    pub status: Option<ProjectStatus>,
}

impl ProjectForm {
    pub fn into_payload(self) -> Result<ProjectPayload> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("Project title is required".to_string()));
        }
        Ok(ProjectPayload {
            title,
            address: non_blank(&self.address),
            status: self.status.unwrap_or(ProjectStatus::Planned),
        })
    }
}

/// Service for clients and their projects
#[derive(Clone)]
pub struct ClientsService {
    repo: Repository,
    batch_timeout: Duration,
}

impl ClientsService {
    pub fn new(repo: Repository, batch_timeout: Duration) -> Self {
        Self {
            repo,
            batch_timeout,
        }
    }

    /// List clients, filtered server-side when `q` is given
    pub async fn list(&self, q: Option<&str>) -> Result<Vec<Client>> {
        self.repo.list_clients(q).await
    }

    pub async fn get(&self, id: i64) -> Result<Client> {
        self.repo.get_client(id).await
    }

    pub async fn create(&self, form: ClientForm) -> Result<Option<Client>> {
        let payload = form.into_payload();
        validate_client(&payload)?;

        tracing::info!("Creating client: {}", payload.name);
        let created = self.repo.create_client(&payload).await?;

        if let Some(client) = &created {
            tracing::info!("Client created: {}", client.id);
        }
        Ok(created)
    }

    pub async fn update(&self, id: i64, form: ClientForm) -> Result<Option<Client>> {
        let payload = form.into_payload();
        validate_client(&payload)?;

        tracing::info!("Updating client: {}", id);
        self.repo.update_client(id, &payload).await
    }

    /// Soft-deactivate; falls back to DELETE when the backend has no
    /// deactivate route
    pub async fn deactivate(&self, id: i64) -> Result<()> {
        tracing::info!("Deactivating client: {}", id);

        if let Err(e) = self.repo.deactivate_client(id).await {
            tracing::warn!("Deactivate failed for client {} ({}), trying DELETE", id, e);
            self.repo.delete_client(id).await?;
        }

        Ok(())
    }

    /// Client and projects load together or not at all, within the batch
    /// budget. Cost lookups that outlive the budget count as zero.
    pub async fn details(&self, id: i64) -> Result<ClientDetails> {
        let deadline = Instant::now() + self.batch_timeout;

        let (client, projects) = timeout_at(deadline, async {
            tokio::try_join!(self.repo.get_client(id), self.repo.list_client_projects(id))
        })
        .await
        .map_err(|_| {
            tracing::warn!("Client {} details timed out", id);
            AppError::Timeout
        })??;

        let costs = match timeout_at(deadline, load_cost_map(&self.repo, &projects)).await {
            Ok(costs) => costs,
            Err(_) => {
                tracing::warn!("Cost lookups for client {} timed out", id);
                projects.iter().map(|p| (p.id, 0.0)).collect()
            }
        };

        Ok(ClientDetails {
            client,
            projects,
            costs,
        })
    }

    pub async fn create_project(&self, client_id: i64, form: ProjectForm) -> Result<Option<Project>> {
        let payload = form.into_payload()?;
        tracing::info!("Creating project '{}' for client {}", payload.title, client_id);
        self.repo.create_project(client_id, &payload).await
    }

    /// Create with the client's address when none is given
    pub async fn create_project_for(&self, client: &Client, mut form: ProjectForm) -> Result<Option<Project>> {
        if form.address.trim().is_empty() {
            form.address = client.address.clone().unwrap_or_default();
        }
        self.create_project(client.id, form).await
    }

    pub async fn update_project(&self, project_id: i64, form: ProjectForm) -> Result<Option<Project>> {
        let payload = form.into_payload()?;
        tracing::info!("Updating project {}", project_id);
        self.repo.update_project(project_id, &payload).await
    }

    pub async fn cancel_project(&self, project_id: i64) -> Result<()> {
        tracing::info!("Canceling project {}", project_id);
        self.repo
            .set_project_status(project_id, ProjectStatus::Canceled)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::listing::{filter_sort, SortDirection};
    use serde_json::json;

    fn form(kind: ClientKind) -> ClientForm {
        ClientForm {
            name: "  Ion Popescu ".to_string(),
            kind: Some(kind),
            phone: " ".to_string(),
            cui: "RO99".to_string(),
            cnp: "1850101123456".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_payload_keeps_matching_tax_id() {
        let pf = form(ClientKind::Individual).into_payload();
        assert_eq!(pf.name, "Ion Popescu");
        assert_eq!(pf.phone, None);
        assert_eq!(pf.cui, None);
        assert_eq!(pf.cnp.as_deref(), Some("1850101123456"));

        let pj = form(ClientKind::Company).into_payload();
        assert_eq!(pj.cnp, None);
        assert_eq!(pj.cui.as_deref(), Some("RO99"));
    }

    #[test]
    fn test_validation() {
        let mut f = form(ClientKind::Individual);
        f.cnp = "123".to_string();
        assert!(validate_client(&f.into_payload()).is_err());

        let mut f = form(ClientKind::Company);
        f.cui = "R1".to_string();
        assert!(validate_client(&f.into_payload()).is_err());

        let mut f = form(ClientKind::Company);
        f.name = "   ".to_string();
        assert!(validate_client(&f.into_payload()).is_err());

        assert!(validate_client(&form(ClientKind::Company).into_payload()).is_ok());
    }

    #[test]
    fn test_project_rows_sort_by_cost_and_title() {
        let details = ClientDetails {
            client: serde_json::from_value(json!({"id": 1, "name": "Ion"})).unwrap(),
            projects: serde_json::from_value(json!([
                {"id": 1, "title": "B"},
                {"id": 2, "title": "A"}
            ]))
            .unwrap(),
            costs: [(1, 100.0), (2, 50.0)].into_iter().collect(),
        };
        let rows = details.rows();

        let by_cost = filter_sort(&rows, "", ProjectSortKey::Cost, SortDirection::Asc);
        assert_eq!(by_cost.iter().map(|r| r.project.id).collect::<Vec<_>>(), vec![2, 1]);

        let by_title = filter_sort(&rows, "", ProjectSortKey::Title, SortDirection::Asc);
        assert_eq!(by_title.iter().map(|r| r.project.id).collect::<Vec<_>>(), vec![2, 1]);

        assert_eq!(details.grand_total(), 150.0);

        let found = filter_sort(&rows, "100.00 ron", ProjectSortKey::Title, SortDirection::Asc);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].project.id, 1);
    }

    #[test]
    fn test_project_form_defaults() {
        let payload = ProjectForm {
            title: " Revizie ".to_string(),
            ..Default::default()
        }
        .into_payload()
        .unwrap();
        assert_eq!(payload.title, "Revizie");
        assert_eq!(payload.status, ProjectStatus::Planned);
        assert_eq!(payload.address, None);

        assert!(ProjectForm::default().into_payload().is_err());
    }
}
