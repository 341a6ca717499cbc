//! Repository layer for the REST endpoints
//!
//! One typed method per endpoint. Paths and bodies live here and nowhere
//! else; services compose these calls.

use super::client::ApiClient;
use super::models::*;
use crate::config::PROJECT_COLLECTION_PATHS;
use crate::error::Result;

/// Typed access to the back-office API
#[derive(Clone)]
pub struct Repository {
    api: ApiClient,
}

/// `?q=` only when the query is not blank
fn search_query(q: Option<&str>) -> Vec<(&str, &str)> {
    match q.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => vec![("q", q)],
        None => Vec::new(),
    }
}

impl Repository {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // ===== Session =====

    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        self.api.post("/login", req).await
    }

    pub async fn me(&self) -> Result<User> {
        self.api.get("/me").await
    }

    // ===== Clients =====

    pub async fn list_clients(&self, q: Option<&str>) -> Result<Vec<Client>> {
        self.api.get_list_with("/clients", &search_query(q)).await
    }

    pub async fn get_client(&self, id: i64) -> Result<Client> {
        self.api.get(&format!("/clients/{}", id)).await
    }

    pub async fn create_client(&self, payload: &ClientPayload) -> Result<Option<Client>> {
        self.api.post_optional("/clients", payload).await
    }

    pub async fn update_client(&self, id: i64, payload: &ClientPayload) -> Result<Option<Client>> {
        self.api.patch(&format!("/clients/{}", id), payload).await
    }

    pub async fn deactivate_client(&self, id: i64) -> Result<()> {
        self.api
            .patch_unit::<()>(&format!("/clients/{}/deactivate", id), None)
            .await
    }

    pub async fn delete_client(&self, id: i64) -> Result<()> {
        self.api.delete(&format!("/clients/{}", id)).await
    }

    pub async fn list_client_projects(&self, client_id: i64) -> Result<Vec<Project>> {
        self.api
            .get_list(&format!("/clients/{}/projects", client_id))
            .await
    }

    pub async fn create_project(
        &self,
        client_id: i64,
        payload: &ProjectPayload,
    ) -> Result<Option<Project>> {
        self.api
            .post_optional(&format!("/clients/{}/projects", client_id), payload)
            .await
    }

    // ===== Projects =====

    pub async fn update_project(&self, id: i64, payload: &ProjectPayload) -> Result<Option<Project>> {
        self.api.patch(&format!("/projects/{}", id), payload).await
    }

    pub async fn set_project_status(&self, id: i64, status: ProjectStatus) -> Result<()> {
        self.api
            .patch_unit(&format!("/projects/{}/status", id), Some(&StatusChange { status }))
            .await
    }

    /// First project collection route that answers, in the configured order.
    /// Empty when none does.
    pub async fn list_projects_any(&self) -> Result<Vec<Project>> {
        for path in PROJECT_COLLECTION_PATHS {
            match self.api.get_list::<Project>(path).await {
                Ok(projects) => {
                    tracing::debug!("Projects collection found at {}", path);
                    return Ok(projects);
                }
                Err(e) => tracing::debug!("No projects collection at {}: {}", path, e),
            }
        }

        tracing::warn!("No projects collection route answered");
        Ok(Vec::new())
    }

    pub async fn project_materials(&self, project_id: i64) -> Result<ProjectMaterials> {
        self.api
            .get(&format!("/projects-materials/{}", project_id))
            .await
    }

    pub async fn project_workers(&self, project_id: i64) -> Result<Vec<ProjectWorker>> {
        self.api
            .get_list(&format!("/projects/{}/workers", project_id))
            .await
    }

    pub async fn assign_workers(&self, project_id: i64, req: &WorkerAssignment) -> Result<()> {
        self.api
            .post_unit(&format!("/projects/{}/workers", project_id), req)
            .await
    }

    pub async fn update_project_worker(
        &self,
        project_id: i64,
        worker_id: i64,
        req: &AssignmentNote,
    ) -> Result<()> {
        self.api
            .patch_unit(
                &format!("/projects/{}/workers/{}", project_id, worker_id),
                Some(req),
            )
            .await
    }

    pub async fn remove_project_worker(&self, project_id: i64, worker_id: i64) -> Result<()> {
        self.api
            .delete(&format!("/projects/{}/workers/{}", project_id, worker_id))
            .await
    }

    // ===== Materials & stock =====

    pub async fn list_materials(&self, q: Option<&str>) -> Result<Vec<Material>> {
        self.api.get_list_with("/materials", &search_query(q)).await
    }

    pub async fn create_material(&self, payload: &MaterialPayload) -> Result<Option<Material>> {
        self.api.post_optional("/materials", payload).await
    }

    pub async fn update_material(&self, id: i64, payload: &MaterialPayload) -> Result<Option<Material>> {
        self.api.patch(&format!("/materials/{}", id), payload).await
    }

    pub async fn set_material_active(&self, id: i64, active: bool) -> Result<()> {
        self.api
            .patch_unit(&format!("/materials/{}", id), Some(&ActiveFlag { active }))
            .await
    }

    pub async fn list_stock(&self) -> Result<Vec<StockRow>> {
        self.api.get_list("/stock").await
    }

    pub async fn stock_in(&self, req: &StockIn) -> Result<()> {
        self.api.post_unit("/stock/in", req).await
    }

    pub async fn stock_adjust(&self, req: &StockAdjust) -> Result<()> {
        self.api.post_unit("/stock/adjust", req).await
    }

    pub async fn consume(&self, req: &Consumption) -> Result<()> {
        self.api.post_unit("/stock/consume", req).await
    }

    pub async fn import_stock(&self, req: &StockImport<'_>) -> Result<ImportSummary> {
        Ok(self
            .api
            .post_optional("/stock/import", req)
            .await?
            .unwrap_or_default())
    }

    pub async fn list_locations(&self) -> Result<Vec<Location>> {
        self.api.get_list("/locations").await
    }

    // ===== Workers & users =====

    pub async fn list_workers(&self, q: Option<&str>) -> Result<Vec<Worker>> {
        self.api.get_list_with("/workers", &search_query(q)).await
    }

    pub async fn create_worker(&self, payload: &WorkerPayload) -> Result<Option<Worker>> {
        self.api.post_optional("/workers", payload).await
    }

    pub async fn update_worker(&self, id: i64, payload: &WorkerPayload) -> Result<Option<Worker>> {
        self.api.patch(&format!("/workers/{}", id), payload).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.api.get_list("/users").await
    }

    pub async fn create_user(&self, payload: &UserPayload) -> Result<Option<User>> {
        self.api.post_optional("/users", payload).await
    }

    pub async fn update_user(&self, id: i64, payload: &UserPayload) -> Result<Option<User>> {
        self.api.patch(&format!("/users/{}", id), payload).await
    }

    pub async fn set_user_active(&self, id: i64, active: bool) -> Result<Option<User>> {
        self.api
            .patch(&format!("/users/{}", id), &ActiveFlag { active })
            .await
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.api.delete(&format!("/users/{}", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::build_http_client;
    use crate::api::session::SessionContext;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_test_repo() -> (Repository, MockServer) {
        let server = MockServer::start().await;
        let api = ApiClient::new(
            build_http_client(None).unwrap(),
            &server.uri(),
            SessionContext::default(),
        );
        (Repository::new(api), server)
    }

    #[tokio::test]
    async fn test_project_route_discovery() {
        let (repo, server) = create_test_repo().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/lucrari"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"value": [{"id": 1, "title": "Montaj"}]})),
            )
            .mount(&server)
            .await;

        let projects = repo.list_projects_any().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].display_name(), "Montaj");
    }

    #[tokio::test]
    async fn test_project_route_discovery_all_missing() {
        let (repo, _server) = create_test_repo().await;
        assert!(repo.list_projects_any().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_query_only_when_present() {
        let (repo, server) = create_test_repo().await;
        Mock::given(method("GET"))
            .and(path("/materials"))
            .and(query_param("q", "teava cupru"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 4, "name": "Teava cupru"}])))
            .expect(1)
            .mount(&server)
            .await;

        let found = repo.list_materials(Some(" teava cupru ")).await.unwrap();
        assert_eq!(found[0].id, 4);
    }

    #[tokio::test]
    async fn test_status_change_body() {
        let (repo, server) = create_test_repo().await;
        Mock::given(method("PATCH"))
            .and(path("/projects/8/status"))
            .and(body_json(json!({"status": "in_progress"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        repo.set_project_status(8, ProjectStatus::InProgress)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_import_without_summary_body() {
        let (repo, server) = create_test_repo().await;
        Mock::given(method("POST"))
            .and(path("/stock/import"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let rows = vec![ImportRow {
            name: "Cot 90".to_string(),
            sku: None,
            unit: Some("buc".to_string()),
            category: None,
            price: Some(3.5),
            qty: Some(10.0),
        }];
        let summary = repo
            .import_stock(&StockImport {
                location_code: "ZOR",
                rows: &rows,
            })
            .await
            .unwrap();
        assert_eq!(summary.materials_created, None);
    }
}
