//! Workers service
//!
//! Worker records are never deleted, only toggled inactive.

use super::listing::{Listable, SortValue};
use crate::api::{Repository, Worker, WorkerPayload};
use crate::error::{AppError, Result};
use crate::text::non_blank;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerSortKey {
    Name,
    Phone,
    Active,
}

impl FromStr for WorkerSortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "name" => Ok(WorkerSortKey::Name),
            "phone" => Ok(WorkerSortKey::Phone),
            "active" => Ok(WorkerSortKey::Active),
            other => Err(format!("Unknown worker column '{}'", other)),
        }
    }
}

impl Listable for Worker {
    type Key = WorkerSortKey;

    fn haystack(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.phone.clone().unwrap_or_default(),
            self.id.to_string(),
        ]
    }

    fn sort_value(&self, key: WorkerSortKey) -> SortValue {
        match key {
            WorkerSortKey::Name => SortValue::text(&self.name),
            WorkerSortKey::Phone => SortValue::optional_text(self.phone.as_deref()),
            // active rows first when ascending
            WorkerSortKey::Active => SortValue::flag(!self.is_active()),
        }
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

/// Service for worker records
#[derive(Clone)]
pub struct WorkersService {
    repo: Repository,
}

impl WorkersService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Workers, hiding inactive ones unless asked
    pub async fn list(&self, q: Option<&str>, include_inactive: bool) -> Result<Vec<Worker>> {
        let workers = self.repo.list_workers(q).await?;
        Ok(workers
            .into_iter()
            .filter(|w| include_inactive || w.is_active())
            .collect())
    }

    pub async fn create(&self, name: &str, phone: &str) -> Result<Option<Worker>> {
        let name = non_blank(name)
            .ok_or_else(|| AppError::Validation("Worker name is required".to_string()))?;

        tracing::info!("Creating worker: {}", name);

        self.repo
            .create_worker(&WorkerPayload {
                name,
                phone: non_blank(phone),
                active: None,
            })
            .await
    }

    pub async fn update(&self, id: i64, name: &str, phone: &str, active: bool) -> Result<Option<Worker>> {
        let name = non_blank(name)
            .ok_or_else(|| AppError::Validation("Worker name is required".to_string()))?;

        tracing::info!("Updating worker: {}", id);

        self.repo
            .update_worker(
                id,
                &WorkerPayload {
                    name,
                    phone: non_blank(phone),
                    active: Some(active),
                },
            )
            .await
    }

    /// Flip the active flag of `worker`
    pub async fn toggle_active(&self, worker: &Worker) -> Result<Option<Worker>> {
        let next = !worker.is_active();
        tracing::info!("Worker {} active -> {}", worker.id, next);
        self.update(
            worker.id,
            &worker.name,
            worker.phone.as_deref().unwrap_or_default(),
            next,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{build_http_client, ApiClient, SessionContext};
    use crate::services::listing::{filter_sort, SortDirection};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_inactive_hidden_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/workers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "Vasile", "active": true},
                {"id": 2, "name": "Ilie", "active": 0},
                {"id": 3, "name": "Mihai"}
            ])))
            .mount(&server)
            .await;

        let api = ApiClient::new(build_http_client(None).unwrap(), &server.uri(), SessionContext::default());
        let service = WorkersService::new(Repository::new(api));

        assert_eq!(service.list(None, false).await.unwrap().len(), 2);
        let all = service.list(None, true).await.unwrap();
        assert_eq!(all.len(), 3);

        let sorted = filter_sort(&all, "", WorkerSortKey::Active, SortDirection::Asc);
        assert_eq!(sorted.iter().map(|w| w.id).collect::<Vec<_>>(), vec![3, 1, 2]);

        let err = service.create("  ", "0722").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
