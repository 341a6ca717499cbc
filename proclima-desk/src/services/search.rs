//! Global search
//!
//! Matches a query against four collections (projects, clients, materials,
//! stock rows) held in memory. Collections are fetched once per session on
//! first use; a collection that fails to load is treated as empty.

use crate::api::{Client, Material, Project, Repository, StockRow};
use crate::config::{MIN_QUERY_LEN, SUGGESTION_LIMIT};
use crate::error::Result;
use crate::text::normalize;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// The four searchable collections
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchCollections {
    pub clients: Vec<Client>,
    pub materials: Vec<Material>,
    pub stock: Vec<StockRow>,
    pub projects: Vec<Project>,
}

/// Matches per group, in display order
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub projects: Vec<Project>,
    pub clients: Vec<Client>,
    pub materials: Vec<Material>,
    pub stock: Vec<StockRow>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.projects.len() + self.clients.len() + self.materials.len() + self.stock.len()
    }
}

/// Fields a record is matched on
pub trait Searchable {
    fn search_fields(&self) -> Vec<Option<&str>>;

    /// The query may span fields: it is matched against all of them
    /// joined by spaces
    fn matches_query(&self, normalized_query: &str) -> bool {
        let fields: Vec<&str> = self.search_fields().into_iter().flatten().collect();
        normalize(&fields.join(" ")).contains(normalized_query)
    }
}

impl Searchable for Client {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.name.as_str()),
            self.phone.as_deref(),
            self.email.as_deref(),
            self.address.as_deref(),
            self.cui.as_deref(),
            self.cnp.as_deref(),
            self.vat.as_deref(),
        ]
    }
}

impl Searchable for Material {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.name.as_str()),
            self.sku.as_deref(),
            self.category.as_deref(),
            self.unit.as_deref(),
        ]
    }
}

impl Searchable for StockRow {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.material_name.as_str()),
            self.sku.as_deref(),
            self.unit.as_deref(),
            self.category.as_deref(),
            self.location_name.as_deref(),
            self.location_code.as_deref(),
        ]
    }
}

impl Searchable for Project {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            self.name.as_deref(),
            Some(self.title.as_str()),
            self.code.as_deref(),
            self.status_code.as_deref(),
            self.client_name(),
            self.cui.as_deref(),
            self.cnp.as_deref(),
        ]
    }
}

/// Normalized query, or `None` when it is too short to search
pub fn searchable_query(query: &str) -> Option<String> {
    let q = normalize(query);
    (q.chars().count() >= MIN_QUERY_LEN).then_some(q)
}

fn pick<T: Searchable + Clone>(items: &[T], q: &str, limit: Option<usize>) -> Vec<T> {
    items
        .iter()
        .filter(|item| item.matches_query(q))
        .take(limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

/// Match `query` against every collection; each group is capped at `limit`
pub fn search(collections: &SearchCollections, query: &str, limit: Option<usize>) -> SearchResults {
    let Some(q) = searchable_query(query) else {
        return SearchResults::default();
    };

    SearchResults {
        projects: pick(&collections.projects, &q, limit),
        clients: pick(&collections.clients, &q, limit),
        materials: pick(&collections.materials, &q, limit),
        stock: pick(&collections.stock, &q, limit),
    }
}

/// State of the header suggestions widget
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", content = "results", rename_all = "snake_case")]
pub enum Suggestions {
    /// Query too short; nothing to show
    Closed,
    /// Collections are still being fetched
    Loading,
    /// Loaded, nothing matched
    Empty,
    Found(SearchResults),
}

/// Search over lazily loaded collections
#[derive(Clone)]
pub struct SearchService {
    repo: Repository,
    loaded: Arc<Mutex<Arc<OnceCell<SearchCollections>>>>,
}

impl SearchService {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            loaded: Arc::new(Mutex::new(Arc::new(OnceCell::new()))),
        }
    }

    fn cell(&self) -> Arc<OnceCell<SearchCollections>> {
        self.loaded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Collections for this session, fetched on first use.
    /// Concurrent first callers share one load.
    pub async fn collections(&self) -> Result<SearchCollections> {
        let cell = self.cell();
        let collections = cell.get_or_init(|| fetch_collections(&self.repo)).await;
        Ok(collections.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.cell().initialized()
    }

    /// Widget state for `query` without waiting on the network
    pub fn peek(&self, query: &str) -> Suggestions {
        if searchable_query(query).is_none() {
            return Suggestions::Closed;
        }
        match self.cell().get() {
            None => Suggestions::Loading,
            Some(collections) => into_suggestions(search(collections, query, Some(SUGGESTION_LIMIT))),
        }
    }

    /// Widget suggestions for `query`, loading collections if needed
    pub async fn suggest(&self, query: &str) -> Result<Suggestions> {
        if searchable_query(query).is_none() {
            return Ok(Suggestions::Closed);
        }
        let cell = self.cell();
        let collections = cell.get_or_init(|| fetch_collections(&self.repo)).await;
        Ok(into_suggestions(search(collections, query, Some(SUGGESTION_LIMIT))))
    }

    /// Full results for the search page, no per-group cap
    pub async fn search_page(&self, query: &str) -> Result<SearchResults> {
        if searchable_query(query).is_none() {
            return Ok(SearchResults::default());
        }
        let cell = self.cell();
        let collections = cell.get_or_init(|| fetch_collections(&self.repo)).await;
        Ok(search(collections, query, None))
    }

    /// Forget loaded collections; the next search fetches again
    pub fn reset(&self) {
        *self.loaded.lock().unwrap_or_else(|e| e.into_inner()) = Arc::new(OnceCell::new());
        tracing::debug!("Search collections discarded");
    }
}

fn into_suggestions(results: SearchResults) -> Suggestions {
    if results.is_empty() {
        Suggestions::Empty
    } else {
        Suggestions::Found(results)
    }
}

fn or_empty<T>(what: &str, result: Result<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!("Search could not load {}: {}", what, e);
        Vec::new()
    })
}

async fn fetch_collections(repo: &Repository) -> SearchCollections {
    tracing::debug!("Loading search collections");

    let (clients, materials, stock, projects) = tokio::join!(
        repo.list_clients(None),
        repo.list_materials(None),
        repo.list_stock(),
        repo.list_projects_any(),
    );

    SearchCollections {
        clients: or_empty("clients", clients),
        materials: or_empty("materials", materials),
        stock: or_empty("stock", stock),
        projects: or_empty("projects", projects),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{build_http_client, ApiClient, SessionContext};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn collections() -> SearchCollections {
        SearchCollections {
            clients: serde_json::from_value(json!([
                {"id": 1, "name": "Ion Popescu", "phone": "0722 111 222", "cnp": 1850101123456i64},
                {"id": 2, "name": "Frig SRL", "cui": "RO123456"}
            ]))
            .unwrap(),
            materials: serde_json::from_value(json!([
                {"id": 10, "name": "Teava cupru 1/4", "sku": "TC14", "category": "Cupru"},
                {"id": 11, "name": "Freon R32", "unit": "kg"}
            ]))
            .unwrap(),
            stock: serde_json::from_value(json!([
                {"material_id": 10, "material_name": "Teava cupru 1/4", "location_code": "ZOR", "location_name": "Zorilor", "qty": 5}
            ]))
            .unwrap(),
            projects: serde_json::from_value(json!([
                {"id": 100, "title": "Montaj split", "client_name": "Ion Popescu", "status": "planned"}
            ]))
            .unwrap(),
        }
    }

    #[test]
    fn test_short_query_matches_nothing() {
        let c = collections();
        assert!(search(&c, "i", None).is_empty());
        assert!(search(&c, "  p  ", None).is_empty());
        assert!(search(&c, "", Some(6)).is_empty());
    }

    #[test]
    fn test_groups_match_their_fields() {
        let c = collections();

        let results = search(&c, "popescu", None);
        assert_eq!(results.clients.len(), 1);
        assert_eq!(results.projects.len(), 1);
        assert!(results.materials.is_empty());

        let results = search(&c, "CUPRU", None);
        assert_eq!(results.materials.len(), 1);
        assert_eq!(results.stock.len(), 1);

        let results = search(&c, "zor", None);
        assert_eq!(results.stock.len(), 1);

        let results = search(&c, "1850101", None);
        assert_eq!(results.clients[0].id, 1);
    }

    #[test]
    fn test_query_spanning_fields() {
        let c = collections();

        let results = search(&c, "popescu 0722", None);
        assert_eq!(results.clients.len(), 1);

        let results = search(&c, "1/4 zorilor", None);
        assert_eq!(results.stock.len(), 1);

        let results = search(&c, "planned ion", None);
        assert_eq!(results.projects.len(), 1);

        assert!(search(&c, "popescu frig", None).clients.is_empty());
    }

    #[test]
    fn test_limit_applies_per_group() {
        let mut c = collections();
        c.clients = (0..10)
            .map(|i| serde_json::from_value(json!({"id": i, "name": format!("Client {}", i)})).unwrap())
            .collect();

        assert_eq!(search(&c, "client", Some(SUGGESTION_LIMIT)).clients.len(), 6);
        assert_eq!(search(&c, "client", None).clients.len(), 10);
    }

    async fn mount_collections(server: &MockServer, loads: u64) {
        let bodies = [
            ("/clients", json!([{"id": 1, "name": "Ion Popescu"}])),
            ("/materials", json!([{"id": 10, "name": "Teava cupru 1/4"}])),
            ("/stock", json!([{"material_id": 10, "material_name": "Teava cupru 1/4", "location_code": "ZOR", "qty": 5}])),
            ("/projects", json!([{"id": 100, "title": "Montaj split"}])),
        ];
        for (route, body) in bodies {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(body)
                        .set_delay(Duration::from_millis(50)),
                )
                .expect(loads)
                .mount(server)
                .await;
        }
    }

    fn service_for(server: &MockServer) -> SearchService {
        let api = ApiClient::new(build_http_client(None).unwrap(), &server.uri(), SessionContext::default());
        SearchService::new(Repository::new(api))
    }

    #[tokio::test]
    async fn test_concurrent_first_searches_share_one_load() {
        let server = MockServer::start().await;
        mount_collections(&server, 1).await;
        let service = service_for(&server);

        assert!(matches!(service.peek("c"), Suggestions::Closed));
        assert!(matches!(service.peek("cupru"), Suggestions::Loading));

        let while_loading = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            service.peek("cupru")
        };
        let (first, second, page, peeked) = tokio::join!(
            service.suggest("cupru"),
            service.suggest("popescu"),
            service.search_page("teava"),
            while_loading,
        );

        assert!(matches!(peeked, Suggestions::Loading));
        assert!(matches!(first.unwrap(), Suggestions::Found(r) if r.materials.len() == 1 && r.stock.len() == 1));
        assert!(matches!(second.unwrap(), Suggestions::Found(r) if r.clients.len() == 1));
        assert_eq!(page.unwrap().materials.len(), 1);

        assert!(service.is_loaded());
        assert!(matches!(service.peek("split"), Suggestions::Found(r) if r.projects.len() == 1));
        assert!(matches!(service.peek("zzz"), Suggestions::Empty));
    }

    #[tokio::test]
    async fn test_reset_loads_again() {
        let server = MockServer::start().await;
        mount_collections(&server, 2).await;
        let service = service_for(&server);

        assert!(matches!(service.suggest("cupru").await.unwrap(), Suggestions::Found(_)));
        service.reset();
        assert!(!service.is_loaded());
        assert!(matches!(service.peek("cupru"), Suggestions::Loading));

        assert!(matches!(service.suggest("cupru").await.unwrap(), Suggestions::Found(_)));
        assert!(service.is_loaded());
    }
}
