//! HTTP client for the back-office API
//!
//! Every call goes through [`ApiClient::request`]: it attaches the bearer
//! token from the session context, maps transport failures to
//! `AppError::Unreachable`, non-2xx statuses to `AppError::Api`, and returns
//! `None` for empty (204) bodies.

use super::models::ListEnvelope;
use super::session::SessionContext;
use crate::error::{AppError, Result};
use reqwest::{header, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionContext,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: &str, session: SessionContext) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Send one request and return the decoded JSON body, if any
    pub async fn request<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Option<Value>>
    where
        B: Serialize + ?Sized,
    {
        self.execute(method, path, &[], body).await
    }

    async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Option<Value>>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {} {:?}", method, url, query);

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json");

        if !query.is_empty() {
            req = req.query(query);
        }

        if let Some(token) = self.session.token() {
            req = req.bearer_auth(token);
        }

        if let Some(body) = body {
            req = req.body(serde_json::to_vec(body)?);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout
            } else {
                tracing::warn!("{} {} did not reach the API: {}", method, path, e);
                AppError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = if text.trim().is_empty() {
                format!("API error ({})", status.as_u16())
            } else {
                text
            };
            tracing::debug!("{} {} -> {}: {}", method, path, status, message);
            return Err(AppError::Api {
                status: status.as_u16(),
                message,
            });
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout
            } else {
                AppError::Unreachable(e.to_string())
            }
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Request whose response must carry a JSON body of type `T`
    async fn typed<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match self.request(method, path, body).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Err(AppError::Generic(format!("Empty response from {}", path))),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.typed::<T, ()>(Method::GET, path, None).await
    }

    /// GET a collection, accepting bare or wrapped arrays
    pub async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        self.get_list_with(path, &[]).await
    }

    /// Like [`ApiClient::get_list`], with query-string parameters
    pub async fn get_list_with<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        match self.execute::<()>(Method::GET, path, query, None).await? {
            Some(value) => Ok(serde_json::from_value::<ListEnvelope<Value>>(value)?.decode()),
            None => Ok(Vec::new()),
        }
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.typed(Method::POST, path, Some(body)).await
    }

    /// POST returning the created record when the backend sends one
    pub async fn post_optional<T, B>(&self, path: &str, body: &B) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match self.request(Method::POST, path, Some(body)).await? {
            Some(value) => Ok(decode_optional(Method::POST, path, value)),
            None => Ok(None),
        }
    }

    /// POST where the response body, if any, is not needed
    pub async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        self.request(Method::POST, path, Some(body)).await.map(|_| ())
    }

    /// PATCH returning the updated record when the backend sends one
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match self.request(Method::PATCH, path, Some(body)).await? {
            Some(value) => Ok(decode_optional(Method::PATCH, path, value)),
            None => Ok(None),
        }
    }

    pub async fn patch_unit<B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> Result<()> {
        self.request(Method::PATCH, path, body).await.map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.request::<()>(Method::DELETE, path, None)
            .await
            .map(|_| ())
    }
}

/// Body of a write that succeeded. A body that does not decode is logged
/// and treated as absent; the write itself already went through.
fn decode_optional<T: DeserializeOwned>(method: Method, path: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::debug!("{} {} returned an unexpected body: {}", method, path, e);
            None
        }
    }
}

/// Build the shared reqwest client.
/// No timeout unless one is configured; batches carry their own budget.
pub fn build_http_client(request_timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("proclima-desk/", env!("CARGO_PKG_VERSION")));

    if let Some(timeout) = request_timeout {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Project;
    use crate::api::session::Session;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> ApiClient {
        let session = SessionContext::new(token.map(|t| Session::new(t.to_string(), None)));
        ApiClient::new(build_http_client(None).unwrap(), &server.uri(), session)
    }

    #[tokio::test]
    async fn test_bearer_token_attached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user_id": 1, "name": "A"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        let body = client.request::<()>(Method::GET, "/me", None).await.unwrap();
        assert_eq!(body.unwrap()["name"], "A");
    }

    #[tokio::test]
    async fn test_error_body_becomes_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stock/consume"))
            .respond_with(ResponseTemplate::new(409).set_body_string("insufficient stock"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/clients/1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client
            .post_unit("/stock/consume", &json!({"qty": 1}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.to_string(), "insufficient stock");

        let err = client.get::<Value>("/clients/1").await.unwrap_err();
        assert_eq!(err.to_string(), "API error (500)");
    }

    #[tokio::test]
    async fn test_no_content_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/users/3"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let body = client
            .request::<()>(Method::DELETE, "/users/3", None)
            .await
            .unwrap();
        assert!(body.is_none());
        client.delete("/users/3").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_keeps_records_that_decode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [
                {"id": 1, "title": "Montaj split"},
                {"title": "no id"},
                {"id": 3, "title": "Revizie", "client_name": "Ion", "clientName": "Ion"}
            ]})))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let projects = client.get_list::<Project>("/projects").await.unwrap();
        let ids: Vec<i64> = projects.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(projects[1].client_name(), Some("Ion"));
    }

    #[tokio::test]
    async fn test_unexpected_write_body_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/workers"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/projects/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4, "title": "Revizie"})))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let created: Option<Project> = client
            .post_optional("/workers", &json!({"name": "Ion"}))
            .await
            .unwrap();
        assert!(created.is_none());

        let updated: Option<Project> = client
            .patch("/projects/4", &json!({"status": "done"}))
            .await
            .unwrap();
        assert_eq!(updated.map(|p| p.id), Some(4));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        // Reserve a port, then free it so nothing listens there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new(
            build_http_client(None).unwrap(),
            &format!("http://{}", addr),
            SessionContext::default(),
        );
        let err = client.get::<Value>("/clients").await.unwrap_err();
        assert!(matches!(err, AppError::Unreachable(_)), "got {:?}", err);
    }
}
