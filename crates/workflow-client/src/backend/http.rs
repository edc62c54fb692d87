//! REST backend for the workflow service
//!
//! Every request carries the bearer token from the configured
//! [`CredentialProvider`]. Response statuses are mapped onto [`StoreError`]
//! classes so the store never sees HTTP details.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::WorkflowBackend;
use crate::config::{ClientConfig, CredentialProvider};
use crate::constants::paths;
use crate::error::{Result, StoreError};
use crate::types::{Execution, NewWorkflow, Template, Workflow, WorkflowSummary, WorkflowUpdate};

/// Backend talking to the workflow service over HTTP
pub struct HttpBackend {
    /// HTTP client for API requests
    http_client: reqwest::Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpBackend {
    /// Create a backend with a fresh HTTP client
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::with_client(reqwest::Client::new(), config, credentials)
    }

    /// Create a backend sharing an existing HTTP client
    pub fn with_client(
        http_client: reqwest::Client,
        config: ClientConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            http_client,
            config,
            credentials,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http_client.request(method, self.config.endpoint(path));
        match self.credentials.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and turn any non-success status into an error
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(error_for_status(status, &body))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn fetch_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.fetch(self.request(method, path).json(body)).await
    }
}

fn workflow_path(id: &str) -> String {
    format!("{}{}", paths::WORKFLOWS, id)
}

fn transport_error(e: reqwest::Error) -> StoreError {
    StoreError::Network(e.to_string())
}

/// Map a non-success status onto an error class
fn error_for_status(status: StatusCode, body: &str) -> StoreError {
    let detail = extract_detail(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized(detail),
        StatusCode::NOT_FOUND => StoreError::NotFound(detail),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => StoreError::Conflict(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => StoreError::validation(detail),
        s if s.is_server_error() => StoreError::Network(format!("{}: {}", s.as_u16(), detail)),
        s => StoreError::UnexpectedStatus {
            status: s.as_u16(),
            detail,
        },
    }
}

/// Pull the human-readable message out of an error body
///
/// The service answers `{"detail": "..."}`, or for request validation
/// failures `{"detail": [{"loc": [...], "msg": "..."}]}`.
fn extract_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(json) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.to_string());
    };

    match json.get("detail") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(items)) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let msg = item.get("msg")?.as_str()?;
                    let field = item
                        .get("loc")
                        .and_then(Value::as_array)
                        .and_then(|loc| loc.last())
                        .and_then(Value::as_str);
                    Some(match field {
                        Some(field) => format!("{}: {}", field, msg),
                        None => msg.to_string(),
                    })
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        Some(other) => Some(other.to_string()),
        None => Some(trimmed.to_string()),
    }
}

#[async_trait]
impl WorkflowBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn list_workflows(&self, skip: u32, limit: u32) -> Result<Vec<WorkflowSummary>> {
        let request = self
            .request(Method::GET, paths::WORKFLOWS)
            .query(&[("skip", skip), ("limit", limit)]);
        self.fetch(request).await
    }

    async fn get_workflow(&self, id: &str) -> Result<Workflow> {
        self.fetch(self.request(Method::GET, &workflow_path(id))).await
    }

    async fn create_workflow(&self, request: &NewWorkflow) -> Result<Workflow> {
        self.fetch_json(Method::POST, paths::WORKFLOWS, request).await
    }

    async fn update_workflow(&self, id: &str, update: &WorkflowUpdate) -> Result<Workflow> {
        self.fetch_json(Method::PUT, &workflow_path(id), update).await
    }

    async fn delete_workflow(&self, id: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, &workflow_path(id)))
            .await
            .map(|_| ())
    }

    async fn execute_workflow(&self, id: &str, input: &Value) -> Result<Execution> {
        let path = format!("{}/execute", workflow_path(id));
        self.fetch_json(Method::POST, &path, input).await
    }

    async fn list_executions(&self, workflow_id: &str, skip: u32, limit: u32) -> Result<Vec<Execution>> {
        let path = format!("{}/executions", workflow_path(workflow_id));
        let request = self
            .request(Method::GET, &path)
            .query(&[("skip", skip), ("limit", limit)]);
        self.fetch(request).await
    }

    async fn get_execution(&self, execution_id: &str) -> Result<Execution> {
        let path = format!("{}executions/{}", paths::WORKFLOWS, execution_id);
        self.fetch(self.request(Method::GET, &path)).await
    }

    async fn list_templates(&self, category: Option<&str>, skip: u32, limit: u32) -> Result<Vec<Template>> {
        let mut query = vec![("skip", skip.to_string()), ("limit", limit.to_string())];
        if let Some(category) = category {
            query.push(("category", category.to_string()));
        }
        let request = self.request(Method::GET, paths::TEMPLATES).query(&query);
        self.fetch(request).await
    }

    async fn get_template(&self, id: &str) -> Result<Template> {
        let path = format!("{}{}", paths::TEMPLATES, id);
        self.fetch(self.request(Method::GET, &path)).await
    }
}
