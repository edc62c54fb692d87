//! Workflow service backend abstraction
//!
//! The store talks to the service through the [`WorkflowBackend`] trait,
//! so the same store runs against the REST service ([`HttpBackend`]) or an
//! in-process stand-in ([`MemoryBackend`]) for tests and offline use.

pub mod http;
pub mod memory;

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::{Execution, NewWorkflow, Template, Workflow, WorkflowSummary, WorkflowUpdate};

pub use http::HttpBackend;
pub use memory::MemoryBackend;

/// Contract of the workflow service
///
/// Listing calls take `skip`/`limit` and return one page; callers page
/// until a short page arrives.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    async fn list_workflows(&self, skip: u32, limit: u32) -> Result<Vec<WorkflowSummary>>;

    async fn get_workflow(&self, id: &str) -> Result<Workflow>;

    async fn create_workflow(&self, request: &NewWorkflow) -> Result<Workflow>;

    /// Apply an update; the returned workflow is the stored result
    async fn update_workflow(&self, id: &str, update: &WorkflowUpdate) -> Result<Workflow>;

    async fn delete_workflow(&self, id: &str) -> Result<()>;

    /// Start an execution of the persisted graph
    async fn execute_workflow(&self, id: &str, input: &Value) -> Result<Execution>;

    async fn list_executions(&self, workflow_id: &str, skip: u32, limit: u32) -> Result<Vec<Execution>>;

    async fn get_execution(&self, execution_id: &str) -> Result<Execution>;

    async fn list_templates(&self, category: Option<&str>, skip: u32, limit: u32) -> Result<Vec<Template>>;

    async fn get_template(&self, id: &str) -> Result<Template>;
}

/// Fetch every page of a listing
///
/// Returns the full set or the first error; partial results are dropped.
pub(crate) async fn collect_pages<T, F, Fut>(page_size: u32, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let page_size = page_size.max(1);
    let mut all = Vec::new();
    let mut skip = 0;

    loop {
        let page = fetch(skip, page_size).await?;
        let received = page.len();
        all.extend(page);
        if received < page_size as usize {
            break;
        }
        skip += page_size;
    }

    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[tokio::test]
    async fn test_collect_pages_until_short_page() {
        let items: Vec<u32> = (0..7).collect();
        let mut calls = 0;
        let all = collect_pages(3, |skip, limit| {
            calls += 1;
            let page: Vec<u32> = items
                .iter()
                .copied()
                .skip(skip as usize)
                .take(limit as usize)
                .collect();
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(all, items);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_collect_pages_exact_multiple_needs_empty_page() {
        let mut calls = 0;
        let all = collect_pages(2, |skip, _| {
            calls += 1;
            let page = if skip < 4 { vec![skip, skip + 1] } else { vec![] };
            async move { Ok(page) }
        })
        .await
        .unwrap();

        assert_eq!(all, vec![0, 1, 2, 3]);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_collect_pages_fails_whole_listing() {
        let result: Result<Vec<u32>> = collect_pages(1, |skip, _| async move {
            if skip == 0 {
                Ok(vec![1])
            } else {
                Err(StoreError::Network("connection reset".into()))
            }
        })
        .await;
        assert!(matches!(result, Err(StoreError::Network(_))));
    }
}
