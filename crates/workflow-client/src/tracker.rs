//! Execution tracking
//!
//! Execution semantics live in the service; the tracker only lists and
//! polls execution records for one workflow and keeps the last view.

use std::sync::Arc;

use crate::backend::{collect_pages, WorkflowBackend};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::store::sort_most_recent_first;
use crate::types::{Execution, WorkflowId};

/// Cached view of one workflow's executions
pub struct ExecutionTracker {
    backend: Arc<dyn WorkflowBackend>,
    workflow_id: WorkflowId,
    config: ClientConfig,
    /// Most recent first
    executions: Vec<Execution>,
}

impl ExecutionTracker {
    pub fn new(backend: Arc<dyn WorkflowBackend>, workflow_id: &str, config: ClientConfig) -> Self {
        Self {
            backend,
            workflow_id: workflow_id.to_string(),
            config,
            executions: Vec::new(),
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Re-fetch the execution history
    pub async fn refresh(&mut self) -> Result<&[Execution]> {
        let backend = &self.backend;
        let workflow_id = self.workflow_id.as_str();
        let mut executions = collect_pages(self.config.effective_page_size(), |skip, limit| {
            backend.list_executions(workflow_id, skip, limit)
        })
        .await?;

        sort_most_recent_first(&mut executions);
        log::debug!(
            "Workflow '{}' has {} executions",
            self.workflow_id,
            executions.len()
        );
        self.executions = executions;
        Ok(&self.executions)
    }

    /// Last fetched history, most recent first
    pub fn executions(&self) -> &[Execution] {
        &self.executions
    }

    pub fn latest(&self) -> Option<&Execution> {
        self.executions.first()
    }

    pub fn find(&self, execution_id: &str) -> Option<&Execution> {
        self.executions.iter().find(|e| e.id == execution_id)
    }

    /// Executions that have not reached a terminal status
    pub fn active(&self) -> impl Iterator<Item = &Execution> {
        self.executions.iter().filter(|e| !e.status.is_terminal())
    }

    /// Fetch one execution and update the cached copy
    pub async fn get_execution(&mut self, execution_id: &str) -> Result<Execution> {
        let execution = self.backend.get_execution(execution_id).await?;
        self.remember(execution.clone());
        Ok(execution)
    }

    /// Poll an execution until it reaches a terminal status
    ///
    /// Polls at most `max_polls` times, `poll_interval_ms` apart, and returns
    /// the last record seen, terminal or not. Each poll waits for its
    /// request to resolve.
    pub async fn wait_for_completion(&mut self, execution_id: &str) -> Result<Execution> {
        let max_polls = self.config.max_polls.max(1);
        let mut polls = 0;

        loop {
            let execution = self.get_execution(execution_id).await?;
            polls += 1;

            if execution.status.is_terminal() {
                log::info!("Execution '{}' finished: {}", execution_id, execution.status);
                return Ok(execution);
            }
            if polls >= max_polls {
                log::warn!(
                    "Execution '{}' still {} after {} polls",
                    execution_id,
                    execution.status,
                    polls
                );
                return Ok(execution);
            }

            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    fn remember(&mut self, execution: Execution) {
        match self.executions.iter_mut().find(|e| e.id == execution.id) {
            Some(existing) => *existing = execution,
            None => {
                self.executions.push(execution);
                sort_most_recent_first(&mut self.executions);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::types::{ExecutionStatus, NewWorkflow};
    use serde_json::{json, Value};

    async fn backend_with_workflow() -> (Arc<MemoryBackend>, String) {
        let backend = Arc::new(MemoryBackend::new());
        let wf = backend
            .create_workflow(&NewWorkflow {
                name: "Tracked".into(),
                description: None,
                workflow_data: json!({"nodes": [], "edges": []}),
                template_id: None,
                trigger_config: None,
            })
            .await
            .unwrap();
        (backend, wf.id)
    }

    fn fast_config() -> ClientConfig {
        ClientConfig {
            poll_interval_ms: 1,
            max_polls: 3,
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn test_refresh_and_queries() {
        let (backend, id) = backend_with_workflow().await;
        let first = backend.execute_workflow(&id, &Value::Null).await.unwrap();
        let second = backend.execute_workflow(&id, &Value::Null).await.unwrap();
        backend
            .set_execution_status(&first.id, ExecutionStatus::Failed, None)
            .unwrap();

        let mut tracker = ExecutionTracker::new(backend.clone(), &id, fast_config());
        assert!(tracker.latest().is_none());
        assert_eq!(tracker.refresh().await.unwrap().len(), 2);

        assert_eq!(tracker.find(&first.id).unwrap().status, ExecutionStatus::Failed);
        let active: Vec<&str> = tracker.active().map(|e| e.id.as_str()).collect();
        assert_eq!(active, vec![second.id.as_str()]);
        assert!(tracker.latest().is_some());
    }

    #[tokio::test]
    async fn test_wait_returns_terminal_record() {
        let (backend, id) = backend_with_workflow().await;
        let execution = backend.execute_workflow(&id, &Value::Null).await.unwrap();
        backend
            .set_execution_status(&execution.id, ExecutionStatus::Completed, Some(json!({"sent": 3})))
            .unwrap();

        let mut tracker = ExecutionTracker::new(backend.clone(), &id, fast_config());
        let done = tracker.wait_for_completion(&execution.id).await.unwrap();
        assert_eq!(done.status, ExecutionStatus::Completed);
        assert_eq!(done.output_data, Some(json!({"sent": 3})));
        assert_eq!(backend.request_count("get_execution"), 1);
        assert!(tracker.find(&execution.id).is_some());
    }

    #[tokio::test]
    async fn test_wait_gives_up_after_max_polls() {
        let (backend, id) = backend_with_workflow().await;
        let execution = backend.execute_workflow(&id, &Value::Null).await.unwrap();

        let mut tracker = ExecutionTracker::new(backend.clone(), &id, fast_config());
        let last = tracker.wait_for_completion(&execution.id).await.unwrap();
        assert_eq!(last.status, ExecutionStatus::Queued);
        assert_eq!(backend.request_count("get_execution"), 3);
    }

    #[tokio::test]
    async fn test_wait_for_unknown_execution() {
        let (backend, id) = backend_with_workflow().await;
        let mut tracker = ExecutionTracker::new(backend, &id, fast_config());
        let result = tracker.wait_for_completion("missing").await;
        assert!(matches!(result, Err(crate::error::StoreError::NotFound(_))));
    }
}
