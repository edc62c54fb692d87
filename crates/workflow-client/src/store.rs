//! Workflow store
//!
//! Owns the lifecycle of persisted workflows and the single "current"
//! workflow open in the editor. The store is an explicitly constructed
//! value; tests can run several independent stores in one process.
//!
//! # State
//!
//! ```text
//! Unopened ──open/create──► Clean ──apply_edit──► Dirty
//!                             ▲                     │
//!                             └────────save─────────┘
//! Clean/Dirty ──close/remove──► Closed
//! ```
//!
//! Network calls never run under the state lock. Each guarded operation
//! holds an in-flight flag for its kind while it runs, and a second call of
//! the same kind fails with [`StoreError::OperationInProgress`] instead of
//! queueing. Edits stay allowed while a save is in flight; they land in the
//! next save.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use workflow_graph::{
    has_blocking, EditEvent, EditOutcome, EditorSession, ValidationIssue, WorkflowData, WorkflowGraph,
};

use crate::backend::{collect_pages, WorkflowBackend};
use crate::config::ClientConfig;
use crate::error::{Result, StoreError};
use crate::tracker::ExecutionTracker;
use crate::types::{
    Execution, NewWorkflow, Template, Workflow, WorkflowStatus, WorkflowSummary, WorkflowUpdate,
};

/// Network operations that may not overlap with themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Open,
    Create,
    /// Any write to the current workflow: save, details, status
    Save,
    Remove,
    Execute,
    ListExecutions,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Open => "open",
            Operation::Create => "create",
            Operation::Save => "save",
            Operation::Remove => "remove",
            Operation::Execute => "execute",
            Operation::ListExecutions => "list executions",
        };
        f.write_str(name)
    }
}

/// Lifecycle of the current workflow as seen through the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    /// Nothing has been opened yet
    Unopened,
    /// Open, and the graph matches what was last saved
    Clean,
    /// Open with edits not yet saved
    Dirty,
    /// The workflow was closed or deleted
    Closed,
}

/// The open workflow and its editor
struct OpenWorkflow {
    workflow: Workflow,
    session: EditorSession,
    /// Session revision of the last successful save
    saved_revision: u64,
}

impl OpenWorkflow {
    fn new(workflow: Workflow) -> Result<Self> {
        let graph = WorkflowGraph::from_value(workflow.workflow_data.clone())?;
        Ok(Self {
            workflow,
            session: EditorSession::from_graph(graph),
            saved_revision: 0,
        })
    }

    fn is_dirty(&self) -> bool {
        self.session.revision() != self.saved_revision
    }
}

#[derive(Default)]
struct StoreState {
    current: Option<OpenWorkflow>,
    closed: bool,
    summaries: Vec<WorkflowSummary>,
}

impl StoreState {
    fn current_mut(&mut self) -> Result<&mut OpenWorkflow> {
        self.current.as_mut().ok_or(StoreError::NoCurrentWorkflow)
    }

    fn current_ref(&self) -> Result<&OpenWorkflow> {
        self.current.as_ref().ok_or(StoreError::NoCurrentWorkflow)
    }

    fn set_current(&mut self, open: OpenWorkflow) {
        if let Some(previous) = self.current.take() {
            if previous.is_dirty() {
                log::warn!(
                    "Discarding unsaved edits to workflow '{}'",
                    previous.workflow.id
                );
            }
        }
        self.current = Some(open);
        self.closed = false;
    }

    fn upsert_summary(&mut self, workflow: &Workflow) {
        let summary = workflow.summary();
        match self.summaries.iter_mut().find(|s| s.id == summary.id) {
            Some(existing) => *existing = summary,
            None => self.summaries.push(summary),
        }
    }
}

/// Clears an in-flight flag when the operation ends, however it ends
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<Operation>>,
    operation: Operation,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.operation);
    }
}

/// Store for persisted workflows and the current editor session
pub struct WorkflowStore {
    backend: Arc<dyn WorkflowBackend>,
    config: ClientConfig,
    state: Mutex<StoreState>,
    in_flight: Mutex<HashSet<Operation>>,
}

impl WorkflowStore {
    pub fn new(backend: Arc<dyn WorkflowBackend>, config: ClientConfig) -> Self {
        Self {
            backend,
            config,
            state: Mutex::new(StoreState::default()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn begin(&self, operation: Operation) -> Result<InFlightGuard<'_>> {
        if !self.in_flight.lock().insert(operation) {
            log::warn!("Rejected {}: already in progress", operation);
            return Err(StoreError::OperationInProgress(operation));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            operation,
        })
    }

    /// Whether an operation of this kind is running
    pub fn is_busy(&self, operation: Operation) -> bool {
        self.in_flight.lock().contains(&operation)
    }

    // =========================================================================
    // Current workflow
    // =========================================================================

    pub fn status(&self) -> StoreStatus {
        let state = self.state.lock();
        match state.current {
            Some(ref open) if open.is_dirty() => StoreStatus::Dirty,
            Some(_) => StoreStatus::Clean,
            None if state.closed => StoreStatus::Closed,
            None => StoreStatus::Unopened,
        }
    }

    /// Cached copy of the current workflow as last loaded or saved
    pub fn current(&self) -> Option<Workflow> {
        self.state
            .lock()
            .current
            .as_ref()
            .map(|open| open.workflow.clone())
    }

    pub fn current_id(&self) -> Option<String> {
        self.state
            .lock()
            .current
            .as_ref()
            .map(|open| open.workflow.id.clone())
    }

    /// Apply an edit to the current graph
    ///
    /// Graph rejections come back as [`StoreError::Graph`] and leave the
    /// store's status unchanged.
    pub fn apply_edit(&self, event: EditEvent) -> Result<EditOutcome> {
        let mut state = self.state.lock();
        Ok(state.current_mut()?.session.apply_edit(event)?)
    }

    pub fn undo(&self) -> Result<bool> {
        let mut state = self.state.lock();
        Ok(state.current_mut()?.session.undo()?)
    }

    pub fn redo(&self) -> Result<bool> {
        let mut state = self.state.lock();
        Ok(state.current_mut()?.session.redo()?)
    }

    /// Snapshot of the current graph for rendering
    pub fn snapshot(&self) -> Result<WorkflowData> {
        Ok(self.state.lock().current_ref()?.session.snapshot())
    }

    /// Execution-readiness issues of the current graph
    pub fn validate(&self) -> Result<Vec<ValidationIssue>> {
        Ok(self.state.lock().current_ref()?.session.validate())
    }

    /// Close the current workflow, dropping any unsaved edits
    pub fn close(&self) {
        let mut state = self.state.lock();
        if let Some(previous) = state.current.take() {
            if previous.is_dirty() {
                log::warn!(
                    "Closing workflow '{}' with unsaved edits",
                    previous.workflow.id
                );
            }
            state.closed = true;
            log::info!("Closed workflow '{}'", previous.workflow.id);
        }
    }

    // =========================================================================
    // Workflow CRUD
    // =========================================================================

    /// Fetch every workflow owned by the current user
    pub async fn list(&self) -> Result<Vec<WorkflowSummary>> {
        let _guard = self.begin(Operation::List)?;
        log::debug!("Listing workflows via {}", self.backend.name());

        let summaries = collect_pages(self.config.effective_page_size(), |skip, limit| {
            self.backend.list_workflows(skip, limit)
        })
        .await?;

        self.state.lock().summaries = summaries.clone();
        log::info!("Listed {} workflows", summaries.len());
        Ok(summaries)
    }

    /// Summaries from the last listing, kept in sync with local changes
    pub fn cached_summaries(&self) -> Vec<WorkflowSummary> {
        self.state.lock().summaries.clone()
    }

    /// Load a workflow and make it current
    pub async fn open(&self, id: &str) -> Result<Workflow> {
        let _guard = self.begin(Operation::Open)?;
        log::debug!("Opening workflow '{}'", id);

        let workflow = self.backend.get_workflow(id).await?;
        let open = OpenWorkflow::new(workflow.clone())?;

        self.state.lock().set_current(open);
        log::info!("Opened workflow '{}'", id);
        Ok(workflow)
    }

    /// Create a workflow with an empty graph and make it current
    pub async fn create(&self, name: &str, description: &str) -> Result<Workflow> {
        let request = NewWorkflow {
            name: name.trim().to_string(),
            description: non_empty(description),
            workflow_data: WorkflowData::default().to_value()?,
            template_id: None,
            trigger_config: None,
        };
        self.create_with(request).await
    }

    /// Create a workflow seeded with a template's graph and make it current
    ///
    /// The template graph must load cleanly; a malformed template fails
    /// with a schema error before anything is created.
    pub async fn create_from_template(&self, template_id: &str, name: &str, description: &str) -> Result<Workflow> {
        let template = self.backend.get_template(template_id).await?;
        let graph = WorkflowGraph::from_value(template.template_data)?;

        let request = NewWorkflow {
            name: name.trim().to_string(),
            description: non_empty(description).or(template.description),
            workflow_data: graph.to_data().to_value()?,
            template_id: Some(template.id),
            trigger_config: None,
        };
        self.create_with(request).await
    }

    async fn create_with(&self, request: NewWorkflow) -> Result<Workflow> {
        if request.name.is_empty() {
            return Err(StoreError::validation("name: must not be empty"));
        }
        let _guard = self.begin(Operation::Create)?;
        log::debug!("Creating workflow '{}'", request.name);

        let workflow = self.backend.create_workflow(&request).await?;
        let open = OpenWorkflow::new(workflow.clone())?;

        let mut state = self.state.lock();
        state.upsert_summary(&workflow);
        state.set_current(open);
        log::info!("Created workflow '{}' ({})", workflow.name, workflow.id);
        Ok(workflow)
    }

    /// Persist the current graph as a full replace
    ///
    /// The in-memory graph is not touched. Edits made while the request is
    /// in flight keep the store dirty afterwards.
    pub async fn save(&self) -> Result<Workflow> {
        let _guard = self.begin(Operation::Save)?;

        let (id, revision, update) = {
            let state = self.state.lock();
            let open = state.current_ref()?;
            let data = open.session.snapshot().to_value()?;
            (
                open.workflow.id.clone(),
                open.session.revision(),
                WorkflowUpdate::replace(&open.workflow, data),
            )
        };

        log::debug!("Saving workflow '{}' at revision {}", id, revision);
        let saved = self.backend.update_workflow(&id, &update).await.inspect_err(|e| {
            log::warn!("Failed to save workflow '{}': {}", id, e);
        })?;

        self.finish_write(&saved, Some(revision));
        log::info!("Saved workflow '{}'", id);
        Ok(saved)
    }

    /// Rename or re-describe the current workflow
    ///
    /// Sends the last saved graph, so unsaved edits stay unsaved.
    pub async fn update_details(&self, name: &str, description: &str) -> Result<Workflow> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::validation("name: must not be empty"));
        }
        self.write_metadata(|workflow| {
            workflow.name = name.to_string();
            workflow.description = non_empty(description);
        })
        .await
    }

    /// Change the status of the current workflow
    pub async fn set_status(&self, status: WorkflowStatus) -> Result<Workflow> {
        self.write_metadata(|workflow| workflow.status = status).await
    }

    async fn write_metadata(&self, edit: impl FnOnce(&mut Workflow)) -> Result<Workflow> {
        let _guard = self.begin(Operation::Save)?;

        let (id, update) = {
            let state = self.state.lock();
            let mut workflow = state.current_ref()?.workflow.clone();
            edit(&mut workflow);
            let data = workflow.workflow_data.clone();
            (workflow.id.clone(), WorkflowUpdate::replace(&workflow, data))
        };

        log::debug!("Updating details of workflow '{}'", id);
        let saved = self.backend.update_workflow(&id, &update).await?;
        self.finish_write(&saved, None);
        Ok(saved)
    }

    /// Record a completed write
    ///
    /// The current workflow only changes if it is still the one written;
    /// a late response must not touch a workflow opened since.
    fn finish_write(&self, saved: &Workflow, revision: Option<u64>) {
        let mut state = self.state.lock();
        state.upsert_summary(saved);

        match state.current.as_mut() {
            Some(open) if open.workflow.id == saved.id => {
                open.workflow = saved.clone();
                if let Some(revision) = revision {
                    open.saved_revision = revision;
                    if open.is_dirty() {
                        log::debug!("Workflow '{}' was edited during save", saved.id);
                    }
                }
            }
            _ => log::warn!(
                "Write to workflow '{}' completed after it was closed",
                saved.id
            ),
        }
    }

    /// Delete a workflow, closing it if it is current
    pub async fn remove(&self, id: &str) -> Result<()> {
        let _guard = self.begin(Operation::Remove)?;
        log::debug!("Deleting workflow '{}'", id);

        self.backend.delete_workflow(id).await?;

        let mut state = self.state.lock();
        state.summaries.retain(|s| s.id != id);
        if state.current.as_ref().is_some_and(|open| open.workflow.id == id) {
            state.current = None;
            state.closed = true;
        }
        log::info!("Deleted workflow '{}'", id);
        Ok(())
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Start an execution of a saved workflow
    ///
    /// For the current workflow this fails with [`StoreError::StaleGraph`]
    /// when there are unsaved edits, before any readiness check. Blocking
    /// readiness issues fail with [`StoreError::Validation`]. Other
    /// workflows are fetched and checked as persisted.
    pub async fn execute(&self, workflow_id: &str, input: Value) -> Result<Execution> {
        let _guard = self.begin(Operation::Execute)?;

        let local_issues = {
            let state = self.state.lock();
            match state.current.as_ref() {
                Some(open) if open.workflow.id == workflow_id => {
                    if open.is_dirty() {
                        log::warn!("Refusing to execute '{}': unsaved edits", workflow_id);
                        return Err(StoreError::StaleGraph);
                    }
                    Some(open.session.validate())
                }
                _ => None,
            }
        };

        let issues = match local_issues {
            Some(issues) => issues,
            None => {
                let workflow = self.backend.get_workflow(workflow_id).await?;
                WorkflowGraph::from_value(workflow.workflow_data)?.validate_for_execution()
            }
        };
        ensure_executable(workflow_id, issues)?;

        log::debug!("Executing workflow '{}'", workflow_id);
        let execution = self.backend.execute_workflow(workflow_id, &input).await?;
        log::info!(
            "Started execution '{}' of workflow '{}' ({})",
            execution.id,
            workflow_id,
            execution.status
        );
        Ok(execution)
    }

    /// Execution history of a workflow, most recent first
    pub async fn list_executions(&self, workflow_id: &str) -> Result<Vec<Execution>> {
        let _guard = self.begin(Operation::ListExecutions)?;

        let mut executions = collect_pages(self.config.effective_page_size(), |skip, limit| {
            self.backend.list_executions(workflow_id, skip, limit)
        })
        .await?;
        sort_most_recent_first(&mut executions);
        Ok(executions)
    }

    /// Tracker for a workflow's executions, sharing this store's backend
    pub fn tracker(&self, workflow_id: &str) -> ExecutionTracker {
        ExecutionTracker::new(self.backend.clone(), workflow_id, self.config.clone())
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Published templates, optionally in one category
    pub async fn list_templates(&self, category: Option<&str>) -> Result<Vec<Template>> {
        collect_pages(self.config.effective_page_size(), |skip, limit| {
            self.backend.list_templates(category, skip, limit)
        })
        .await
    }

    pub async fn get_template(&self, id: &str) -> Result<Template> {
        self.backend.get_template(id).await
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn ensure_executable(workflow_id: &str, issues: Vec<ValidationIssue>) -> Result<()> {
    if !has_blocking(&issues) {
        return Ok(());
    }

    let blocking: Vec<ValidationIssue> = issues.into_iter().filter(|i| i.is_blocking()).collect();
    let detail = blocking
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    log::warn!("Refusing to execute '{}': {}", workflow_id, detail);
    Err(StoreError::Validation {
        detail,
        issues: blocking,
    })
}

pub(crate) fn sort_most_recent_first(executions: &mut [Execution]) {
    executions.sort_by(|a, b| {
        b.started_at
            .cmp(&a.started_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
