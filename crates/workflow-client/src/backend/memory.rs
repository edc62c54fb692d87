//! In-process workflow backend with optional file persistence
//!
//! Implements the service contract against in-memory maps. With
//! persistence enabled, each workflow is also written to
//! `<dir>/<id>.json` and can be loaded back on startup. Executions are
//! recorded as `queued` and only move when [`MemoryBackend::set_execution_status`]
//! is called, since there is no engine behind this backend.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;

use super::WorkflowBackend;
use crate::error::{Result, StoreError};
use crate::types::{
    Execution, ExecutionStatus, NewWorkflow, Template, Workflow, WorkflowStatus, WorkflowSummary,
    WorkflowUpdate,
};

/// Owner recorded on workflows and executions created here
const LOCAL_USER: &str = "local";

#[derive(Debug, Default)]
struct MemoryState {
    workflows: BTreeMap<String, Workflow>,
    executions: Vec<Execution>,
    templates: BTreeMap<String, Template>,
}

/// In-memory backend, usable as a test stub or an offline store
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    /// Requests received, keyed by operation name
    requests: Mutex<HashMap<&'static str, usize>>,
    /// Optional directory for file persistence
    persist_path: Option<PathBuf>,
}

impl MemoryBackend {
    /// Create a backend without persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that persists workflows to the given directory
    ///
    /// The directory is created on first write.
    pub fn with_persistence(path: impl AsRef<Path>) -> Self {
        Self {
            persist_path: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    fn workflow_path(&self, id: &str) -> Option<PathBuf> {
        self.persist_path
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", id)))
    }

    /// Load every `*.json` workflow in the persistence directory
    ///
    /// Returns the number loaded. Unparsable files are logged and skipped.
    pub fn load_from_disk(&self) -> Result<usize> {
        let Some(dir) = self.persist_path.as_deref().filter(|dir| dir.is_dir()) else {
            return Ok(0);
        };

        let mut loaded = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = std::fs::read(&path)
                .map_err(StoreError::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<Workflow>(&bytes)?));
            match parsed {
                Ok(workflow) => loaded.push(workflow),
                Err(e) => log::warn!("Skipping unreadable workflow file {}: {}", path.display(), e),
            }
        }

        let count = loaded.len();
        let mut state = self.state.lock();
        for workflow in loaded {
            state.workflows.insert(workflow.id.clone(), workflow);
        }
        log::info!("Loaded {} workflows from {}", count, dir.display());
        Ok(count)
    }

    /// Write a workflow file as a full replace
    ///
    /// The JSON goes to a temporary file in the same directory which is
    /// then renamed over the target, so readers never see a partial file.
    fn write_file(&self, workflow: &Workflow) -> Result<()> {
        let (Some(dir), Some(path)) = (self.persist_path.as_deref(), self.workflow_path(&workflow.id)) else {
            return Ok(());
        };

        std::fs::create_dir_all(dir)?;
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(staged.as_file_mut(), workflow)?;
        staged.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        log::debug!("Wrote workflow '{}' to {}", workflow.id, path.display());
        Ok(())
    }

    fn remove_file(&self, id: &str) -> Result<()> {
        let Some(path) = self.workflow_path(id) else {
            return Ok(());
        };
        match std::fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Removed workflow file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Publish a template
    pub fn insert_template(&self, template: Template) {
        self.state
            .lock()
            .templates
            .insert(template.id.clone(), template);
    }

    /// Move an execution to a new status, as an engine would
    ///
    /// Terminal statuses also stamp `completed_at`.
    pub fn set_execution_status(
        &self,
        execution_id: &str,
        status: ExecutionStatus,
        output: Option<Value>,
    ) -> Result<Execution> {
        let mut state = self.state.lock();
        let execution = state
            .executions
            .iter_mut()
            .find(|e| e.id == execution_id)
            .ok_or_else(|| StoreError::NotFound(format!("Execution '{}' not found", execution_id)))?;

        if status.is_terminal() {
            execution.completed_at = Some(Utc::now());
        }
        execution.status = status;
        if output.is_some() {
            execution.output_data = output;
        }
        Ok(execution.clone())
    }

    /// Number of requests received for an operation, e.g. `"update_workflow"`
    pub fn request_count(&self, operation: &str) -> usize {
        self.requests.lock().get(operation).copied().unwrap_or(0)
    }

    fn count(&self, operation: &'static str) {
        *self.requests.lock().entry(operation).or_insert(0) += 1;
    }
}

fn page<T>(items: impl Iterator<Item = T>, skip: u32, limit: u32) -> Vec<T> {
    items.skip(skip as usize).take(limit as usize).collect()
}

fn workflow_not_found(id: &str) -> StoreError {
    StoreError::NotFound(format!("Workflow '{}' not found", id))
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StoreError::validation("name: must not be empty"));
    }
    Ok(())
}

#[async_trait]
impl WorkflowBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list_workflows(&self, skip: u32, limit: u32) -> Result<Vec<WorkflowSummary>> {
        self.count("list_workflows");
        let state = self.state.lock();
        let mut workflows: Vec<&Workflow> = state.workflows.values().collect();
        workflows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(page(workflows.into_iter().map(Workflow::summary), skip, limit))
    }

    async fn get_workflow(&self, id: &str) -> Result<Workflow> {
        self.count("get_workflow");
        self.state
            .lock()
            .workflows
            .get(id)
            .cloned()
            .ok_or_else(|| workflow_not_found(id))
    }

    async fn create_workflow(&self, request: &NewWorkflow) -> Result<Workflow> {
        self.count("create_workflow");
        require_name(&request.name)?;

        let now = Utc::now();
        let workflow = Workflow {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name.clone(),
            description: request.description.clone(),
            status: WorkflowStatus::Draft,
            workflow_data: request.workflow_data.clone(),
            trigger_config: request.trigger_config.clone(),
            template_id: request.template_id.clone(),
            user_id: Some(LOCAL_USER.to_string()),
            created_at: Some(now),
            updated_at: Some(now),
        };

        let mut state = self.state.lock();
        self.write_file(&workflow)?;
        state.workflows.insert(workflow.id.clone(), workflow.clone());
        Ok(workflow)
    }

    async fn update_workflow(&self, id: &str, update: &WorkflowUpdate) -> Result<Workflow> {
        self.count("update_workflow");
        if let Some(ref name) = update.name {
            require_name(name)?;
        }

        // Check, merge, write and insert under one lock so a concurrent
        // delete either wins outright or sees the update
        let mut state = self.state.lock();
        let mut updated = state
            .workflows
            .get(id)
            .cloned()
            .ok_or_else(|| workflow_not_found(id))?;

        if let Some(ref name) = update.name {
            updated.name = name.clone();
        }
        if let Some(ref description) = update.description {
            updated.description = description.clone();
        }
        if let Some(ref data) = update.workflow_data {
            updated.workflow_data = data.clone();
        }
        if let Some(ref status) = update.status {
            updated.status = status.clone();
        }
        if update.trigger_config.is_some() {
            updated.trigger_config = update.trigger_config.clone();
        }
        updated.updated_at = Some(Utc::now());

        self.write_file(&updated)?;
        state.workflows.insert(id.to_string(), updated.clone());
        Ok(updated)
    }

    async fn delete_workflow(&self, id: &str) -> Result<()> {
        self.count("delete_workflow");
        let mut state = self.state.lock();
        if !state.workflows.contains_key(id) {
            return Err(workflow_not_found(id));
        }
        self.remove_file(id)?;
        state.workflows.remove(id);
        Ok(())
    }

    async fn execute_workflow(&self, id: &str, input: &Value) -> Result<Execution> {
        self.count("execute_workflow");
        let mut state = self.state.lock();
        if !state.workflows.contains_key(id) {
            return Err(workflow_not_found(id));
        }

        let execution = Execution {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: id.to_string(),
            user_id: Some(LOCAL_USER.to_string()),
            status: ExecutionStatus::Queued,
            input_data: (!input.is_null()).then(|| input.clone()),
            output_data: None,
            error_message: None,
            execution_logs: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        };
        state.executions.push(execution.clone());
        Ok(execution)
    }

    async fn list_executions(&self, workflow_id: &str, skip: u32, limit: u32) -> Result<Vec<Execution>> {
        self.count("list_executions");
        let state = self.state.lock();
        let matching = state
            .executions
            .iter()
            .rev()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned();
        Ok(page(matching, skip, limit))
    }

    async fn get_execution(&self, execution_id: &str) -> Result<Execution> {
        self.count("get_execution");
        self.state
            .lock()
            .executions
            .iter()
            .find(|e| e.id == execution_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Execution '{}' not found", execution_id)))
    }

    async fn list_templates(&self, category: Option<&str>, skip: u32, limit: u32) -> Result<Vec<Template>> {
        self.count("list_templates");
        let state = self.state.lock();
        let matching = state
            .templates
            .values()
            .filter(|t| t.is_published)
            .filter(|t| category.is_none() || t.category.as_deref() == category)
            .cloned();
        Ok(page(matching, skip, limit))
    }

    async fn get_template(&self, id: &str) -> Result<Template> {
        self.count("get_template");
        self.state
            .lock()
            .templates
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Template '{}' not found", id)))
    }
}
