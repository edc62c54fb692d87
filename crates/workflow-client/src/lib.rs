//! Workflow Client - persisted workflows and executions
//!
//! This crate keeps the editor's in-memory graph in step with the workflow
//! service. It provides:
//!
//! - `WorkflowStore`: CRUD for workflows plus the one workflow open in the editor
//! - `ExecutionTracker`: Execution history and status polling
//! - `WorkflowBackend`: The service contract, with REST and in-memory implementations
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use workflow_client::{ClientConfig, HttpBackend, StaticToken, WorkflowStore};
//!
//! let config = ClientConfig::from_env();
//! let backend = HttpBackend::new(config.clone(), Arc::new(StaticToken(token)));
//! let store = WorkflowStore::new(Arc::new(backend), config);
//!
//! store.open(&workflow_id).await?;
//! store.apply_edit(event)?;
//! store.save().await?;
//! let execution = store.execute(&workflow_id, serde_json::json!({})).await?;
//! ```

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod store;
pub mod tracker;
pub mod types;

// Re-export key types
pub use backend::{HttpBackend, MemoryBackend, WorkflowBackend};
pub use config::{ClientConfig, CredentialProvider, NoCredentials, StaticToken};
pub use error::{Result, StoreError};
pub use store::{Operation, StoreStatus, WorkflowStore};
pub use tracker::ExecutionTracker;
pub use types::{
    Execution, ExecutionId, ExecutionStatus, NewWorkflow, Template, TemplateId, Workflow,
    WorkflowId, WorkflowStatus, WorkflowSummary, WorkflowUpdate,
};
