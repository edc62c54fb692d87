//! Client-wide constants
//!
//! Single source of truth for endpoint paths and configuration defaults.

/// Default values for client configuration
pub mod defaults {
    /// Workflow service address
    pub const BASE_URL: &str = "http://localhost:8000";
    /// Path prefix placed between the base URL and every endpoint
    pub const API_PREFIX: &str = "";
    /// Records requested per page when listing
    pub const PAGE_SIZE: u32 = 100;
    /// Delay between execution status polls
    pub const POLL_INTERVAL_MS: u64 = 1000;
    /// Polls before `wait_for_completion` gives up and returns what it has
    pub const MAX_POLLS: u32 = 300;
}

/// Environment variables read by `ClientConfig::from_env`
pub mod env {
    pub const API_URL: &str = "WORKFLOW_API_URL";
    pub const PAGE_SIZE: &str = "WORKFLOW_API_PAGE_SIZE";
    pub const POLL_INTERVAL_MS: &str = "WORKFLOW_POLL_INTERVAL_MS";
}

/// REST endpoint paths
pub mod paths {
    pub const WORKFLOWS: &str = "/workflows/";
    pub const TEMPLATES: &str = "/templates/";
}
