//! Client configuration
//!
//! Connection settings for the workflow service, plus the seam through which
//! the session-management layer supplies bearer credentials.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{defaults, env};

/// Connection and polling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service address, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Path prefix inserted before every endpoint (may be empty)
    pub api_prefix: String,
    /// Page size used when listing workflows, executions and templates
    pub page_size: u32,
    /// Delay between execution status polls
    pub poll_interval_ms: u64,
    /// Upper bound on polls per `wait_for_completion`
    pub max_polls: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            api_prefix: defaults::API_PREFIX.to_string(),
            page_size: defaults::PAGE_SIZE,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            max_polls: defaults::MAX_POLLS,
        }
    }
}

impl ClientConfig {
    /// Build a config from `WORKFLOW_*` environment variables
    ///
    /// Unset variables keep their defaults. Unparsable ones are logged and
    /// also keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup(env::API_URL).filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(size) = parse_var(&lookup, env::PAGE_SIZE) {
            config.page_size = size;
        }
        if let Some(interval) = parse_var(&lookup, env::POLL_INTERVAL_MS) {
            config.poll_interval_ms = interval;
        }

        config
    }

    /// Full URL for an endpoint path
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.api_prefix.trim_end_matches('/'),
            path
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Page size, never zero
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.max(1)
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}

/// Source of the bearer credential attached to every request
///
/// Implemented by the session-management layer. Returning `None` sends the
/// request unauthenticated, which the service answers with 401.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed bearer token
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// No credentials at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.page_size, defaults::PAGE_SIZE);
    }

    #[test]
    fn test_values_from_environment() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("WORKFLOW_API_URL", "https://api.example.com/"),
            ("WORKFLOW_API_PAGE_SIZE", "25"),
            ("WORKFLOW_POLL_INTERVAL_MS", "250"),
        ]));
        assert_eq!(config.base_url, "https://api.example.com/");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("WORKFLOW_API_PAGE_SIZE", "lots"),
            ("WORKFLOW_POLL_INTERVAL_MS", "-5"),
        ]));
        assert_eq!(config.page_size, defaults::PAGE_SIZE);
        assert_eq!(config.poll_interval_ms, defaults::POLL_INTERVAL_MS);
    }

    #[test]
    fn test_endpoint_joins_prefix() {
        let config = ClientConfig {
            base_url: "http://host:9000/".into(),
            api_prefix: "/api/v1/".into(),
            ..ClientConfig::default()
        };
        assert_eq!(config.endpoint("/workflows/"), "http://host:9000/api/v1/workflows/");

        let config = ClientConfig::default();
        assert_eq!(config.endpoint("/workflows/abc"), "http://localhost:8000/workflows/abc");
    }

    #[test]
    fn test_credentials() {
        assert_eq!(StaticToken("abc".into()).bearer_token().as_deref(), Some("abc"));
        assert!(NoCredentials.bearer_token().is_none());
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: ClientConfig = serde_json::from_str(r#"{"page_size": 10}"#).unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.base_url, defaults::BASE_URL);
    }
}
