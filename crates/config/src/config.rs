use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for one GraphQL endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// HTTP endpoint for queries and mutations
    pub endpoint: String,

    /// Websocket endpoint for subscriptions (default: `endpoint` with a ws scheme)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_endpoint: Option<String>,

    /// Path to the persisted definitions artifact, relative to the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<String>,

    /// Headers sent with every request and with the subscription handshake
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,

    /// Request timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Connect timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u64>,

    /// Network-level retry attempts (default: 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,

    /// Log generated documents and failures
    #[serde(default)]
    pub debug: bool,

    /// Operations per request for chunked batches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_chunk_size: Option<usize>,
}

impl ClientConfig {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout.map(Duration::from_secs)
    }

    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retry.unwrap_or(0)
    }

    /// The definitions path resolved against the directory holding the
    /// config file. Absolute paths are returned unchanged.
    #[must_use]
    pub fn definitions_path(&self, config_dir: &Path) -> Option<PathBuf> {
        self.definitions.as_deref().map(|definitions| {
            let path = Path::new(definitions);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                config_dir.join(path)
            }
        })
    }

    /// Applies `ENDPOINT`, `DEFINITIONS` and `GRAPHQL_DEBUG` from the process
    /// environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// [`ClientConfig::apply_env`] with an explicit lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("ENDPOINT").filter(|value| !value.is_empty()) {
            tracing::debug!(endpoint = %endpoint, "Endpoint overridden from environment");
            self.endpoint = endpoint;
        }
        if let Some(definitions) = lookup("DEFINITIONS").filter(|value| !value.is_empty()) {
            self.definitions = Some(definitions);
        }
        if let Some(debug) = lookup("GRAPHQL_DEBUG") {
            match debug.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.debug = true,
                "0" | "false" | "no" | "off" | "" => self.debug = false,
                other => tracing::warn!(value = other, "Ignoring unrecognized GRAPHQL_DEBUG value"),
            }
        }
    }

    /// Checks the settings that cannot be caught by deserialization.
    /// Returns a message describing the first problem found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("endpoint must not be empty".to_string());
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(format!(
                "endpoint '{}' must use http or https",
                self.endpoint
            ));
        }
        if let Some(subscription) = &self.subscription_endpoint {
            if !(subscription.starts_with("ws://") || subscription.starts_with("wss://")) {
                return Err(format!(
                    "subscriptionEndpoint '{subscription}' must use ws or wss"
                ));
            }
        }
        if let Some(definitions) = &self.definitions {
            if definitions.trim().is_empty() {
                return Err("definitions path must not be empty".to_string());
            }
        }
        if self.batch_chunk_size == Some(0) {
            return Err("batchChunkSize must be greater than zero".to_string());
        }
        Ok(())
    }
}
