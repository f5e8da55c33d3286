//! HTTP transport.
//!
//! Posts `{ query, variables }` as JSON and decodes the reply into a
//! [`RawResult`], with optional retry for network failures.

use crate::{
    DispatchError, DispatchOptions, GraphQLRequest, GraphQLResponse, RawResult, Transport,
    TransportError,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for a request (30 seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default number of retry attempts.
const DEFAULT_RETRIES: u32 = 0;

/// A [`Transport`] over HTTP POST.
///
/// ```no_run
/// use graphql_dispatch::HttpTransport;
/// use std::time::Duration;
///
/// let transport = HttpTransport::new("https://api.example.com/graphql")
///     .with_header("Authorization", "Bearer my-token")
///     .with_timeout(Duration::from_secs(60))
///     .with_retries(3);
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    headers: IndexMap<String, String>,
    timeout: Duration,
    connect_timeout: Duration,
    retries: u32,
    backoff: Duration,
    // Built on first use and shared by clones, so connections are pooled.
    http_client: Arc<Mutex<Option<reqwest::Client>>>,
}

impl HttpTransport {
    /// Creates a transport with default settings: 30 second request timeout,
    /// 10 second connection timeout, no retries and no custom headers.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: IndexMap::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            backoff: Duration::from_secs(1),
            http_client: Arc::default(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.headers.insert(name.into(), value.into());
        }
        self
    }

    /// Sets the request timeout (connection + transfer).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.http_client = Arc::default();
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self.http_client = Arc::default();
        self
    }

    /// Sets the number of retry attempts for network failures and 5xx
    /// responses. Retries back off exponentially, starting at one second.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the first retry delay.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn client(&self) -> Result<reqwest::Client, DispatchError> {
        let mut slot = self.http_client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| DispatchError::Http(e.to_string()))?;
        *slot = Some(client.clone());
        Ok(client)
    }

    #[tracing::instrument(skip(self, request, options), fields(endpoint = %self.endpoint))]
    async fn send(&self, request: &GraphQLRequest, options: &DispatchOptions) -> RawResult {
        let mut last_error = None;
        let attempts = self.retries + 1;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.backoff * (1 << (attempt - 1)); // 1s, 2s, 4s, ...
                tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Retrying after delay");
                tokio::time::sleep(delay).await;
            }

            match self.send_once(request, options).await {
                Ok(raw) => return raw,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Request failed");
                    let retryable = is_retryable(&e);
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                }
            }
        }

        RawResult::Network(
            last_error.unwrap_or_else(|| TransportError::network("No attempts made")),
        )
    }

    /// One request without retry. `Err` is a transport-level failure.
    async fn send_once(
        &self,
        request: &GraphQLRequest,
        options: &DispatchOptions,
    ) -> Result<RawResult, TransportError> {
        let client = self
            .client()
            .map_err(|e| TransportError::network(e.to_string()))?;

        let mut builder = client.post(&self.endpoint);
        for (name, value) in merge_headers(&self.headers, &options.headers) {
            builder = builder.header(name, value);
        }

        let response = builder
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Received response");
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        if !status.is_success() {
            let mut error = TransportError::http(status.as_u16(), error_message(status, &body));
            if let Ok(response) = serde_json::from_str::<GraphQLResponse>(&body) {
                error.errors = response.errors;
            }
            return Err(error);
        }

        Ok(match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => RawResult::from_json(value),
            Err(e) => {
                tracing::debug!(error = %e, "Response body is not JSON");
                RawResult::Unstructured(body)
            }
        })
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: &GraphQLRequest, options: &DispatchOptions) -> RawResult {
        self.send(request, options).await
    }
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("HTTP error");
    if body.trim().is_empty() {
        reason.to_string()
    } else {
        format!("{reason}: {}", body.trim())
    }
}

/// Network failures and 5xx responses are retryable. A response that carries
/// GraphQL errors is an answer, not a failure, and is never retried.
fn is_retryable(error: &TransportError) -> bool {
    error.errors.is_empty() && error.status.map_or(true, |status| status >= 500)
}

/// Client headers overlaid with per-call headers. Names compare
/// case-insensitively and the per-call value wins.
fn merge_headers(
    base: &IndexMap<String, String>,
    overrides: &IndexMap<String, String>,
) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = base
        .iter()
        .filter(|(name, _)| !overrides.keys().any(|o| o.eq_ignore_ascii_case(name)))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    merged.extend(overrides.iter().map(|(name, value)| (name.clone(), value.clone())));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_default() {
        let transport = HttpTransport::new("http://localhost:4000/graphql");
        assert!(transport.headers.is_empty());
        assert_eq!(transport.timeout, Duration::from_secs(30));
        assert_eq!(transport.retries, 0);
        assert_eq!(transport.endpoint(), "http://localhost:4000/graphql");
    }

    #[tokio::test]
    async fn test_client_is_built_once_and_shared() {
        let transport = HttpTransport::new("http://localhost");
        assert!(transport.http_client.lock().is_none());

        transport.client().unwrap();
        assert!(transport.http_client.lock().is_some());

        let clone = transport.clone();
        assert!(Arc::ptr_eq(&transport.http_client, &clone.http_client));

        let retimed = clone.with_timeout(Duration::from_secs(5));
        assert!(retimed.http_client.lock().is_none());
        assert!(transport.http_client.lock().is_some());
    }

    #[test]
    fn test_transport_with_headers() {
        let transport = HttpTransport::new("http://localhost")
            .with_header("Authorization", "Bearer token")
            .with_headers([("X-API-Key", "key123")]);

        assert_eq!(transport.headers.len(), 2);
        assert_eq!(transport.headers["Authorization"], "Bearer token");
    }

    #[test]
    fn test_transport_with_timeouts_and_retries() {
        let transport = HttpTransport::new("http://localhost")
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(5))
            .with_retries(3);
        assert_eq!(transport.timeout, Duration::from_secs(60));
        assert_eq!(transport.connect_timeout, Duration::from_secs(5));
        assert_eq!(transport.retries, 3);
    }

    #[test]
    fn test_is_retryable() {
        assert!(is_retryable(&TransportError::network("connection refused")));
        assert!(is_retryable(&TransportError::http(500, "error")));
        assert!(is_retryable(&TransportError::http(503, "error")));
        assert!(!is_retryable(&TransportError::http(401, "error")));
        assert!(!is_retryable(&TransportError::http(404, "error")));

        let mut answered = TransportError::http(500, "error");
        answered.errors = vec![crate::GraphQLError::new("resolver failed")];
        assert!(!is_retryable(&answered));
    }

    #[test]
    fn test_merge_headers() {
        let mut base = IndexMap::new();
        base.insert("Authorization".to_string(), "Bearer old".to_string());
        base.insert("X-Client".to_string(), "cli".to_string());
        let mut overrides = IndexMap::new();
        overrides.insert("authorization".to_string(), "Bearer new".to_string());

        assert_eq!(
            merge_headers(&base, &overrides),
            [
                ("X-Client".to_string(), "cli".to_string()),
                ("authorization".to_string(), "Bearer new".to_string()),
            ]
        );
    }
}
