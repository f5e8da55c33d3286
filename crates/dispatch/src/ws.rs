//! Websocket transport for subscriptions (`graphql-transport-ws`).

use crate::{DispatchError, GraphQLRequest, RawResult, StreamTransport, TransportError};
use async_tungstenite::tungstenite::{client::IntoClientRequest, http::HeaderValue};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use indexmap::IndexMap;
use serde_json::Value;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const SUBPROTOCOL: &str = "graphql-transport-ws";

/// Websocket URL for an HTTP endpoint: `http` becomes `ws` and `https`
/// becomes `wss`. Other URLs are returned unchanged.
#[must_use]
pub fn subscription_endpoint(http_endpoint: &str) -> String {
    if let Some(rest) = http_endpoint.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = http_endpoint.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        http_endpoint.to_string()
    }
}

type SharedConnection = Arc<Mutex<Option<Arc<graphql_ws_client::Client>>>>;

/// A [`StreamTransport`] holding one shared websocket connection.
///
/// The connection is opened by the first subscription and reused by later
/// ones. Once the server closes it, the next subscription reconnects.
#[derive(Clone)]
pub struct WebSocketTransport {
    endpoint: String,
    headers: IndexMap<String, String>,
    connect_timeout: Duration,
    connection: SharedConnection,
}

impl WebSocketTransport {
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: IndexMap::new(),
            connect_timeout: Duration::from_secs(10),
            connection: Arc::default(),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Adds a header sent with the handshake and in the `connection_init`
    /// payload.
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

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Whether a connection is currently open.
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    async fn client(&self) -> Result<Arc<graphql_ws_client::Client>, DispatchError> {
        let mut slot = self.connection.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }

        let client = Arc::new(self.connect().await?);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    #[tracing::instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn connect(&self) -> Result<graphql_ws_client::Client, DispatchError> {
        let mut request = self
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| DispatchError::Connect(e.to_string()))?;
        request
            .headers_mut()
            .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(SUBPROTOCOL));
        for (name, value) in &self.headers {
            let name = async_tungstenite::tungstenite::http::HeaderName::try_from(name.as_str())
                .map_err(|e| DispatchError::Connect(e.to_string()))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| DispatchError::Connect(e.to_string()))?;
            request.headers_mut().insert(name, value);
        }

        let (connection, _) = tokio::time::timeout(
            self.connect_timeout,
            async_tungstenite::tokio::connect_async(request),
        )
        .await
        .map_err(|_| DispatchError::Connect(format!("timed out after {:?}", self.connect_timeout)))?
        .map_err(|e| DispatchError::Connect(e.to_string()))?;

        let mut builder = graphql_ws_client::Client::build(connection);
        if !self.headers.is_empty() {
            builder = builder
                .payload(serde_json::json!({ "headers": self.headers }))
                .map_err(|e| DispatchError::Connect(e.to_string()))?;
        }
        let (client, actor) = builder
            .await
            .map_err(|e| DispatchError::Connect(e.to_string()))?;

        tracing::info!(endpoint = %self.endpoint, "Subscription connection connected");

        let endpoint = self.endpoint.clone();
        let connection = Arc::clone(&self.connection);
        tokio::spawn(async move {
            actor.into_future().await;
            connection.lock().await.take();
            tracing::info!(endpoint = %endpoint, "Subscription connection disconnected");
        });

        Ok(client)
    }
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("endpoint", &self.endpoint)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl StreamTransport for WebSocketTransport {
    async fn open_stream(
        &self,
        request: &GraphQLRequest,
    ) -> Result<BoxStream<'static, RawResult>, TransportError> {
        let client = self
            .client()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        let subscription = client
            .subscribe(request.clone())
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        Ok(subscription
            .map(|item| match item {
                Ok(payload) => RawResult::from_json(payload),
                Err(e) => RawResult::Network(TransportError::network(e.to_string())),
            })
            .boxed())
    }
}

impl graphql_ws_client::graphql::GraphqlOperation for GraphQLRequest {
    type Response = Value;
    type Error = serde_json::Error;

    fn decode(&self, data: Value) -> Result<Self::Response, Self::Error> {
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_endpoint() {
        assert_eq!(
            subscription_endpoint("http://localhost:4000/graphql"),
            "ws://localhost:4000/graphql"
        );
        assert_eq!(
            subscription_endpoint("https://api.example.com/graphql"),
            "wss://api.example.com/graphql"
        );
        assert_eq!(subscription_endpoint("ws://already"), "ws://already");
    }

    #[tokio::test]
    async fn test_connection_is_lazy() {
        let transport = WebSocketTransport::new("ws://127.0.0.1:9/graphql");
        assert!(!transport.is_connected().await);
        assert_eq!(transport.endpoint(), "ws://127.0.0.1:9/graphql");
    }

    #[tokio::test]
    async fn test_connect_failure_is_a_transport_error() {
        let transport = WebSocketTransport::new("ws://127.0.0.1:9/graphql")
            .with_connect_timeout(Duration::from_secs(2));
        let result = transport.open_stream(&GraphQLRequest::new("subscription do { ping }")).await;
        assert!(result.is_err());
        assert!(!transport.is_connected().await);
    }
}
