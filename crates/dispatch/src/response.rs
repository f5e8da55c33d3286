//! Raw transport outcomes.
//!
//! Transports decode whatever they receive into a [`RawResult`] before the
//! normalizer ever sees it, so no code downstream has to sniff shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// A GraphQL error record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    /// `locations`, `path`, `extensions` and anything else the server sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GraphQLError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extra: Map::new(),
        }
    }

    /// Adds `extensions.code`.
    #[must_use]
    pub fn with_code(mut self, code: &str) -> Self {
        let extensions = self
            .extra
            .entry("extensions")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(extensions) = extensions {
            extensions.insert("code".into(), Value::String(code.to_string()));
        }
        self
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.extra.get("extensions")?.get("code")?.as_str()
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A structured GraphQL response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "nullable_errors")]
    pub errors: Vec<GraphQLError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

fn nullable_errors<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<GraphQLError>, D::Error> {
    Option::<Vec<GraphQLError>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// A failure below the GraphQL layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportError {
    pub message: String,
    /// HTTP status, when a response was received at all.
    pub status: Option<u16>,
    /// GraphQL errors carried by an error response body.
    pub errors: Vec<GraphQLError>,
}

impl TransportError {
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
            errors: Vec::new(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// Everything a transport can hand back.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Response(GraphQLResponse),
    Network(TransportError),
    /// Synthesized locally when the caller's timeout expired first.
    Timeout(Duration),
    /// A body that is not a JSON object.
    Unstructured(String),
}

impl RawResult {
    /// Decodes a JSON body. Objects become responses (possibly with neither
    /// `data` nor `errors`); anything else is unstructured.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(_) => match serde_json::from_value::<GraphQLResponse>(value.clone()) {
                Ok(response) => Self::Response(response),
                Err(e) => {
                    tracing::debug!(error = %e, "Response object does not match the GraphQL shape");
                    Self::Unstructured(value.to_string())
                }
            },
            Value::String(text) => Self::Unstructured(text),
            other => Self::Unstructured(other.to_string()),
        }
    }

    /// Shorthand for a successful response.
    #[must_use]
    pub fn data(data: Value) -> Self {
        Self::Response(GraphQLResponse {
            data: Some(data),
            ..GraphQLResponse::default()
        })
    }

    /// Shorthand for a response carrying only errors.
    #[must_use]
    pub fn errors(errors: Vec<GraphQLError>) -> Self {
        Self::Response(GraphQLResponse {
            errors,
            ..GraphQLResponse::default()
        })
    }
}
