use graphql_builder::Document;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// The JSON body sent to a GraphQL endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
            operation_name: None,
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }
}

impl From<Document> for GraphQLRequest {
    fn from(document: Document) -> Self {
        Self::new(document.text).with_variables(document.variables)
    }
}

/// Per-call dispatch settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Stop waiting after this long and report a timeout. Overrides the
    /// client-wide timeout.
    pub timeout: Option<Duration>,
    /// Correlation id for the stale-response guard.
    pub request_id: Option<String>,
    /// Extra headers for this call; they win over client headers.
    pub headers: IndexMap<String, String>,
}

impl DispatchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
