//! Maps every raw outcome onto one result contract.

use crate::{GraphQLError, RawResult};
use serde_json::{json, Value};

pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
pub const TIMEOUT: &str = "TIMEOUT";
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// The outcome of any dispatched operation.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformResult {
    /// The payload, unwrapped from the operation's root key where possible.
    Data(Value),
    /// At least one error, plus whatever partial data came with them.
    Errors {
        errors: Vec<GraphQLError>,
        data: Option<Value>,
    },
    /// A newer call with the same request id started before this one
    /// finished; the result should be discarded.
    Lapsed { request_id: String },
}

impl UniformResult {
    #[must_use]
    pub fn error(error: GraphQLError) -> Self {
        Self::Errors {
            errors: vec![error],
            data: None,
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Errors { .. })
    }

    #[must_use]
    pub const fn is_lapsed(&self) -> bool {
        matches!(self, Self::Lapsed { .. })
    }

    #[must_use]
    pub fn errors(&self) -> &[GraphQLError] {
        match self {
            Self::Errors { errors, .. } => errors,
            Self::Data(_) | Self::Lapsed { .. } => &[],
        }
    }

    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Data(data) => Some(data),
            Self::Errors { data, .. } => data.as_ref(),
            Self::Lapsed { .. } => None,
        }
    }

    /// JSON rendering: the payload itself, `{ errors, data? }`, or
    /// `{ lapsed: true, requestId }`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Data(data) => data.clone(),
            Self::Errors { errors, data } => {
                let mut value = json!({ "errors": errors });
                if let Some(data) = data {
                    value["data"] = data.clone();
                }
                value
            }
            Self::Lapsed { request_id } => json!({ "lapsed": true, "requestId": request_id }),
        }
    }
}

/// How a result is unwrapped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Keep the whole `data` mapping (batches) instead of unwrapping a key.
    pub multi: bool,
    /// Named in the synthesized unknown-error record.
    pub endpoint: String,
}

impl NormalizeOptions {
    #[must_use]
    pub fn single(endpoint: impl Into<String>) -> Self {
        Self {
            multi: false,
            endpoint: endpoint.into(),
        }
    }

    #[must_use]
    pub fn multi(endpoint: impl Into<String>) -> Self {
        Self {
            multi: true,
            endpoint: endpoint.into(),
        }
    }
}

/// Normalizes `raw` for the operation whose root field is `expected_key`.
///
/// Errors always win over data. Data is unwrapped at `expected_key`, or at
/// the only key present, unless `options.multi` asks for the whole mapping.
/// Every failure yields at least one error record.
#[must_use]
pub fn normalize(raw: RawResult, expected_key: &str, options: &NormalizeOptions) -> UniformResult {
    match raw {
        RawResult::Response(response) => {
            if !response.errors.is_empty() {
                return UniformResult::Errors {
                    errors: response.errors,
                    data: response.data,
                };
            }
            match response.data {
                Some(Value::Null) | None => unknown_error(options),
                Some(data) if options.multi => UniformResult::Data(data),
                Some(Value::Object(mut map)) => {
                    if let Some(value) = map.remove(expected_key) {
                        UniformResult::Data(value)
                    } else if map.len() == 1 {
                        let (_, value) = map.into_iter().next().unwrap_or_default();
                        UniformResult::Data(value)
                    } else {
                        UniformResult::Data(Value::Object(map))
                    }
                }
                Some(data) => UniformResult::Data(data),
            }
        }
        RawResult::Network(error) => {
            if error.errors.is_empty() {
                let mut record = GraphQLError::new(error.message).with_code(NETWORK_ERROR);
                if let Some(status) = error.status {
                    if let Some(Value::Object(extensions)) = record.extra.get_mut("extensions") {
                        extensions.insert("status".into(), status.into());
                    }
                }
                UniformResult::error(record)
            } else {
                UniformResult::Errors {
                    errors: error.errors,
                    data: None,
                }
            }
        }
        RawResult::Timeout(after) => UniformResult::error(
            GraphQLError::new(format!("Request timed out after {}ms", after.as_millis()))
                .with_code(TIMEOUT),
        ),
        RawResult::Unstructured(text) => UniformResult::error(GraphQLError::new(text)),
    }
}

fn unknown_error(options: &NormalizeOptions) -> UniformResult {
    UniformResult::error(
        GraphQLError::new(format!(
            "Unknown error during request. Endpoint: {}",
            options.endpoint
        ))
        .with_code(UNKNOWN_ERROR),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GraphQLResponse, TransportError};
    use std::time::Duration;

    fn single() -> NormalizeOptions {
        NormalizeOptions::single("http://localhost:4000/graphql")
    }

    #[test]
    fn test_unwraps_expected_key() {
        let raw = RawResult::data(json!({ "opName": { "x": 1 } }));
        assert_eq!(normalize(raw, "opName", &single()), UniformResult::Data(json!({ "x": 1 })));
    }

    #[test]
    fn test_unwraps_single_mismatched_key() {
        let raw = RawResult::data(json!({ "onlyKey": { "x": 1 } }));
        assert_eq!(
            normalize(raw, "mismatchedName", &single()),
            UniformResult::Data(json!({ "x": 1 }))
        );
    }

    #[test]
    fn test_keeps_mapping_with_several_keys() {
        let data = json!({ "a": 1, "b": 2 });
        let raw = RawResult::data(data.clone());
        assert_eq!(normalize(raw, "c", &single()), UniformResult::Data(data));
    }

    #[test]
    fn test_expected_key_holding_null() {
        let raw = RawResult::data(json!({ "user": null }));
        assert_eq!(normalize(raw, "user", &single()), UniformResult::Data(Value::Null));
    }

    #[test]
    fn test_multi_keeps_whole_mapping() {
        let data = json!({ "first": { "id": 1 } });
        let raw = RawResult::data(data.clone());
        let options = NormalizeOptions::multi("http://localhost");
        assert_eq!(normalize(raw, "first", &options), UniformResult::Data(data));
    }

    #[test]
    fn test_errors_pass_through() {
        let errors = vec![GraphQLError::new("e")];
        let result = normalize(RawResult::errors(errors.clone()), "opName", &single());
        assert_eq!(result, UniformResult::Errors { errors, data: None });
        assert_eq!(result.to_json(), json!({ "errors": [{ "message": "e" }] }));
    }

    #[test]
    fn test_errors_keep_partial_data() {
        let raw = RawResult::Response(GraphQLResponse {
            data: Some(json!({ "user": { "id": "1" } })),
            errors: vec![GraphQLError::new("email hidden")],
            extensions: None,
        });
        let result = normalize(raw, "user", &single());
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.data(), Some(&json!({ "user": { "id": "1" } })));
    }

    #[test]
    fn test_empty_response_synthesizes_unknown_error() {
        let result = normalize(RawResult::Response(GraphQLResponse::default()), "opName", &single());
        let errors = result.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), Some(UNKNOWN_ERROR));
        assert!(errors[0].message.contains("http://localhost:4000/graphql"));
    }

    #[test]
    fn test_network_error() {
        let result = normalize(
            RawResult::Network(TransportError::http(502, "Bad gateway")),
            "user",
            &single(),
        );
        let errors = result.errors();
        assert_eq!(errors[0].message, "Bad gateway");
        assert_eq!(errors[0].code(), Some(NETWORK_ERROR));
        assert_eq!(errors[0].extra["extensions"]["status"], json!(502));
    }

    #[test]
    fn test_network_error_with_graphql_errors() {
        let mut error = TransportError::http(400, "Bad request");
        error.errors = vec![GraphQLError::new("Syntax Error")];
        let result = normalize(RawResult::Network(error), "user", &single());
        assert_eq!(result.errors()[0].message, "Syntax Error");
        assert_eq!(result.errors()[0].code(), None);
    }

    #[test]
    fn test_timeout_and_unstructured() {
        let result = normalize(RawResult::Timeout(Duration::from_millis(1500)), "user", &single());
        assert_eq!(result.errors()[0].message, "Request timed out after 1500ms");
        assert_eq!(result.errors()[0].code(), Some(TIMEOUT));

        let result = normalize(RawResult::Unstructured("oops".into()), "user", &single());
        assert_eq!(result.to_json(), json!({ "errors": [{ "message": "oops" }] }));
    }

    #[test]
    fn test_lapsed_json() {
        let lapsed = UniformResult::Lapsed {
            request_id: "search".into(),
        };
        assert!(lapsed.is_lapsed());
        assert_eq!(lapsed.to_json(), json!({ "lapsed": true, "requestId": "search" }));
    }
}
