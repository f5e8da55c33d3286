use crate::GraphQLRequest;

const CREDENTIAL_MARKERS: &[&str] = &["password", "secret", "token", "credential", "apikey", "api_key"];

/// Whether a document selects or passes anything credential-like.
#[must_use]
pub fn is_sensitive(document: &str) -> bool {
    let document = document.to_ascii_lowercase();
    CREDENTIAL_MARKERS
        .iter()
        .any(|marker| document.contains(marker))
}

/// Logs an outgoing request when debugging is enabled.
pub(crate) fn log_request(debug: bool, operation: &str, request: &GraphQLRequest) {
    if !debug {
        return;
    }
    if is_sensitive(&request.query) {
        tracing::debug!(operation, "Dispatching request (document redacted)");
    } else {
        tracing::debug!(
            operation,
            document = %request.query,
            variables = %serde_json::Value::Object(request.variables.clone()),
            "Dispatching request"
        );
    }
}

/// Logs a failed request when debugging is enabled.
pub(crate) fn log_failure(debug: bool, operation: &str, request: &GraphQLRequest, errors: usize) {
    if !debug {
        return;
    }
    if is_sensitive(&request.query) {
        tracing::debug!(operation, errors, "Request failed (document redacted)");
    } else {
        tracing::debug!(operation, errors, document = %request.query, "Request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_sensitive() {
        assert!(is_sensitive("mutation do($password: String!) { login(password: $password) }"));
        assert!(is_sensitive("query do { me { apiKey } }"));
        assert!(is_sensitive("query do { me { API_KEY } }"));
        assert!(!is_sensitive("query do { user { id name } }"));
    }
}
