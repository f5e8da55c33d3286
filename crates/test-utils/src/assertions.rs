//! Assertions for generated documents.
//!
//! Generated text is compared exactly with `insta` inline snapshots; these
//! helpers additionally check that it is syntactically valid GraphQL.

use apollo_parser::Parser;

/// Syntax errors apollo-parser reports for `document`.
pub fn document_errors(document: &str) -> Vec<String> {
    let cst = Parser::new(document).parse();
    cst.errors().map(|e| e.message().to_string()).collect()
}

/// Panics with every syntax error if `document` is not valid GraphQL.
///
/// # Example
///
/// ```ignore
/// use graphql_test_utils::assert_valid_document;
///
/// let document = build_document(&definitions, OperationKind::Query, &request)?;
/// assert_valid_document(&document.text);
/// ```
#[track_caller]
pub fn assert_valid_document(document: &str) {
    let errors = document_errors(document);
    assert!(
        errors.is_empty(),
        "invalid document:\n{document}\n{}",
        format_errors(&errors)
    );
}

/// Format a list of errors for snapshot testing.
pub fn format_errors<T: AsRef<str>>(messages: &[T]) -> String {
    if messages.is_empty() {
        return String::from("(no errors)");
    }

    messages
        .iter()
        .enumerate()
        .map(|(i, m)| format!("[{}] {}", i + 1, m.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}
