//! Batch documents: many operations of one kind behind aliases.

use crate::document::{build_sub_operation, Document, OperationRequest};
use crate::resolve::FragmentSet;
use crate::Result;
use graphql_definitions::{Definitions, OperationKind};
use indexmap::IndexMap;
use serde_json::Map;

/// Keys per request when a batch is split into chunks.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// A batch document plus the aliases used inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDocument {
    pub document: Document,
    /// Caller alias to the alias emitted in the document. They differ only
    /// for numeric-looking aliases.
    pub aliases: IndexMap<String, String>,
}

impl BatchDocument {
    /// The caller alias behind a response key.
    #[must_use]
    pub fn caller_alias(&self, response_key: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(_, emitted)| emitted.as_str() == response_key)
            .map(|(caller, _)| caller.as_str())
    }
}

/// Alias usable as a selection alias: names cannot start with a digit.
#[must_use]
pub fn selection_alias(alias: &str) -> String {
    if alias.starts_with(|c: char| c.is_ascii_digit()) {
        format!("a{alias}")
    } else {
        alias.to_string()
    }
}

/// Merges `operations` into one aliased document.
///
/// Sub-operation `i` (in insertion order) suffixes its variables with `i`,
/// so equal variable names in different operations never collide. A fragment
/// whose body differs from one already emitted under the same name (it binds
/// that sub-operation's own variables) is emitted as `<name><i>`.
#[tracing::instrument(skip(definitions, operations), fields(operations = operations.len()))]
pub fn build_batch(
    definitions: &Definitions,
    kind: OperationKind,
    operations: &IndexMap<String, OperationRequest>,
) -> Result<BatchDocument> {
    let mut selections = Vec::with_capacity(operations.len());
    let mut declarations = Vec::new();
    let mut variables = Map::new();
    let mut fragments = FragmentSet::new();
    let mut aliases = IndexMap::with_capacity(operations.len());

    for (index, (alias, request)) in operations.iter().enumerate() {
        let mut sub = build_sub_operation(definitions, kind, request, index)?;
        let emitted = selection_alias(alias);

        merge_fragments(&mut fragments, &mut sub.body, &sub.fragments, index);
        selections.push(format!("{emitted}: {}", sub.body));
        declarations.extend(sub.declarations);
        variables.extend(sub.variables);
        aliases.insert(alias.clone(), emitted);
    }

    let mut text = format!("{kind} do");
    if !declarations.is_empty() {
        text.push('(');
        text.push_str(&declarations.join(", "));
        text.push(')');
    }
    text.push_str(" { ");
    text.push_str(&selections.join(" "));
    text.push_str(" }");

    let fragments = fragments.render();
    if !fragments.is_empty() {
        text.push(' ');
        text.push_str(&fragments);
    }

    tracing::debug!(variables = variables.len(), "Batch document built");
    Ok(BatchDocument {
        document: Document { text, variables },
        aliases,
    })
}

/// Merges the fragments of sub-operation `index` into `fragments`.
///
/// A fragment that clashes with a different definition of the same name is
/// renamed, and so is every fragment spreading a renamed one. Spreads in
/// `body` follow the renames.
fn merge_fragments(fragments: &mut FragmentSet, body: &mut String, incoming: &FragmentSet, index: usize) {
    let mut renames: IndexMap<String, String> = IndexMap::new();
    loop {
        let mut changed = false;
        for (name, definition) in incoming.entries() {
            if renames.contains_key(name) {
                continue;
            }
            let Some(existing) = fragments.get(name) else {
                continue;
            };
            if rename_spreads(definition, &renames) != existing {
                renames.insert(name.to_string(), format!("{name}{index}"));
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for (name, definition) in incoming.entries() {
        let definition = rename_spreads(definition, &renames);
        match renames.get(name) {
            Some(renamed) => {
                tracing::debug!(fragment = name, renamed = %renamed, "Fragment renamed in batch");
                let definition = definition.replacen(
                    &format!("fragment {name} on "),
                    &format!("fragment {renamed} on "),
                    1,
                );
                fragments.insert(renamed.as_str(), definition);
            }
            None => fragments.insert(name, definition),
        }
    }

    if !renames.is_empty() {
        *body = rename_spreads(body, &renames);
    }
}

/// Rewrites `...name` spreads according to `renames`.
fn rename_spreads(text: &str, renames: &IndexMap<String, String>) -> String {
    if renames.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("...") {
        let (before, after) = rest.split_at(pos + 3);
        out.push_str(before);
        let end = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let (name, tail) = after.split_at(end);
        out.push_str(renames.get(name).map_or(name, String::as_str));
        rest = tail;
    }
    out.push_str(rest);
    out
}

/// Splits a batch into ordered chunks of at most `size` operations.
#[must_use]
pub fn chunk_operations(
    operations: &IndexMap<String, OperationRequest>,
    size: usize,
) -> Vec<IndexMap<String, OperationRequest>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(operations.len().div_ceil(size));
    let mut current = IndexMap::with_capacity(size);
    for (alias, request) in operations {
        current.insert(alias.clone(), request.clone());
        if current.len() == size {
            chunks.push(std::mem::replace(&mut current, IndexMap::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql_definitions::{EntityDescriptor, OperationDescriptor};
    use serde_json::json;

    fn catalog() -> Definitions {
        let mut definitions = Definitions::default();
        definitions
            .entities
            .insert("user".into(), EntityDescriptor::new("User").with_fields(["id"]));
        definitions.query.insert(
            "user".into(),
            OperationDescriptor::new("user").with_argument("id", "ID!"),
        );
        definitions
    }

    fn batch(pairs: &[(&str, &str)]) -> IndexMap<String, OperationRequest> {
        pairs
            .iter()
            .map(|(alias, id)| {
                (
                    (*alias).to_string(),
                    OperationRequest::new("user").variable("id", *id),
                )
            })
            .collect()
    }

    #[test]
    fn test_batch_suffixes_variables() {
        let operations = batch(&[("first", "1"), ("second", "2")]);
        let batch = build_batch(&catalog(), OperationKind::Query, &operations).unwrap();

        assert_eq!(
            batch.document.text,
            "query do($id0: ID!, $id1: ID!) { first: user(id: $id0) { id } second: user(id: $id1) { id } }"
        );
        assert_eq!(batch.document.variables["id0"], json!("1"));
        assert_eq!(batch.document.variables["id1"], json!("2"));
    }

    #[test]
    fn test_numeric_aliases_are_prefixed() {
        let operations = batch(&[("42", "1")]);
        let batch = build_batch(&catalog(), OperationKind::Query, &operations).unwrap();

        assert!(batch.document.text.contains("a42: user(id: $id0)"));
        assert_eq!(batch.aliases["42"], "a42");
        assert_eq!(batch.caller_alias("a42"), Some("42"));
    }

    #[test]
    fn test_selection_alias() {
        assert_eq!(selection_alias("7up"), "a7up");
        assert_eq!(selection_alias("user7"), "user7");
    }

    #[test]
    fn test_rename_spreads_matches_whole_names() {
        let renames = IndexMap::from([("post".to_string(), "post1".to_string())]);
        assert_eq!(
            rename_spreads("posts{...post} drafts{...postDraft} ... on Post { id }", &renames),
            "posts{...post1} drafts{...postDraft} ... on Post { id }"
        );
    }

    #[test]
    fn test_clashing_fragments_are_renamed_with_their_spreaders() {
        let mut fragments = FragmentSet::new();
        fragments.insert("post", "fragment post on Post { id comments{...comment} }");
        fragments.insert("comment", "fragment comment on Comment { id replies(first: $first0_1) }");

        let mut incoming = FragmentSet::new();
        incoming.insert("post", "fragment post on Post { id comments{...comment} }");
        incoming.insert("comment", "fragment comment on Comment { id replies(first: $first1_1) }");
        incoming.insert("user", "fragment user on User { id }");

        let mut body = "users { posts{...post} }".to_string();
        merge_fragments(&mut fragments, &mut body, &incoming, 1);

        assert_eq!(body, "users { posts{...post1} }");
        assert_eq!(
            fragments.get("post1"),
            Some("fragment post1 on Post { id comments{...comment1} }")
        );
        assert_eq!(
            fragments.get("comment1"),
            Some("fragment comment1 on Comment { id replies(first: $first1_1) }")
        );
        assert_eq!(fragments.get("user"), Some("fragment user on User { id }"));
        assert_eq!(fragments.len(), 5);
    }

    #[test]
    fn test_identical_fragments_are_shared() {
        let mut fragments = FragmentSet::new();
        fragments.insert("post", "fragment post on Post { id }");
        let mut incoming = FragmentSet::new();
        incoming.insert("post", "fragment post on Post { id }");

        let mut body = "posts{...post}".to_string();
        merge_fragments(&mut fragments, &mut body, &incoming, 3);

        assert_eq!(body, "posts{...post}");
        assert_eq!(fragments.len(), 1);
    }

    #[test]
    fn test_chunk_operations() {
        let operations = batch(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4"), ("e", "5")]);
        let chunks = chunk_operations(&operations, 2);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(chunks[2].keys().collect::<Vec<_>>(), ["e"]);
        assert_eq!(chunk_operations(&operations, 0).len(), 5);
        assert!(chunk_operations(&IndexMap::new(), 10).is_empty());
    }
}
