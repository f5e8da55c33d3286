//! Document assembly for a single root operation.

use crate::resolve::{resolve, FragmentSet, ResolveContext, Selection};
use crate::{BuildError, IncludeSpec, Result};
use graphql_definitions::{Definitions, OperationKind};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied operation variables.
///
/// A variable can be explicitly `null`, which is sent, or undefined, which
/// is dropped before the document is declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables(IndexMap<String, Option<Value>>);

impl Variables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a defined variable. `Value::Null` is kept.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), Some(value.into()));
        self
    }

    /// Adds an undefined variable, which is never declared or sent.
    #[must_use]
    pub fn with_undefined(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), None);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<Value>) {
        self.0.insert(name.into(), value);
    }

    /// Defined variables in insertion order.
    pub fn defined(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|value| (name.as_str(), value)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Variables {
    fn from(map: Map<String, Value>) -> Self {
        Self(map.into_iter().map(|(name, value)| (name, Some(value))).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), Some(value.into())))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for Variables {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from)
    }
}

/// One named operation with its inputs, as used by single calls and batches.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub name: String,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub include: Option<IncludeSpec>,
    #[serde(default)]
    pub fields: Option<String>,
}

impl OperationRequest {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name, Some(value.into()));
        self
    }

    #[must_use]
    pub fn include(mut self, include: impl Into<IncludeSpec>) -> Self {
        self.include = Some(include.into());
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }
}

/// A complete operation document and the variables to send with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub text: String,
    pub variables: Map<String, Value>,
}

impl Document {
    /// A document sent as-is, with no catalog involvement.
    #[must_use]
    pub fn raw(text: impl Into<String>, variables: &Variables) -> Self {
        Self {
            text: text.into(),
            variables: collect_values(variables.defined()),
        }
    }
}

/// The pieces of one operation inside a batch document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubOperation {
    /// `name(bindings) { selection }` without an alias.
    pub body: String,
    /// `$var: Type` declarations this body needs.
    pub declarations: Vec<String>,
    pub variables: Map<String, Value>,
    pub fragments: FragmentSet,
}

/// Builds a complete document for `request`.
///
/// An operation the catalog does not know is passed through verbatim as the
/// document text.
#[tracing::instrument(skip(definitions, request), fields(operation = %request.name))]
pub fn build_document(
    definitions: &Definitions,
    kind: OperationKind,
    request: &OperationRequest,
) -> Result<Document> {
    if definitions.operation(kind, &request.name).is_none() {
        tracing::debug!("Unknown operation, passing name through as document");
        return Ok(Document::raw(request.name.clone(), &request.variables));
    }

    let sub = assemble(definitions, kind, request, None)?;
    let mut text = format!("{kind} do");
    if !sub.declarations.is_empty() {
        text.push('(');
        text.push_str(&sub.declarations.join(", "));
        text.push(')');
    }
    text.push_str(" { ");
    text.push_str(&sub.body);
    text.push_str(" }");

    let fragments = sub.fragments.render();
    if !fragments.is_empty() {
        text.push(' ');
        text.push_str(&fragments);
    }

    Ok(Document {
        text,
        variables: sub.variables,
    })
}

/// Builds the batch-mode partial of `request` at position `index`.
///
/// Every variable name carries the index, so partials of one batch never
/// share a variable. Unknown operations yield their name as the body.
pub fn build_sub_operation(
    definitions: &Definitions,
    kind: OperationKind,
    request: &OperationRequest,
    index: usize,
) -> Result<SubOperation> {
    if definitions.operation(kind, &request.name).is_none() {
        return Ok(SubOperation {
            body: request.name.clone(),
            ..SubOperation::default()
        });
    }
    assemble(definitions, kind, request, Some(index))
}

fn assemble(
    definitions: &Definitions,
    kind: OperationKind,
    request: &OperationRequest,
    index: Option<usize>,
) -> Result<SubOperation> {
    let Some(operation) = definitions.operation(kind, &request.name) else {
        return Ok(SubOperation::default());
    };
    let suffix = index.map(|index| index.to_string()).unwrap_or_default();

    let mut declarations = Vec::new();
    let mut bindings = Vec::new();
    let mut variables = Map::new();
    for (name, value) in request.variables.defined() {
        let wire_type = operation
            .argument_types
            .get(name)
            .ok_or_else(|| BuildError::UnknownVariable {
                operation: request.name.clone(),
                variable: name.to_string(),
            })?;
        let variable = format!("{name}{suffix}");
        declarations.push(format!("${variable}: {wire_type}"));
        bindings.push(format!("{name}: ${variable}"));
        variables.insert(variable, value.clone());
    }

    let mut ctx = ResolveContext::with_suffix(suffix);
    let selection = resolve(
        definitions,
        &operation.root_entity,
        request.include.as_ref(),
        request.fields.as_deref(),
        &mut ctx,
    )?;

    for (name, wire_type) in ctx.parameters.declarations() {
        declarations.push(format!("${name}: {wire_type}"));
    }
    variables.extend(
        ctx.parameters
            .values()
            .map(|(name, value)| (name.to_string(), value.clone())),
    );

    let mut body = request.name.clone();
    if !bindings.is_empty() {
        body.push('(');
        body.push_str(&bindings.join(", "));
        body.push(')');
    }
    match selection {
        Selection::Leaf => {
            if let Some(fields) = &request.fields {
                body.push_str(&format!(" {{ {fields} }}"));
            }
        }
        Selection::Fields(fields) => body.push_str(&format!(" {{ {fields} }}")),
    }

    Ok(SubOperation {
        body,
        declarations,
        variables,
        fragments: ctx.fragments,
    })
}

fn collect_values<'a>(values: impl Iterator<Item = (&'a str, &'a Value)>) -> Map<String, Value> {
    values
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql_definitions::{EntityDescriptor, OperationDescriptor, RelationDescriptor};
    use serde_json::json;

    fn catalog() -> Definitions {
        let mut definitions = Definitions::default();
        definitions.entities.insert(
            "user".into(),
            EntityDescriptor::new("User")
                .with_fields(["id", "name"])
                .with_relation(
                    "posts",
                    RelationDescriptor::new("post").with_argument("first", "Int"),
                ),
        );
        definitions
            .entities
            .insert("post".into(), EntityDescriptor::new("Post").with_fields(["id", "title"]));
        definitions.query.insert(
            "user".into(),
            OperationDescriptor::new("user")
                .with_argument("id", "ID!")
                .with_argument("role", "String"),
        );
        definitions
            .query
            .insert("users".into(), OperationDescriptor::new("user"));
        definitions
            .mutation
            .insert("ping".into(), OperationDescriptor::new("boolean"));
        definitions
    }

    #[test]
    fn test_document_without_variables_omits_parentheses() {
        let document =
            build_document(&catalog(), OperationKind::Query, &OperationRequest::new("users"))
                .unwrap();
        assert_eq!(document.text, "query do { users { id name } }");
        assert!(document.variables.is_empty());
    }

    #[test]
    fn test_undefined_dropped_null_kept() {
        let request = OperationRequest::new("user").variables(
            Variables::new()
                .with("id", "1")
                .with("role", Value::Null)
                .with_undefined("missing"),
        );
        let document = build_document(&catalog(), OperationKind::Query, &request).unwrap();
        assert_eq!(
            document.text,
            "query do($id: ID!, $role: String) { user(id: $id, role: $role) { id name } }"
        );
        assert_eq!(document.variables, *json!({ "id": "1", "role": null }).as_object().unwrap());
    }

    #[test]
    fn test_nested_arguments_become_variables() {
        let request = OperationRequest::new("user")
            .variable("id", "1")
            .include(json!({ "posts": { "$": { "first": 5 } } }));
        let document = build_document(&catalog(), OperationKind::Query, &request).unwrap();
        assert_eq!(
            document.text,
            "query do($id: ID!, $first_1: Int) { user(id: $id) { id name posts(first: $first_1){id title} } }"
        );
        assert_eq!(document.variables["first_1"], json!(5));
    }

    #[test]
    fn test_unknown_variable() {
        let request = OperationRequest::new("user").variable("nope", 1);
        let err = build_document(&catalog(), OperationKind::Query, &request).unwrap_err();
        assert_eq!(
            err,
            BuildError::UnknownVariable {
                operation: "user".into(),
                variable: "nope".into()
            }
        );
    }

    #[test]
    fn test_unknown_operation_passes_through() {
        let request = OperationRequest::new("{ __typename }");
        let document = build_document(&catalog(), OperationKind::Query, &request).unwrap();
        assert_eq!(document.text, "{ __typename }");
    }

    #[test]
    fn test_leaf_root_omits_braces() {
        let document =
            build_document(&catalog(), OperationKind::Mutation, &OperationRequest::new("ping"))
                .unwrap();
        assert_eq!(document.text, "mutation do { ping }");
    }

    #[test]
    fn test_sub_operation_suffixes_variables() {
        let request = OperationRequest::new("user")
            .variable("id", "7")
            .include(json!({ "posts": { "$": { "first": 2 } } }));
        let sub = build_sub_operation(&catalog(), OperationKind::Query, &request, 3).unwrap();
        assert_eq!(
            sub.body,
            "user(id: $id3) { id name posts(first: $first3_1){id title} }"
        );
        assert_eq!(sub.declarations, ["$id3: ID!", "$first3_1: Int"]);
        assert_eq!(sub.variables["id3"], json!("7"));
    }

    #[test]
    fn test_deserialize_request() {
        let request: OperationRequest = serde_json::from_value(json!({
            "name": "user",
            "variables": { "id": "1" },
            "include": ["posts"],
            "fields": "id"
        }))
        .unwrap();
        assert_eq!(request.name, "user");
        assert_eq!(request.fields.as_deref(), Some("id"));
        assert_eq!(request.variables.defined().count(), 1);
    }
}
