//! Include specifications.
//!
//! Callers describe how deep and how wide to select with a terse JSON shape:
//!
//! ```json
//! ["*", "!secrets", { "posts|id title": { "$": { "first": 10 }, "comments": false } }]
//! ```
//!
//! [`IncludeSpec::parse`] turns that shape into a typed tree once, up front,
//! so the resolver never inspects raw JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

const WILDCARD: &str = "*";
const FRAGMENT_MARKER: &str = "fragment";
const ARGUMENTS_KEY: &str = "$";
const ALIAS_KEY: &str = "$name";

/// A parsed include specification for one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum IncludeSpec {
    /// Entries in caller order.
    List(Vec<Include>),
    /// A branch that was neither a list nor an object. It resolves to an empty
    /// selection instead of failing the whole document.
    Malformed(String),
}

/// One entry of an include list.
#[derive(Debug, Clone, PartialEq)]
pub enum Include {
    /// `*` or `*|fragment`: every relation not named elsewhere in the list.
    Wildcard { as_fragment: bool },
    /// `!name` or `{ name: false }`: suppresses wildcard expansion of `name`.
    ///
    /// `false` never includes a relation. To include one without nesting,
    /// use the bare name, `{ name: true }` or `{ name: null }`.
    Exclude(String),
    Relation(RelationInclude),
}

/// An explicitly included relation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelationInclude {
    pub relation: String,
    pub alias: Option<String>,
    /// Literal selection text replacing the target's default fields.
    pub field_override: Option<String>,
    pub as_fragment: bool,
    /// Argument literals bound through generated document variables.
    pub arguments: IndexMap<String, Value>,
    pub nested: Option<IncludeSpec>,
}

impl RelationInclude {
    #[must_use]
    pub fn new(relation: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.field_override = Some(fields.into());
        self
    }

    #[must_use]
    pub const fn as_fragment(mut self) -> Self {
        self.as_fragment = true;
        self
    }

    #[must_use]
    pub fn argument(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn nested(mut self, nested: IncludeSpec) -> Self {
        self.nested = Some(nested);
        self
    }
}

impl From<RelationInclude> for Include {
    fn from(relation: RelationInclude) -> Self {
        Self::Relation(relation)
    }
}

impl Include {
    #[must_use]
    pub fn relation(name: impl Into<String>) -> Self {
        Self::Relation(RelationInclude::new(name))
    }

    /// The relation this entry refers to by name, ignoring modifiers.
    #[must_use]
    pub fn relation_name(&self) -> Option<&str> {
        match self {
            Self::Wildcard { .. } => None,
            Self::Exclude(name) => Some(name.as_str()),
            Self::Relation(relation) => Some(relation.relation.as_str()),
        }
    }
}

impl IncludeSpec {
    #[must_use]
    pub fn list<I: IntoIterator<Item = Include>>(entries: I) -> Self {
        Self::List(entries.into_iter().collect())
    }

    /// Parses the JSON include shape.
    ///
    /// Arrays keep their order, a single object or string is treated as a
    /// one-element list, and anything else is [`IncludeSpec::Malformed`].
    #[must_use]
    pub fn parse(value: &Value) -> Self {
        match value {
            Value::Array(items) => {
                let mut entries = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(text) => entries.push(parse_entry(text, None)),
                        Value::Object(map) => {
                            entries.extend(map.iter().map(|(key, nested)| parse_entry(key, Some(nested))));
                        }
                        other => tracing::debug!(entry = %other, "Skipping include entry that is not a string or object"),
                    }
                }
                Self::List(entries)
            }
            Value::Object(map) => Self::List(
                map.iter()
                    .map(|(key, nested)| parse_entry(key, Some(nested)))
                    .collect(),
            ),
            Value::String(text) => Self::List(vec![parse_entry(text, None)]),
            other => Self::Malformed(format!("expected an array or object, got {other}")),
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[Include] {
        match self {
            Self::List(entries) => entries,
            Self::Malformed(_) => &[],
        }
    }
}

impl From<&Value> for IncludeSpec {
    fn from(value: &Value) -> Self {
        Self::parse(value)
    }
}

impl From<Value> for IncludeSpec {
    fn from(value: Value) -> Self {
        Self::parse(&value)
    }
}

impl<'de> Deserialize<'de> for IncludeSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|value| Self::parse(&value))
    }
}

/// Parses one `name[|fields][|fragment]` key and its nested value.
fn parse_entry(key: &str, nested: Option<&Value>) -> Include {
    let mut parts = key.split('|');
    let name = parts.next().unwrap_or_default().trim();

    let mut as_fragment = false;
    let mut field_override = None;
    for part in parts {
        if part.trim() == FRAGMENT_MARKER {
            as_fragment = true;
        } else if field_override.is_none() && !part.trim().is_empty() {
            field_override = Some(part.trim().to_string());
        }
    }

    if name == WILDCARD {
        return Include::Wildcard { as_fragment };
    }
    if let Some(excluded) = name.strip_prefix('!') {
        return Include::Exclude(excluded.to_string());
    }
    // `{ name: false }` spells the same exclusion as `!name`.
    if matches!(nested, Some(Value::Bool(false))) {
        return Include::Exclude(name.to_string());
    }

    let mut relation = RelationInclude {
        relation: name.to_string(),
        field_override,
        as_fragment,
        ..RelationInclude::default()
    };

    match nested {
        None | Some(Value::Bool(true) | Value::Null) => {}
        Some(Value::Object(map)) => {
            let mut rest = serde_json::Map::new();
            for (key, value) in map {
                match key.as_str() {
                    ARGUMENTS_KEY => match value {
                        Value::Object(arguments) => {
                            relation.arguments = arguments
                                .iter()
                                .map(|(name, value)| (name.clone(), value.clone()))
                                .collect();
                        }
                        other => {
                            relation.nested = Some(IncludeSpec::Malformed(format!(
                                "'$' must map argument names to values, got {other}"
                            )));
                            return Include::Relation(relation);
                        }
                    },
                    ALIAS_KEY => match value {
                        Value::String(alias) => relation.alias = Some(alias.clone()),
                        other => {
                            relation.nested = Some(IncludeSpec::Malformed(format!(
                                "'$name' must be a string, got {other}"
                            )));
                            return Include::Relation(relation);
                        }
                    },
                    _ => {
                        rest.insert(key.clone(), value.clone());
                    }
                }
            }
            if !rest.is_empty() {
                relation.nested = Some(IncludeSpec::parse(&Value::Object(rest)));
            }
        }
        Some(value) => relation.nested = Some(IncludeSpec::parse(value)),
    }

    Include::Relation(relation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_strings() {
        let spec = IncludeSpec::parse(&json!(["*", "!avatar", "posts", "*|fragment"]));
        assert_eq!(
            spec.entries(),
            [
                Include::Wildcard { as_fragment: false },
                Include::Exclude("avatar".into()),
                Include::relation("posts"),
                Include::Wildcard { as_fragment: true },
            ]
        );
    }

    #[test]
    fn test_parse_key_modifiers() {
        let spec = IncludeSpec::parse(&json!([
            "posts|id title",
            "author|fragment",
            "editor|id|fragment",
            "reviewer|fragment|id name"
        ]));

        assert_eq!(
            spec.entries(),
            [
                RelationInclude::new("posts").fields("id title").into(),
                RelationInclude::new("author").as_fragment().into(),
                RelationInclude::new("editor").fields("id").as_fragment().into(),
                RelationInclude::new("reviewer").fields("id name").as_fragment().into(),
            ]
        );
    }

    #[test]
    fn test_parse_control_keys() {
        let spec = IncludeSpec::parse(&json!({
            "posts": { "$": { "first": 10 }, "$name": "latest", "comments": false }
        }));

        let expected = RelationInclude::new("posts")
            .alias("latest")
            .argument("first", 10)
            .nested(IncludeSpec::list([Include::Exclude("comments".into())]));
        assert_eq!(spec.entries(), [expected.into()]);
    }

    #[test]
    fn test_control_keys_only_means_no_nesting() {
        let spec = IncludeSpec::parse(&json!({ "posts": { "$": { "first": 1 } } }));
        let Include::Relation(posts) = &spec.entries()[0] else {
            panic!("expected relation");
        };
        assert!(posts.nested.is_none());
        assert_eq!(posts.arguments["first"], json!(1));
    }

    #[test]
    fn test_false_excludes() {
        let spec = IncludeSpec::parse(&json!(["*", { "avatar": false, "posts": true }]));
        assert_eq!(
            spec.entries(),
            [
                Include::Wildcard { as_fragment: false },
                Include::Exclude("avatar".into()),
                Include::relation("posts"),
            ]
        );
    }

    #[test]
    fn test_false_is_not_a_plain_include() {
        let bare = IncludeSpec::parse(&json!(["posts"]));
        let with_true = IncludeSpec::parse(&json!({ "posts": true }));
        let with_false = IncludeSpec::parse(&json!({ "posts": false }));

        assert_eq!(bare, with_true);
        assert_eq!(with_false.entries(), [Include::Exclude("posts".into())]);
        assert_ne!(bare, with_false);
    }

    #[test]
    fn test_nested_string_and_array() {
        let spec = IncludeSpec::parse(&json!({ "posts": "*", "tags": ["!owner", "*"] }));
        let entries = spec.entries();

        let Include::Relation(posts) = &entries[0] else {
            panic!("expected relation");
        };
        assert_eq!(
            posts.nested,
            Some(IncludeSpec::list([Include::Wildcard { as_fragment: false }]))
        );

        let Include::Relation(tags) = &entries[1] else {
            panic!("expected relation");
        };
        assert_eq!(tags.nested.as_ref().unwrap().entries().len(), 2);
    }

    #[test]
    fn test_malformed_values() {
        assert!(matches!(IncludeSpec::parse(&json!(42)), IncludeSpec::Malformed(_)));

        let spec = IncludeSpec::parse(&json!({ "posts": 3 }));
        let Include::Relation(posts) = &spec.entries()[0] else {
            panic!("expected relation");
        };
        assert!(matches!(posts.nested, Some(IncludeSpec::Malformed(_))));

        let spec = IncludeSpec::parse(&json!({ "posts": { "$": [1, 2] } }));
        let Include::Relation(posts) = &spec.entries()[0] else {
            panic!("expected relation");
        };
        assert!(matches!(posts.nested, Some(IncludeSpec::Malformed(_))));
    }

    #[test]
    fn test_non_entry_items_are_skipped() {
        let spec = IncludeSpec::parse(&json!(["posts", 7, null]));
        assert_eq!(spec.entries(), [Include::relation("posts")]);
    }

    #[test]
    fn test_deserialize() {
        let spec: IncludeSpec = serde_json::from_str(r#"["posts"]"#).unwrap();
        assert_eq!(spec, IncludeSpec::list([Include::relation("posts")]));
    }
}
