//! Catalog data model.
//!
//! The serde representation mirrors the persisted artifact written by the
//! introspection job, so a definitions file round-trips through these types
//! without losing declaration order.

use crate::DefinitionsError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of root operation a document is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    /// The keyword that opens a document of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = DefinitionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "query" => Ok(Self::Query),
            "mutation" => Ok(Self::Mutation),
            "subscription" => Ok(Self::Subscription),
            _ => Err(DefinitionsError::UnknownKind(s.to_string())),
        }
    }
}

/// The complete catalog: entities plus the root operations of each kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    pub entities: IndexMap<String, EntityDescriptor>,
    #[serde(default)]
    pub query: IndexMap<String, OperationDescriptor>,
    #[serde(default)]
    pub mutation: IndexMap<String, OperationDescriptor>,
    #[serde(default)]
    pub subscription: IndexMap<String, OperationDescriptor>,
}

impl Definitions {
    /// Parses a definitions artifact from JSON text.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| DefinitionsError::Parse {
            path: "<string>".into(),
            message: e.to_string(),
        })
    }

    /// Parses a definitions artifact from YAML text.
    pub fn from_yaml_str(yaml: &str) -> crate::Result<Self> {
        serde_saphyr::from_str(yaml).map_err(|e| DefinitionsError::Parse {
            path: "<string>".into(),
            message: e.to_string(),
        })
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }

    /// All operations declared for a kind, in declaration order.
    #[must_use]
    pub const fn operations(&self, kind: OperationKind) -> &IndexMap<String, OperationDescriptor> {
        match kind {
            OperationKind::Query => &self.query,
            OperationKind::Mutation => &self.mutation,
            OperationKind::Subscription => &self.subscription,
        }
    }

    #[must_use]
    pub fn operation(&self, kind: OperationKind, name: &str) -> Option<&OperationDescriptor> {
        self.operations(kind).get(name)
    }

    /// Total number of root operations across all kinds.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.query.len() + self.mutation.len() + self.subscription.len()
    }
}

/// One named entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Schema type name, used in fragment `on` clauses.
    #[serde(rename = "entity")]
    pub entity_type_name: String,
    /// Scalar fields selected when no field override is given.
    #[serde(rename = "fields", with = "field_list", default)]
    pub default_fields: Vec<String>,
    #[serde(rename = "availableInc", default)]
    pub available_relations: IndexMap<String, RelationDescriptor>,
}

impl EntityDescriptor {
    #[must_use]
    pub fn new(entity_type_name: impl Into<String>) -> Self {
        Self {
            entity_type_name: entity_type_name.into(),
            default_fields: Vec::new(),
            available_relations: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_relation(mut self, name: impl Into<String>, relation: RelationDescriptor) -> Self {
        self.available_relations.insert(name.into(), relation);
        self
    }

    /// Default fields rendered as selection text.
    #[must_use]
    pub fn default_selection(&self) -> String {
        self.default_fields.join(" ")
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.available_relations.get(name)
    }
}

/// A relation from one entity to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RelationWire", into = "RelationWire")]
pub struct RelationDescriptor {
    /// Catalog name of the target entity. Targets missing from the catalog are
    /// opaque leaves and get no nested selection block.
    pub target_entity: String,
    /// Argument name to wire type (`Int!`, `[String]`, ...).
    pub declared_arguments: IndexMap<String, String>,
}

impl RelationDescriptor {
    #[must_use]
    pub fn new(target_entity: impl Into<String>) -> Self {
        Self {
            target_entity: target_entity.into(),
            declared_arguments: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_argument(mut self, name: impl Into<String>, wire_type: impl Into<String>) -> Self {
        self.declared_arguments.insert(name.into(), wire_type.into());
        self
    }
}

/// A root query, mutation or subscription field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OperationWire", into = "OperationWire")]
pub struct OperationDescriptor {
    pub argument_types: IndexMap<String, String>,
    pub root_entity: String,
}

impl OperationDescriptor {
    #[must_use]
    pub fn new(root_entity: impl Into<String>) -> Self {
        Self {
            argument_types: IndexMap::new(),
            root_entity: root_entity.into(),
        }
    }

    #[must_use]
    pub fn with_argument(mut self, name: impl Into<String>, wire_type: impl Into<String>) -> Self {
        self.argument_types.insert(name.into(), wire_type.into());
        self
    }
}

// Relations are written as `{ "type": "post", "args": {...} }`; older
// artifacts use the bare target name.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RelationWire {
    Full {
        #[serde(rename = "type")]
        target: String,
        #[serde(default)]
        args: IndexMap<String, String>,
    },
    Short(String),
}

impl From<RelationWire> for RelationDescriptor {
    fn from(wire: RelationWire) -> Self {
        match wire {
            RelationWire::Full { target, args } => Self {
                target_entity: target,
                declared_arguments: args,
            },
            RelationWire::Short(target) => Self::new(target),
        }
    }
}

impl From<RelationDescriptor> for RelationWire {
    fn from(relation: RelationDescriptor) -> Self {
        Self::Full {
            target: relation.target_entity,
            args: relation.declared_arguments,
        }
    }
}

// Operations are written as a `[args, rootEntity]` pair.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OperationWire {
    Pair(IndexMap<String, String>, String),
    Object {
        #[serde(default)]
        args: IndexMap<String, String>,
        entity: String,
    },
}

impl From<OperationWire> for OperationDescriptor {
    fn from(wire: OperationWire) -> Self {
        match wire {
            OperationWire::Pair(argument_types, root_entity)
            | OperationWire::Object {
                args: argument_types,
                entity: root_entity,
            } => Self {
                argument_types,
                root_entity,
            },
        }
    }
}

impl From<OperationDescriptor> for OperationWire {
    fn from(operation: OperationDescriptor) -> Self {
        Self::Pair(operation.argument_types, operation.root_entity)
    }
}

/// `fields` is persisted as one space separated string.
mod field_list {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FieldList {
        Text(String),
        Names(Vec<String>),
    }

    pub fn serialize<S: Serializer>(fields: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&fields.join(" "))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        Ok(match FieldList::deserialize(deserializer)? {
            FieldList::Text(text) => text.split_whitespace().map(str::to_string).collect(),
            FieldList::Names(names) => names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = r#"{
        "entities": {
            "user": {
                "entity": "User",
                "fields": "id name email",
                "availableInc": {
                    "posts": { "type": "post", "args": { "first": "Int" } },
                    "avatar": "image"
                }
            },
            "post": { "entity": "Post", "fields": ["id", "title"], "availableInc": {} }
        },
        "query": { "user": [{ "id": "ID!" }, "user"] },
        "mutation": { "deleteUser": { "args": { "id": "ID!" }, "entity": "boolean" } }
    }"#;

    #[test]
    fn test_parse_artifact() {
        let definitions = Definitions::from_json_str(ARTIFACT).unwrap();

        let user = definitions.entity("user").unwrap();
        assert_eq!(user.entity_type_name, "User");
        assert_eq!(user.default_fields, ["id", "name", "email"]);
        assert_eq!(user.default_selection(), "id name email");

        let posts = user.relation("posts").unwrap();
        assert_eq!(posts.target_entity, "post");
        assert_eq!(posts.declared_arguments.get("first").unwrap(), "Int");

        let avatar = user.relation("avatar").unwrap();
        assert_eq!(avatar.target_entity, "image");
        assert!(avatar.declared_arguments.is_empty());

        assert_eq!(definitions.entity("post").unwrap().default_fields, ["id", "title"]);
    }

    #[test]
    fn test_operations_by_kind() {
        let definitions = Definitions::from_json_str(ARTIFACT).unwrap();

        let user = definitions.operation(OperationKind::Query, "user").unwrap();
        assert_eq!(user.root_entity, "user");
        assert_eq!(user.argument_types.get("id").unwrap(), "ID!");

        let delete = definitions
            .operation(OperationKind::Mutation, "deleteUser")
            .unwrap();
        assert_eq!(delete.root_entity, "boolean");

        assert!(definitions.operation(OperationKind::Subscription, "user").is_none());
        assert_eq!(definitions.operation_count(), 2);
    }

    #[test]
    fn test_relation_order_is_preserved() {
        let definitions = Definitions::from_json_str(ARTIFACT).unwrap();
        let names: Vec<_> = definitions.entity("user").unwrap().available_relations.keys().collect();
        assert_eq!(names, ["posts", "avatar"]);
    }

    #[test]
    fn test_serialize_canonical_shape() {
        let definitions = Definitions::from_json_str(ARTIFACT).unwrap();
        let value = serde_json::to_value(&definitions).unwrap();

        assert_eq!(value["entities"]["user"]["fields"], "id name email");
        assert_eq!(value["entities"]["user"]["availableInc"]["avatar"]["type"], "image");
        assert_eq!(value["query"]["user"][1], "user");
        assert_eq!(value["mutation"]["deleteUser"][0]["id"], "ID!");

        let reparsed: Definitions = serde_json::from_value(value).unwrap();
        assert_eq!(reparsed, definitions);
    }

    #[test]
    fn test_operation_kind_from_str() {
        assert_eq!("query".parse::<OperationKind>().unwrap(), OperationKind::Query);
        assert_eq!("Mutation".parse::<OperationKind>().unwrap(), OperationKind::Mutation);
        assert!("fetch".parse::<OperationKind>().is_err());
        assert_eq!(OperationKind::Subscription.to_string(), "subscription");
    }

    #[test]
    fn test_builders() {
        let entity = EntityDescriptor::new("Comment")
            .with_fields(["id", "body"])
            .with_relation("author", RelationDescriptor::new("user"));
        assert_eq!(entity.default_selection(), "id body");
        assert!(entity.relation("author").is_some());

        let operation = OperationDescriptor::new("comment").with_argument("id", "ID!");
        assert_eq!(operation.argument_types.len(), 1);
    }
}
