//! Field resolution.
//!
//! Walks an [`IncludeSpec`] against the entity catalog and renders the
//! selection text for one entity. A single walk also collects the two side
//! products of a document: variables generated for relation arguments
//! ([`ParameterAccumulator`]) and extracted fragment definitions
//! ([`FragmentSet`]).

use crate::error::closest;
use crate::{BuildError, Include, IncludeSpec, RelationInclude, Result};
use graphql_definitions::{Definitions, EntityDescriptor};
use indexmap::IndexMap;
use serde_json::Value;

/// What a resolution call should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// The selection text of the entity, with fragment spreads in place of
    /// fragment-marked relations.
    Inline,
    /// The fragment definitions referenced by the same tree.
    Extract,
}

/// Result of resolving an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The entity is not in the catalog: a scalar or opaque value that takes
    /// no selection block.
    Leaf,
    Fields(String),
}

impl Selection {
    /// Selection text, empty for leaves.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Leaf => "",
            Self::Fields(text) => text,
        }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf)
    }
}

/// Variables generated for relation arguments during one resolution pass.
#[derive(Debug, Clone, Default)]
pub struct ParameterAccumulator {
    declarations: IndexMap<String, String>,
    values: IndexMap<String, Value>,
    counter: usize,
    suffix: String,
}

/// A rollback point, see [`ResolveContext::checkpoint`].
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    parameters: usize,
    counter: usize,
    fragments: usize,
}

impl ParameterAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator for a batch sub-operation: generated names carry the
    /// sub-operation suffix so they cannot collide across the batch.
    #[must_use]
    pub fn with_suffix(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            ..Self::default()
        }
    }

    /// Registers a variable for `argument` and returns its generated name.
    pub fn bind(&mut self, argument: &str, wire_type: &str, value: Value) -> String {
        self.counter += 1;
        let name = format!("{argument}{}_{}", self.suffix, self.counter);
        self.declarations.insert(name.clone(), wire_type.to_string());
        self.values.insert(name.clone(), value);
        name
    }

    /// Generated variable names and their wire types, in binding order.
    pub fn declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations.iter().map(|(name, ty)| (name.as_str(), ty.as_str()))
    }

    /// Generated variable names and their values, in binding order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// Fragment definitions emitted in one document, keyed by fragment name.
///
/// The first definition registered for a name wins.
#[derive(Debug, Clone, Default)]
pub struct FragmentSet {
    // `None` marks a fragment whose body is still being resolved.
    definitions: IndexMap<String, Option<String>>,
}

impl FragmentSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    fn reserve(&mut self, name: &str) {
        self.definitions.insert(name.to_string(), None);
    }

    fn fill(&mut self, name: &str, definition: String) {
        if let Some(slot) = self.definitions.get_mut(name) {
            *slot = Some(definition);
        }
    }

    fn release(&mut self, name: &str) {
        self.definitions.shift_remove(name);
    }

    /// Adds every definition of `other` whose name is not yet present.
    pub fn merge(&mut self, other: Self) {
        for (name, definition) in other.definitions {
            self.definitions.entry(name).or_insert(definition);
        }
    }

    /// Registers a completed definition unless `name` is already present.
    pub fn insert(&mut self, name: impl Into<String>, definition: impl Into<String>) {
        self.definitions
            .entry(name.into())
            .or_insert_with(|| Some(definition.into()));
    }

    /// The completed definition registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.definitions.get(name).and_then(Option::as_deref)
    }

    /// Completed definitions with their names, in registration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.definitions
            .iter()
            .filter_map(|(name, definition)| Some((name.as_str(), definition.as_deref()?)))
    }

    /// Completed definitions, in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &str> {
        self.definitions.values().filter_map(Option::as_deref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All definitions joined into document text.
    #[must_use]
    pub fn render(&self) -> String {
        self.definitions().collect::<Vec<_>>().join(" ")
    }
}

impl PartialEq for FragmentSet {
    fn eq(&self, other: &Self) -> bool {
        self.definitions().eq(other.definitions())
    }
}

/// Mutable state threaded through one resolution pass.
///
/// Use a fresh context for every document; reusing one across documents
/// leaks generated variables and fragments between them.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    pub parameters: ParameterAccumulator,
    pub fragments: FragmentSet,
}

impl ResolveContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_suffix(suffix: impl Into<String>) -> Self {
        Self {
            parameters: ParameterAccumulator::with_suffix(suffix),
            fragments: FragmentSet::new(),
        }
    }

    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            parameters: self.parameters.declarations.len(),
            counter: self.parameters.counter,
            fragments: self.fragments.definitions.len(),
        }
    }

    /// Forgets everything registered since `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.parameters.declarations.truncate(checkpoint.parameters);
        self.parameters.values.truncate(checkpoint.parameters);
        self.parameters.counter = checkpoint.counter;
        self.fragments.definitions.truncate(checkpoint.fragments);
    }
}

/// Resolves `entity` under `include` and returns what `mode` asks for.
///
/// In [`ResolveMode::Extract`] the walk is the same, and the fragment
/// definitions it registered are returned as the selection text.
#[tracing::instrument(skip(definitions, include, ctx), fields(has_include = include.is_some()))]
pub fn resolve_fields(
    definitions: &Definitions,
    entity: &str,
    include: Option<&IncludeSpec>,
    field_override: Option<&str>,
    mode: ResolveMode,
    ctx: &mut ResolveContext,
) -> Result<Selection> {
    let selection = resolve(definitions, entity, include, field_override, ctx)?;
    Ok(match (mode, selection) {
        (ResolveMode::Inline, selection) | (ResolveMode::Extract, selection @ Selection::Leaf) => {
            selection
        }
        (ResolveMode::Extract, Selection::Fields(_)) => Selection::Fields(ctx.fragments.render()),
    })
}

/// Inline selection of an entity, the building block for hand-written
/// documents.
pub fn fragment(
    definitions: &Definitions,
    entity: &str,
    include: Option<&IncludeSpec>,
    field_override: Option<&str>,
) -> Result<Selection> {
    resolve(definitions, entity, include, field_override, &mut ResolveContext::new())
}

/// The recursive walk behind [`resolve_fields`].
pub fn resolve(
    definitions: &Definitions,
    entity: &str,
    include: Option<&IncludeSpec>,
    field_override: Option<&str>,
    ctx: &mut ResolveContext,
) -> Result<Selection> {
    let Some(descriptor) = definitions.entity(entity) else {
        return Ok(Selection::Leaf);
    };

    let base = field_override.map_or_else(|| descriptor.default_selection(), str::to_string);
    let Some(include) = include else {
        return Ok(Selection::Fields(base));
    };

    let entries = match include {
        IncludeSpec::List(entries) => entries,
        IncludeSpec::Malformed(reason) => {
            tracing::warn!(entity, reason = %reason, "Ignoring malformed include");
            return Ok(Selection::Fields(String::new()));
        }
    };

    let mut parts = Vec::with_capacity(entries.len() + 1);
    if !base.is_empty() {
        parts.push(base);
    }

    for entry in entries {
        match entry {
            Include::Exclude(name) => {
                relation_descriptor(descriptor, entity, name)?;
            }
            Include::Wildcard { as_fragment } => {
                let remaining = descriptor
                    .available_relations
                    .keys()
                    .filter(|name| !is_mentioned(entries, name));
                for name in remaining {
                    let synthetic = RelationInclude {
                        as_fragment: *as_fragment,
                        ..RelationInclude::new(name.clone())
                    };
                    parts.extend(render_relation(definitions, descriptor, entity, &synthetic, ctx)?);
                }
            }
            Include::Relation(relation) => {
                parts.extend(render_relation(definitions, descriptor, entity, relation, ctx)?);
            }
        }
    }

    Ok(Selection::Fields(parts.join(" ")))
}

fn is_mentioned(entries: &[Include], relation: &str) -> bool {
    entries
        .iter()
        .any(|entry| entry.relation_name() == Some(relation))
}

fn relation_descriptor<'a>(
    descriptor: &'a EntityDescriptor,
    entity: &str,
    relation: &str,
) -> Result<&'a graphql_definitions::RelationDescriptor> {
    descriptor
        .relation(relation)
        .ok_or_else(|| BuildError::UnknownRelation {
            entity: entity.to_string(),
            relation: relation.to_string(),
            suggestion: closest(relation, descriptor.available_relations.keys()),
        })
}

/// Renders one relation of `entity`, or `None` when it selects nothing.
fn render_relation(
    definitions: &Definitions,
    descriptor: &EntityDescriptor,
    entity: &str,
    include: &RelationInclude,
    ctx: &mut ResolveContext,
) -> Result<Option<String>> {
    let relation = relation_descriptor(descriptor, entity, &include.relation)?;
    let checkpoint = ctx.checkpoint();

    let mut head = match &include.alias {
        Some(alias) => format!("{alias}: {}", include.relation),
        None => include.relation.clone(),
    };

    if !include.arguments.is_empty() {
        let mut bindings = Vec::with_capacity(include.arguments.len());
        for (argument, value) in &include.arguments {
            let wire_type = relation.declared_arguments.get(argument).ok_or_else(|| {
                BuildError::UnknownArgument {
                    entity: entity.to_string(),
                    relation: include.relation.clone(),
                    argument: argument.clone(),
                }
            })?;
            let variable = ctx.parameters.bind(argument, wire_type, value.clone());
            bindings.push(format!("{argument}: ${variable}"));
        }
        head.push('(');
        head.push_str(&bindings.join(", "));
        head.push(')');
    }

    let target = relation.target_entity.as_str();
    let nested = include.nested.as_ref();
    let field_override = include.field_override.as_deref();

    if include.as_fragment {
        if let Some(target_descriptor) = definitions.entity(target) {
            if ctx.fragments.contains(target) {
                return Ok(Some(format!("{head}{{...{target}}}")));
            }

            ctx.fragments.reserve(target);
            let body = resolve(definitions, target, nested, field_override, ctx)?;
            let body = body.text();
            if body.is_empty() {
                ctx.fragments.release(target);
                ctx.rollback(checkpoint);
                return Ok(None);
            }

            ctx.fragments.fill(
                target,
                format!(
                    "fragment {target} on {} {{ {body} }}",
                    target_descriptor.entity_type_name
                ),
            );
            return Ok(Some(format!("{head}{{...{target}}}")));
        }
    }

    match resolve(definitions, target, nested, field_override, ctx)? {
        Selection::Leaf => Ok(Some(match field_override {
            Some(fields) => format!("{head}{{{fields}}}"),
            None => head,
        })),
        Selection::Fields(text) if text.is_empty() => {
            ctx.rollback(checkpoint);
            Ok(None)
        }
        Selection::Fields(text) => Ok(Some(format!("{head}{{{text}}}"))),
    }
}
