use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildError>;

/// Catalog errors raised while building a document.
///
/// These are caller programming errors (an include or variable naming
/// something the catalog does not declare) and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Unknown relation '{relation}' on entity '{entity}'{}", did_you_mean(.suggestion.as_deref()))]
    UnknownRelation {
        entity: String,
        relation: String,
        suggestion: Option<String>,
    },

    #[error("Relation '{relation}' on entity '{entity}' declares no argument '{argument}'")]
    UnknownArgument {
        entity: String,
        relation: String,
        argument: String,
    },

    #[error("Operation '{operation}' declares no argument for variable '{variable}'")]
    UnknownVariable { operation: String, variable: String },
}

fn did_you_mean(suggestion: Option<&str>) -> String {
    suggestion.map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"))
}

/// Closest candidate by edit distance, if it is close enough to be a typo.
pub(crate) fn closest<'a>(name: &str, candidates: impl Iterator<Item = &'a String>) -> Option<String> {
    candidates
        .map(|candidate| (strsim::levenshtein(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.clone())
}
