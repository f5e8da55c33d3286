use crate::{Definitions, DefinitionsError, Result};
use std::fs;
use std::path::Path;

/// Load a definitions artifact from disk.
/// The format is detected from the file extension.
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_definitions(path: &Path) -> Result<Definitions> {
    tracing::debug!("Reading definitions file");
    let contents = fs::read_to_string(path)?;
    let definitions = load_definitions_from_str(&contents, path)?;
    tracing::info!(
        entities = definitions.entities.len(),
        operations = definitions.operation_count(),
        "Definitions loaded"
    );
    Ok(definitions)
}

/// Load a definitions artifact from a string.
/// The path is used for error messages and format detection.
#[tracing::instrument(skip(contents), fields(path = %path.display(), size = contents.len()))]
pub fn load_definitions_from_str(contents: &str, path: &Path) -> Result<Definitions> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    match extension {
        "json" => parse_json(contents, path),
        "yml" | "yaml" => parse_yaml(contents, path),
        "js" | "cjs" => {
            tracing::trace!("Stripping module.exports wrapper");
            parse_json(strip_module_exports(contents), path)
        }
        _ => Err(DefinitionsError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn parse_json(contents: &str, path: &Path) -> Result<Definitions> {
    serde_json::from_str(contents).map_err(|e| DefinitionsError::Parse {
        path: path.to_path_buf(),
        message: format!("JSON parse error: {e}"),
    })
}

fn parse_yaml(contents: &str, path: &Path) -> Result<Definitions> {
    serde_saphyr::from_str(contents).map_err(|e| DefinitionsError::Parse {
        path: path.to_path_buf(),
        message: format!("YAML parse error: {e}"),
    })
}

/// `module.exports = {...};` -> `{...}`
fn strip_module_exports(contents: &str) -> &str {
    let trimmed = contents.trim();
    let body = trimmed
        .strip_prefix("module.exports")
        .map_or(trimmed, |rest| rest.trim_start().trim_start_matches('=').trim_start());
    body.trim_end().trim_end_matches(';').trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const JSON: &str = r#"{"entities":{"user":{"entity":"User","fields":"id name","availableInc":{}}},"query":{"users":[{},"user"]}}"#;

    #[test]
    fn test_load_json() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(JSON.as_bytes()).unwrap();
        file.flush().unwrap();

        let definitions = load_definitions(file.path()).unwrap();
        assert_eq!(definitions.entities.len(), 1);
        assert_eq!(definitions.query.len(), 1);
    }

    #[test]
    fn test_load_module_exports() {
        let contents = format!("module.exports = {JSON};\n");
        let definitions = load_definitions_from_str(&contents, Path::new("definitions.js")).unwrap();
        assert!(definitions.entity("user").is_some());
    }

    #[test]
    fn test_load_yaml() {
        let yaml = r"
entities:
  user:
    entity: User
    fields: id name
    availableInc:
      posts:
        type: post
        args:
          first: Int
query:
  user:
    - id: ID!
    - user
";
        let definitions = load_definitions_from_str(yaml, Path::new("definitions.yml")).unwrap();
        let user = definitions.entity("user").unwrap();
        assert_eq!(user.default_fields, ["id", "name"]);
        assert_eq!(user.relation("posts").unwrap().target_entity, "post");
        assert_eq!(definitions.query["user"].argument_types["id"], "ID!");
    }

    #[test]
    fn test_unsupported_extension() {
        let result = load_definitions_from_str(JSON, Path::new("definitions.toml"));
        assert!(matches!(result, Err(DefinitionsError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_parse_error_names_path() {
        let result = load_definitions_from_str("{ not json", Path::new("broken.json"));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_missing_file() {
        let result = load_definitions(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(DefinitionsError::Io(_))));
    }

    #[test]
    fn test_strip_module_exports() {
        assert_eq!(strip_module_exports("module.exports = {};"), "{}");
        assert_eq!(strip_module_exports("module.exports={\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_module_exports("  {}  "), "{}");
    }
}
