use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DefinitionsError>;

#[derive(Debug, Error)]
pub enum DefinitionsError {
    #[error("Failed to read definitions: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid definitions in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported definitions format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Unknown operation kind '{0}', expected query, mutation or subscription")]
    UnknownKind(String),
}
