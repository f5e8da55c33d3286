use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config in {path}: {message}")]
    Invalid { path: PathBuf, message: String },

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),
}
