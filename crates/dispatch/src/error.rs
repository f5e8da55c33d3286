use graphql_builder::BuildError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Failures raised across the client boundary.
///
/// Request-level failures (network, timeout, server errors) never surface
/// here: they are folded into [`crate::UniformResult`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Failed to open subscription connection: {0}")]
    Connect(String),

    #[error("Failed to create HTTP client: {0}")]
    Http(String),
}
