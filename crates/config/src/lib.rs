//! Client configuration.
//!
//! A project keeps its endpoint, headers and the path to its persisted
//! definitions in a `.graphqlclientrc` file next to the code that uses it:
//!
//! ```yaml
//! endpoint: https://api.example.com/graphql
//! definitions: generated/definitions.json
//! headers:
//!   X-Client-Name: storefront
//! timeout: 10
//! batchChunkSize: 50
//! ```
//!
//! [`find_config`] walks up from a directory to the nearest config file and
//! [`load_config`] parses and validates it.

mod config;
mod error;
mod loader;

pub use config::ClientConfig;
pub use error::{ConfigError, Result};
pub use loader::{find_config, load_config, load_config_from_str, CONFIG_FILES};
