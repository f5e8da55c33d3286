//! # GraphQL Test Utilities
//!
//! Shared test infrastructure for the client crates.
//!
//! - [`fixtures`] - a small blog catalog used across crates
//! - [`mock`] - a scripted [`graphql_dispatch::Transport`]
//! - [`assertions`] - syntax checks and formatting for generated documents

// Test utilities are less strict than production code
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::expect_used)]

pub mod assertions;
pub mod fixtures;
pub mod mock;

pub use assertions::{assert_valid_document, document_errors, format_errors};
pub use fixtures::fixture_definitions;
pub use mock::{MockTransport, RecordedRequest};
