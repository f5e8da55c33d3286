//! Entity catalog for dynamic GraphQL document construction.
//!
//! The catalog is produced once by an introspection job and persisted as a
//! "definitions" artifact. It describes, for every entity, the scalar fields
//! selected by default and the relations that can be included, and, for every
//! root operation, its argument types and the entity it returns.
//!
//! # Examples
//!
//! ```
//! use graphql_definitions::{Definitions, OperationKind};
//!
//! let definitions = Definitions::from_json_str(r#"{
//!     "entities": {
//!         "user": { "entity": "User", "fields": "id name", "availableInc": {} }
//!     },
//!     "query": { "user": [{ "id": "ID!" }, "user"] }
//! }"#).unwrap();
//!
//! let operation = definitions.operation(OperationKind::Query, "user").unwrap();
//! assert_eq!(operation.root_entity, "user");
//! assert_eq!(definitions.entity("user").unwrap().default_fields, ["id", "name"]);
//! ```

mod error;
mod loader;
mod model;

pub use error::{DefinitionsError, Result};
pub use loader::{load_definitions, load_definitions_from_str};
pub use model::{
    Definitions, EntityDescriptor, OperationDescriptor, OperationKind, RelationDescriptor,
};
