//! Builds GraphQL operation documents from an entity catalog and an include
//! specification.
//!
//! ```
//! use graphql_builder::{build_document, OperationRequest};
//! use graphql_definitions::{Definitions, OperationKind};
//! use serde_json::json;
//!
//! let definitions = Definitions::from_json_str(r#"{
//!     "entities": {
//!         "user": { "entity": "User", "fields": "id name", "availableInc": { "posts": { "type": "post" } } },
//!         "post": { "entity": "Post", "fields": "id title" }
//!     },
//!     "query": { "user": [{ "id": "ID!" }, "user"] }
//! }"#).unwrap();
//!
//! let request = OperationRequest::new("user")
//!     .variable("id", "1")
//!     .include(json!(["posts"]));
//! let document = build_document(&definitions, OperationKind::Query, &request).unwrap();
//!
//! assert_eq!(
//!     document.text,
//!     "query do($id: ID!) { user(id: $id) { id name posts{id title} } }"
//! );
//! ```

mod batch;
mod document;
mod error;
mod include;
mod resolve;

pub use batch::{build_batch, chunk_operations, selection_alias, BatchDocument, DEFAULT_CHUNK_SIZE};
pub use document::{build_document, build_sub_operation, Document, OperationRequest, SubOperation, Variables};
pub use error::{BuildError, Result};
pub use include::{Include, IncludeSpec, RelationInclude};
pub use resolve::{
    fragment, resolve, resolve_fields, Checkpoint, FragmentSet, ParameterAccumulator, ResolveContext,
    ResolveMode, Selection,
};
