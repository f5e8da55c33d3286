//! Dispatches generated GraphQL documents and normalizes the results.
//!
//! A [`Client`] owns the entity catalog and a [`Transport`]. Every call
//! builds its document fresh, sends it, and maps the raw outcome onto a
//! [`UniformResult`]: data, errors, or a lapsed marker for superseded calls.
//!
//! ```no_run
//! use graphql_builder::OperationRequest;
//! use graphql_definitions::load_definitions;
//! use graphql_dispatch::{Client, ClientOptions, DispatchOptions, HttpTransport, UniformResult};
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = "https://api.example.com/graphql";
//! let definitions = load_definitions(Path::new("definitions.json"))?;
//! let client = Client::new(definitions, HttpTransport::new(endpoint), ClientOptions::new(endpoint));
//!
//! let request = OperationRequest::new("user").variable("id", "1");
//! match client.get(&request, &DispatchOptions::new()).await? {
//!     UniformResult::Data(user) => println!("{user}"),
//!     UniformResult::Errors { errors, .. } => eprintln!("{} errors", errors.len()),
//!     UniformResult::Lapsed { .. } => {}
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod http;
mod normalize;
mod redact;
mod request;
mod response;
mod tracker;
mod transport;
mod ws;

pub use client::{
    retry_hook, BatchOutcome, ChunkReport, Client, ClientOptions, RetryHook, SubscriptionHandle,
};
pub use error::{DispatchError, Result};
pub use http::HttpTransport;
pub use normalize::{normalize, NormalizeOptions, UniformResult, NETWORK_ERROR, TIMEOUT, UNKNOWN_ERROR};
pub use redact::is_sensitive;
pub use request::{DispatchOptions, GraphQLRequest};
pub use response::{GraphQLError, GraphQLResponse, RawResult, TransportError};
pub use tracker::RequestTracker;
pub use transport::{NetworkTransport, StreamTransport, Transport};
pub use ws::{subscription_endpoint, WebSocketTransport};
