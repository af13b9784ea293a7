//! Streaming JSON Schema validation.
//!
//! jetschema validates JSON documents against JSON Schema documents while
//! consuming the instance as a forward-only stream of tokens, without
//! materializing it into a tree first. Schemas compile once into an
//! immutable node graph; each validation run builds a private tree of
//! resumable keyword evaluators that all read the same token sequence,
//! keyed by nesting depth.
//!
//! # Example
//!
//! ```
//! use jetschema::compile;
//! use serde_json::json;
//!
//! let schema = compile(&json!({
//!     "type": "object",
//!     "required": ["name"],
//!     "properties": {
//!         "name": { "type": "string" },
//!         "tags": {
//!             "type": "array",
//!             "items": { "type": "string" },
//!             "uniqueItems": true
//!         }
//!     }
//! })).unwrap();
//!
//! let report = schema.validate(&json!({
//!     "name": "streamer",
//!     "tags": ["a", "b"]
//! })).unwrap();
//! assert!(report.is_valid());
//!
//! let report = schema.validate(&json!({ "tags": ["a", "a"] })).unwrap();
//! assert!(!report.is_valid());
//! for problem in &report.problems {
//!     println!("{problem}");
//! }
//! ```
//!
//! # Violations vs. errors
//!
//! A run that finds violations still completes normally and returns every
//! [`Problem`] in discovery order. Only two things are errors: a malformed
//! schema document ([`SchemaError`], raised at compile time before any run)
//! and a malformed or truncated token stream ([`StreamError`]).
//!
//! # Streaming
//!
//! Instances can come from any [`TokenSource`]. Most keywords hold O(1)
//! state no matter how large their value is; the whole-value keywords
//! (`enum`, `const`, `uniqueItems`) buffer the one subtree they compare,
//! which is the single deliberate exception. A compiled [`Schema`] is
//! `Send + Sync` and can validate many instances concurrently.

mod assert;
mod capture;
mod combinator;
mod compile;
mod error;
mod eval;
mod keyword;
mod loader;
mod problem;
mod schema;
mod stream;
mod structure;
mod types;
mod validator;

pub use compile::compile;
pub use error::{LoadError, SchemaError, StreamError, ValidateError};
pub use eval::Outcome;
pub use loader::{is_url, load_json, load_json_auto, load_json_str};
pub use problem::Problem;
pub use schema::{Schema, SchemaId};
pub use stream::{Event, TokenSource, ValueSource};
pub use types::{json_type_name, InstanceType, TypeSet};
pub use validator::{validate, validate_stream, ValidationReport};

#[cfg(feature = "remote")]
pub use loader::load_json_url;
