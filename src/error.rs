//! Error types for schema compilation, streaming, and loading.
//!
//! Validation *violations* are not errors: they are collected as
//! [`Problem`](crate::Problem)s and returned in the report. The enums here
//! cover the fatal channel — malformed schemas, malformed token streams,
//! and I/O — which must never be conflated with the problem list.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while compiling a schema document into a schema graph.
///
/// All of these abort compilation before any validation run starts.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema at {pointer}: expected a boolean or object, got {actual}")]
    NotASchema {
        pointer: String,
        actual: &'static str,
    },

    #[error("invalid \"{keyword}\" at {pointer}: {message}")]
    InvalidKeyword {
        keyword: &'static str,
        pointer: String,
        message: String,
    },

    #[error("unknown type name \"{name}\" at {pointer}")]
    UnknownType { name: String, pointer: String },

    #[error("invalid pattern at {pointer}: {source}")]
    InvalidPattern {
        pointer: String,
        #[source]
        source: Box<regex::Error>,
    },

    #[error("unresolved reference \"{uri}\" at {pointer}")]
    UnresolvedRef { uri: String, pointer: String },

    #[error("circular reference through in-place keywords at {pointer}")]
    CircularReference { pointer: String },

    #[error("keyword \"{keyword}\" at {pointer} has no negated form")]
    UnsupportedNegation {
        keyword: &'static str,
        pointer: String,
    },
}

/// Structural errors in the token stream.
///
/// These indicate a malformed or truncated document (or a misbehaving
/// [`TokenSource`](crate::TokenSource)), never a validation outcome.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("token stream is empty")]
    EmptyStream,

    #[error("token stream ended at depth {depth} before the document completed")]
    UnexpectedEnd { depth: usize },

    #[error("close event without a matching open")]
    UnbalancedClose,

    #[error("close event for {actual} while inside {expected}")]
    MismatchedClose {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("stream began with a {actual} event instead of a value")]
    NotAValue { actual: &'static str },
}

/// Errors while loading JSON documents from files, strings, or URLs.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

/// Combined error for the compile-then-validate convenience entry points.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl SchemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl StreamError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::InvalidJson { .. } => 2,
        }
    }
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Schema(e) => e.exit_code(),
            ValidateError::Stream(e) => e.exit_code(),
            ValidateError::Load(e) => e.exit_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("schema.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = LoadError::InvalidJson {
            source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn schema_error_exit_code() {
        let err = SchemaError::UnresolvedRef {
            uri: "#/$defs/missing".into(),
            pointer: "/properties/id".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn schema_error_display() {
        let err = SchemaError::InvalidKeyword {
            keyword: "maxItems",
            pointer: "/items".into(),
            message: "expected a non-negative integer".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid \"maxItems\" at /items: expected a non-negative integer"
        );
    }

    #[test]
    fn stream_error_display() {
        let err = StreamError::UnexpectedEnd { depth: 2 };
        assert_eq!(
            err.to_string(),
            "token stream ended at depth 2 before the document completed"
        );
    }
}
