//! Validation entry points.

use serde::Serialize;
use serde_json::Value;

use crate::compile::compile;
use crate::error::ValidateError;
use crate::problem::Problem;
use crate::stream::TokenSource;

/// The outcome of one validation run.
///
/// Problems are delivered as a complete ordered list per run — discovery
/// order, no deduplication — once the stream has been fully consumed. A
/// run with violations is still a *successful* run; only structural
/// stream errors abort it.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    /// Whether the instance satisfied the schema.
    pub valid: bool,
    /// Every violation found, in discovery order.
    pub problems: Vec<Problem>,
}

impl ValidationReport {
    /// Whether the instance satisfied the schema.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Compile a schema document and validate a parsed instance against it.
///
/// Use [`compile`] + [`Schema::validate`](crate::Schema::validate) when
/// validating several instances against one schema.
///
/// # Errors
///
/// Returns [`ValidateError::Schema`] if the schema document is malformed,
/// or [`ValidateError::Stream`] for structural stream errors. Validation
/// violations are not errors; they are reported in the returned report.
pub fn validate(schema: &Value, instance: &Value) -> Result<ValidationReport, ValidateError> {
    let compiled = compile(schema)?;
    Ok(compiled.validate(instance)?)
}

/// Compile a schema document and validate a token stream against it.
///
/// # Errors
///
/// As [`validate`], plus any error produced by the source itself.
pub fn validate_stream(
    schema: &Value,
    source: &mut dyn TokenSource,
) -> Result<ValidationReport, ValidateError> {
    let compiled = compile(schema)?;
    Ok(compiled.validate_stream(source)?)
}
