//! Validation policies for KafkaSource admission.
//!
//! Only one policy exists: the spec is immutable after creation, so it is
//! enforced on UPDATE operations and CREATE is always allowed.

pub mod context;
pub mod immutability;
pub mod violations;

pub use context::UpdateRequest;
pub use immutability::{ImmutabilityPolicy, diff};
pub use violations::{FieldPath, FieldViolation, ValidationOutcome, ViolationSet, aggregate};

use crate::error::{Error, Result};

/// Result of a validation check, in the shape an admission response needs
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether the validation passed
    pub allowed: bool,
    /// Reason for denial (if not allowed)
    pub reason: Option<String>,
    /// Detailed message (if not allowed)
    pub message: Option<String>,
}

impl ValidationResult {
    /// Create an allowed result
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            message: None,
        }
    }

    /// Create a denied result
    pub fn denied(reason: &str, message: &str) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
        }
    }
}

impl From<&Error> for ValidationResult {
    fn from(err: &Error) -> Self {
        ValidationResult::denied(err.reason(), &err.to_string())
    }
}

impl From<Result<()>> for ValidationResult {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => ValidationResult::allowed(),
            Err(err) => ValidationResult::from(&err),
        }
    }
}

/// Validate a request with every spec field immutable.
///
/// Returns `Ok(())` for creates and unchanged updates, otherwise
/// `Error::ImmutableFields` listing every changed field.
pub fn validate(request: &UpdateRequest<'_>) -> Result<()> {
    ImmutabilityPolicy::default().validate(request)
}
