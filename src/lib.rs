//! kafka-source-webhook library crate
//!
//! Decides whether an update to a KafkaSource may be admitted: the spec is
//! immutable after creation, and every changed field is reported by path.

pub mod crd;
pub mod error;
pub mod webhooks;

pub use error::{Error, Result};
pub use webhooks::policies::{
    FieldPath, FieldViolation, ImmutabilityPolicy, UpdateRequest, ValidationOutcome, ViolationSet,
    aggregate, diff, validate,
};
