//! Admission validation for KafkaSource resources.
//!
//! - `policies`: the immutability policy and its request/violation types
//! - `admission`: mapping between kube-rs `AdmissionReview`s and the policy

pub mod admission;
pub mod policies;

pub use admission::{review, review_json};
pub use policies::{ImmutabilityPolicy, UpdateRequest, ValidationResult, validate};

// Re-export kube-rs admission types for callers building reviews
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
