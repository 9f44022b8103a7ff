//! Error types for admission validation.

use kube::core::admission::Operation;
use thiserror::Error;

use crate::webhooks::policies::ViolationSet;

/// Error type for validation and admission handling
#[derive(Error, Debug)]
pub enum Error {
    /// One or more immutable spec fields differ from the stored resource
    #[error("immutable fields changed:\n{0}")]
    ImmutableFields(ViolationSet),

    /// The AdmissionReview could not be turned into a request
    #[error("Invalid AdmissionReview: {0}")]
    InvalidReview(String),

    /// The request carries no object to validate
    #[error("Missing object in request")]
    MissingObject,

    /// An update arrived without the stored object it replaces
    #[error("{operation:?} request is missing the prior object")]
    MissingPrior { operation: Operation },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Reason string used when surfacing this error in an admission response
    pub fn reason(&self) -> &'static str {
        match self {
            Error::ImmutableFields(_) => "ImmutableFieldChanged",
            Error::InvalidReview(_) | Error::MissingObject | Error::MissingPrior { .. } => {
                "InvalidRequest"
            }
            Error::Serialization(_) => "SerializationFailed",
        }
    }

    /// Check if the error comes from a malformed request rather than a policy decision
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Error::ImmutableFields(_))
    }
}

/// Result type alias for validation operations
pub type Result<T> = std::result::Result<T, Error>;
