//! Per-request context for validation.
//!
//! Carries the proposed spec and, for UPDATE operations, the stored spec
//! it replaces. A request built as an update always has a prior.

use kube::core::admission::Operation;

use crate::crd::KafkaSourceSpec;
use crate::error::{Error, Result};

/// The specs a single admission request is validated against
#[derive(Clone, Copy, Debug)]
pub struct UpdateRequest<'a> {
    proposed: &'a KafkaSourceSpec,
    prior: Option<&'a KafkaSourceSpec>,
}

impl<'a> UpdateRequest<'a> {
    /// A CREATE request: there is no stored state yet
    pub fn create(proposed: &'a KafkaSourceSpec) -> Self {
        Self {
            proposed,
            prior: None,
        }
    }

    /// An UPDATE request replacing `prior` with `proposed`
    pub fn update(prior: &'a KafkaSourceSpec, proposed: &'a KafkaSourceSpec) -> Self {
        Self {
            proposed,
            prior: Some(prior),
        }
    }

    /// Build a request from an admission operation.
    ///
    /// UPDATE without a prior spec is rejected rather than treated as a
    /// create. Any prior passed with a non-update operation is ignored.
    pub fn from_operation(
        operation: &Operation,
        prior: Option<&'a KafkaSourceSpec>,
        proposed: &'a KafkaSourceSpec,
    ) -> Result<Self> {
        match operation {
            Operation::Update => match prior {
                Some(prior) => Ok(Self::update(prior, proposed)),
                None => Err(Error::MissingPrior {
                    operation: operation.clone(),
                }),
            },
            _ => Ok(Self::create(proposed)),
        }
    }

    /// The stored spec, if this is an update
    pub fn prior(&self) -> Option<&'a KafkaSourceSpec> {
        self.prior
    }

    /// The spec being admitted
    pub fn proposed(&self) -> &'a KafkaSourceSpec {
        self.proposed
    }

    /// Check if this is an UPDATE operation
    pub fn is_update(&self) -> bool {
        self.prior.is_some()
    }
}
