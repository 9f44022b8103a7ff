//! Admission review handling.
//!
//! Turns a KafkaSource `AdmissionReview` into an allow/deny response review
//! by running the immutability policy. Delivery of reviews (HTTPS, TLS,
//! webhook registration) is left to the caller.

use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use tracing::{debug, error, info, warn};

use crate::crd::KafkaSource;
use crate::error::{Error, Result};
use crate::webhooks::policies::{ImmutabilityPolicy, UpdateRequest, ValidationResult};

/// Create a denial response with reason embedded in message.
/// kube-rs deny() only sets status.message, so we format as "[reason] message"
fn deny_with_reason(
    request: &AdmissionRequest<KafkaSource>,
    message: &str,
    reason: &str,
) -> AdmissionReview<DynamicObject> {
    let full_message = format!("[{}] {}", reason, message);
    AdmissionResponse::from(request)
        .deny(full_message)
        .into_review()
}

/// Validate a KafkaSource admission request
fn validate_request(
    policy: &ImmutabilityPolicy,
    request: &AdmissionRequest<KafkaSource>,
) -> Result<()> {
    let resource = request.object.as_ref().ok_or(Error::MissingObject)?;
    let prior = request.old_object.as_ref().map(|old| &old.spec);

    let update = UpdateRequest::from_operation(&request.operation, prior, &resource.spec)?;
    policy.validate(&update)
}

/// Answer an admission review for a KafkaSource
pub fn review(
    policy: &ImmutabilityPolicy,
    review: AdmissionReview<KafkaSource>,
) -> AdmissionReview<DynamicObject> {
    let request: AdmissionRequest<KafkaSource> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to extract admission request");
            return AdmissionResponse::invalid(Error::InvalidReview(e.to_string())).into_review();
        }
    };

    let uid = &request.uid;
    debug!(
        uid = %uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = ?request.name,
        "Processing admission request"
    );

    // Only CREATE and UPDATE carry a spec to check
    if matches!(request.operation, Operation::Delete | Operation::Connect) {
        info!(uid = %uid, operation = ?request.operation, "Admission request allowed");
        return AdmissionResponse::from(&request).into_review();
    }

    if let Err(err) = validate_request(policy, &request) {
        let result = ValidationResult::from(&err);
        let reason = result
            .reason
            .unwrap_or_else(|| "ValidationFailed".to_string());
        let message = result
            .message
            .unwrap_or_else(|| "Validation failed".to_string());
        if err.is_client_error() {
            error!(uid = %uid, reason = %reason, message = %message, "Malformed admission request denied");
        } else {
            warn!(uid = %uid, reason = %reason, message = %message, "Admission request denied");
        }
        return deny_with_reason(&request, &message, &reason);
    }

    info!(uid = %uid, "Admission request allowed");
    AdmissionResponse::from(&request).into_review()
}

/// Answer a JSON-encoded admission review with a JSON-encoded response review
pub fn review_json(policy: &ImmutabilityPolicy, input: &[u8]) -> Result<Vec<u8>> {
    let incoming: AdmissionReview<KafkaSource> = serde_json::from_slice(input)?;
    let response = review(policy, incoming);
    Ok(serde_json::to_vec(&response)?)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn spec_json(topics: &str) -> Value {
        json!({
            "bootstrapServers": "servers",
            "topics": topics,
            "consumerGroup": "group",
            "sink": {
                "ref": { "apiVersion": "foo", "kind": "bar", "namespace": "baz", "name": "qux" }
            },
            "serviceAccountName": "service-account-name"
        })
    }

    fn object(spec: Value) -> Value {
        json!({
            "apiVersion": "sources.eventing.knative.dev/v1alpha1",
            "kind": "KafkaSource",
            "metadata": { "name": "test", "namespace": "default", "uid": "test-uid" },
            "spec": spec
        })
    }

    fn admission_review(operation: &str, new: Option<Value>, old: Option<Value>) -> Value {
        json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": { "group": "sources.eventing.knative.dev", "version": "v1alpha1", "kind": "KafkaSource" },
                "resource": { "group": "sources.eventing.knative.dev", "version": "v1alpha1", "resource": "kafkasources" },
                "name": "test",
                "namespace": "default",
                "operation": operation,
                "userInfo": { "username": "admin" },
                "object": new,
                "oldObject": old,
                "dryRun": false
            }
        })
    }

    fn run(review_value: Value) -> Value {
        let input = serde_json::to_vec(&review_value).unwrap();
        let output = review_json(&ImmutabilityPolicy::default(), &input).unwrap();
        serde_json::from_slice(&output).unwrap()
    }

    #[test]
    fn test_create_allowed() {
        let response = run(admission_review("CREATE", Some(object(spec_json("topics"))), None));
        assert_eq!(response["response"]["allowed"], json!(true));
        assert_eq!(
            response["response"]["uid"],
            json!("705ab4f5-6393-11e8-b7cc-42010a800002")
        );
    }

    #[test]
    fn test_unchanged_update_allowed() {
        let response = run(admission_review(
            "UPDATE",
            Some(object(spec_json("topics"))),
            Some(object(spec_json("topics"))),
        ));
        assert_eq!(response["response"]["allowed"], json!(true));
    }

    #[test]
    fn test_changed_update_denied_with_path() {
        let response = run(admission_review(
            "UPDATE",
            Some(object(spec_json("some-other-topic"))),
            Some(object(spec_json("topics"))),
        ));
        assert_eq!(response["response"]["allowed"], json!(false));
        let message = response["response"]["status"]["message"].as_str().unwrap();
        assert!(message.starts_with("[ImmutableFieldChanged]"));
        assert!(message.contains(r#"topics: "topics" → "some-other-topic""#));
    }

    #[test]
    fn test_update_without_old_object_denied() {
        let response = run(admission_review("UPDATE", Some(object(spec_json("topics"))), None));
        assert_eq!(response["response"]["allowed"], json!(false));
        let message = response["response"]["status"]["message"].as_str().unwrap();
        assert!(message.starts_with("[InvalidRequest]"));
    }

    #[test]
    fn test_delete_allowed() {
        let response = run(admission_review("DELETE", None, Some(object(spec_json("topics")))));
        assert_eq!(response["response"]["allowed"], json!(true));
    }

    #[test]
    fn test_missing_object_denied() {
        let response = run(admission_review("CREATE", None, None));
        assert_eq!(response["response"]["allowed"], json!(false));
        let message = response["response"]["status"]["message"].as_str().unwrap();
        assert!(message.contains("Missing object"));
    }

    #[test]
    fn test_review_without_request_is_invalid() {
        let response = run(json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview"
        }));
        assert_eq!(response["response"]["allowed"], json!(false));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = review_json(&ImmutabilityPolicy::default(), b"not json").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
