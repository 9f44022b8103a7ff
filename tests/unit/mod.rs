// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for kafka-source-webhook.
//!
//! These tests exercise the public validation API and the admission review
//! mapping without a Kubernetes cluster.

#[path = "../common/mod.rs"]
mod common;

mod immutability_tests {
    use crate::common::fixtures::{KafkaSourceBuilder, full_spec};
    use kafka_source_webhook::crd::KafkaSourceSpec;
    use kafka_source_webhook::{Error, UpdateRequest, validate};

    fn rejected_paths(old: &KafkaSourceSpec, new: &KafkaSourceSpec) -> Vec<String> {
        match validate(&UpdateRequest::update(old, new)) {
            Ok(()) => Vec::new(),
            Err(Error::ImmutableFields(violations)) => violations.paths(),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_nil_prior_allowed() {
        let spec = full_spec();
        assert!(validate(&UpdateRequest::create(&spec)).is_ok());
    }

    #[test]
    fn test_no_change_allowed() {
        let old = full_spec();
        let new = full_spec();
        assert!(validate(&UpdateRequest::update(&old, &new)).is_ok());
    }

    #[test]
    fn test_topic_changed() {
        let new = KafkaSourceBuilder::default()
            .topics("some-other-topic")
            .build_spec();
        assert_eq!(rejected_paths(&full_spec(), &new), vec!["topics"]);
    }

    #[test]
    fn test_bootstrap_servers_changed() {
        let new = KafkaSourceBuilder::default()
            .bootstrap_servers("server1,server2")
            .build_spec();
        assert_eq!(rejected_paths(&full_spec(), &new), vec!["bootstrapServers"]);
    }

    #[test]
    fn test_consumer_group_changed() {
        let new = KafkaSourceBuilder::default()
            .consumer_group("some-other-group")
            .build_spec();
        assert_eq!(rejected_paths(&full_spec(), &new), vec!["consumerGroup"]);
    }

    #[test]
    fn test_sink_api_version_changed() {
        let new = KafkaSourceBuilder::default()
            .sink_ref("some-other-api-version", "bar", "baz", "qux")
            .build_spec();
        assert_eq!(rejected_paths(&full_spec(), &new), vec!["sink.ref.apiVersion"]);
    }

    #[test]
    fn test_sink_kind_changed() {
        let new = KafkaSourceBuilder::default()
            .sink_ref("foo", "some-other-kind", "baz", "qux")
            .build_spec();
        assert_eq!(rejected_paths(&full_spec(), &new), vec!["sink.ref.kind"]);
    }

    #[test]
    fn test_sink_namespace_changed() {
        let new = KafkaSourceBuilder::default()
            .sink_ref("foo", "bar", "some-other-namespace", "qux")
            .build_spec();
        assert_eq!(rejected_paths(&full_spec(), &new), vec!["sink.ref.namespace"]);
    }

    #[test]
    fn test_sink_name_changed() {
        let new = KafkaSourceBuilder::default()
            .sink_ref("foo", "bar", "baz", "some-other-name")
            .build_spec();
        assert_eq!(rejected_paths(&full_spec(), &new), vec!["sink.ref.name"]);
    }

    #[test]
    fn test_service_account_name_changed() {
        let new = KafkaSourceBuilder::default()
            .service_account_name("some-other-service-account")
            .build_spec();
        assert_eq!(rejected_paths(&full_spec(), &new), vec!["serviceAccountName"]);
    }

    #[test]
    fn test_sink_removed() {
        let new = KafkaSourceBuilder::default().no_sink().build_spec();
        assert_eq!(rejected_paths(&full_spec(), &new), vec!["sink"]);
    }

    #[test]
    fn test_compound_change_reports_every_field() {
        let new = KafkaSourceBuilder::default()
            .topics("some-other-topic")
            .sink_ref("foo", "bar", "baz", "some-other-name")
            .build_spec();
        assert_eq!(
            rejected_paths(&full_spec(), &new),
            vec!["topics", "sink.ref.name"]
        );
    }

    #[test]
    fn test_error_message_lists_old_and_new() {
        let old = full_spec();
        let new = KafkaSourceBuilder::default()
            .sink_ref("foo", "some-other-kind", "baz", "qux")
            .build_spec();

        let err = validate(&UpdateRequest::update(&old, &new)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "immutable fields changed:\nsink.ref.kind: \"bar\" → \"some-other-kind\""
        );
    }

    #[test]
    fn test_violation_exposes_old_and_new_values() {
        let old = full_spec();
        let new = KafkaSourceBuilder::default().no_sink().build_spec();

        let Err(Error::ImmutableFields(set)) = validate(&UpdateRequest::update(&old, &new)) else {
            panic!("expected immutable field error");
        };
        let violation = &set.violations()[0];
        assert_eq!(violation.path.to_string(), "sink");
        assert_eq!(violation.old["ref"]["name"], serde_json::json!("qux"));
        assert!(violation.new.is_null());
    }
}

mod policy_tests {
    use crate::common::fixtures::{KafkaSourceBuilder, full_spec};
    use kafka_source_webhook::{
        ImmutabilityPolicy, UpdateRequest, ValidationOutcome, aggregate, diff,
    };

    #[test]
    fn test_default_policy_has_no_mutable_fields() {
        assert!(ImmutabilityPolicy::default().mutable_fields().is_empty());
    }

    #[test]
    fn test_allow_listed_field_may_change() {
        let policy = ImmutabilityPolicy::with_mutable_fields(["serviceAccountName"]);
        let old = full_spec();
        let new = KafkaSourceBuilder::default()
            .service_account_name("rotated")
            .build_spec();

        assert!(policy.validate(&UpdateRequest::update(&old, &new)).is_ok());
        assert!(
            ImmutabilityPolicy::default()
                .validate(&UpdateRequest::update(&old, &new))
                .is_err()
        );
    }

    #[test]
    fn test_aggregate_matches_diff() {
        let old = full_spec();
        let new = KafkaSourceBuilder::default().topics("other").build_spec();

        match aggregate(diff(&old, &new)) {
            ValidationOutcome::Invalid(set) => assert_eq!(set.paths(), vec!["topics"]),
            ValidationOutcome::Valid => panic!("expected invalid outcome"),
        }
        assert_eq!(aggregate(diff(&old, &old)), ValidationOutcome::Valid);
    }
}

mod admission_tests {
    use crate::common::fixtures::KafkaSourceBuilder;
    use kafka_source_webhook::ImmutabilityPolicy;
    use kafka_source_webhook::crd::KafkaSource;
    use kafka_source_webhook::webhooks::{AdmissionReview, review};
    use serde_json::{Value, json};

    fn admission_review(
        operation: &str,
        object: Option<&KafkaSource>,
        old_object: Option<&KafkaSource>,
    ) -> AdmissionReview<KafkaSource> {
        serde_json::from_value(json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "e911857d-c318-11e8-bbad-025000000001",
                "kind": { "group": "sources.eventing.knative.dev", "version": "v1alpha1", "kind": "KafkaSource" },
                "resource": { "group": "sources.eventing.knative.dev", "version": "v1alpha1", "resource": "kafkasources" },
                "name": "test-source",
                "namespace": "default",
                "operation": operation,
                "userInfo": { "username": "admin" },
                "object": object,
                "oldObject": old_object,
                "dryRun": false
            }
        }))
        .unwrap()
    }

    fn respond(review_in: AdmissionReview<KafkaSource>) -> Value {
        serde_json::to_value(review(&ImmutabilityPolicy::default(), review_in)).unwrap()
    }

    #[test]
    fn test_update_with_changed_sink_denied() {
        let old = KafkaSourceBuilder::default().namespace("default").build();
        let new = KafkaSourceBuilder::default()
            .namespace("default")
            .sink_ref("foo", "bar", "baz", "some-other-name")
            .build();

        let response = respond(admission_review("UPDATE", Some(&new), Some(&old)));
        assert_eq!(response["response"]["allowed"], json!(false));
        let message = response["response"]["status"]["message"].as_str().unwrap();
        assert!(message.contains("sink.ref.name"));
    }

    #[test]
    fn test_create_with_any_spec_allowed() {
        let new = KafkaSourceBuilder::default()
            .namespace("default")
            .no_sink()
            .topics("")
            .build();

        let response = respond(admission_review("CREATE", Some(&new), None));
        assert_eq!(response["response"]["allowed"], json!(true));
    }

    #[test]
    fn test_metadata_only_update_allowed() {
        let old = KafkaSourceBuilder::default().namespace("default").build();
        let new = KafkaSourceBuilder::default()
            .namespace("default")
            .uid("some-uid")
            .build();

        let response = respond(admission_review("UPDATE", Some(&new), Some(&old)));
        assert_eq!(response["response"]["allowed"], json!(true));
    }
}
