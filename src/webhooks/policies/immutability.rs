//! Immutability validation policy.
//!
//! Enforced on UPDATE operations only: the whole KafkaSource spec is fixed
//! once the resource is created. Fields are compared one by one in
//! declaration order so each differing leaf is reported at its own path.
//!
//! Rules:
//! - Scalars differ when they are not exactly equal
//! - Optionals: both absent is equal, a presence change is one violation,
//!   both present compares the contents
//! - Paths listed as mutable (and everything beneath them) are skipped

use k8s_openapi::api::core::v1::ObjectReference;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::context::UpdateRequest;
use super::violations::{FieldPath, FieldViolation, ValidationOutcome, aggregate};
use crate::crd::{
    Destination, KafkaResourceQuantities, KafkaResourceSpec, KafkaSourceNetSpec,
    KafkaSourceSaslSpec, KafkaSourceSpec, KafkaSourceTlsSpec, SecretKeySelector,
    SecretValueFromSource,
};
use crate::error::{Error, Result};

/// Immutability policy for KafkaSource specs.
///
/// The default policy treats every field as immutable.
#[derive(Clone, Debug, Default)]
pub struct ImmutabilityPolicy {
    mutable_fields: Vec<String>,
}

impl ImmutabilityPolicy {
    /// Create a policy allowing the given dotted paths (e.g. `resources.limits`) to change
    pub fn with_mutable_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mutable_fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Dotted paths exempt from the immutability check
    pub fn mutable_fields(&self) -> &[String] {
        &self.mutable_fields
    }

    /// Compare two specs, returning violations in field declaration order
    pub fn diff(&self, prior: &KafkaSourceSpec, proposed: &KafkaSourceSpec) -> Vec<FieldViolation> {
        let mut comparator = Comparator {
            policy: self,
            violations: Vec::new(),
        };
        comparator.spec(&FieldPath::root(), prior, proposed);
        comparator.violations
    }

    /// Compare the specs of a request and aggregate the result.
    ///
    /// A request without a prior is always valid.
    pub fn evaluate(&self, request: &UpdateRequest<'_>) -> ValidationOutcome {
        match request.prior() {
            Some(prior) => aggregate(self.diff(prior, request.proposed())),
            None => ValidationOutcome::Valid,
        }
    }

    /// Validate immutability constraints on a request
    pub fn validate(&self, request: &UpdateRequest<'_>) -> Result<()> {
        match self.evaluate(request) {
            ValidationOutcome::Valid => Ok(()),
            ValidationOutcome::Invalid(violations) => {
                debug!(
                    count = violations.len(),
                    paths = ?violations.paths(),
                    "Immutable fields changed"
                );
                Err(Error::ImmutableFields(violations))
            }
        }
    }
}

/// Compare two specs with every field immutable
pub fn diff(prior: &KafkaSourceSpec, proposed: &KafkaSourceSpec) -> Vec<FieldViolation> {
    ImmutabilityPolicy::default().diff(prior, proposed)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

struct Comparator<'p> {
    policy: &'p ImmutabilityPolicy,
    violations: Vec<FieldViolation>,
}

impl Comparator<'_> {
    fn is_mutable(&self, path: &FieldPath) -> bool {
        self.policy
            .mutable_fields
            .iter()
            .any(|field| path.is_within(field))
    }

    fn scalar<T>(&mut self, path: FieldPath, old: &T, new: &T)
    where
        T: PartialEq + Serialize + ?Sized,
    {
        if old == new || self.is_mutable(&path) {
            return;
        }
        self.violations
            .push(FieldViolation::new(path, to_json(old), to_json(new)));
    }

    fn optional<T, F>(&mut self, path: FieldPath, old: Option<&T>, new: Option<&T>, nested: F)
    where
        T: Serialize,
        F: FnOnce(&mut Self, &FieldPath, &T, &T),
    {
        if self.is_mutable(&path) {
            return;
        }
        match (old, new) {
            (None, None) => {}
            (Some(old), Some(new)) => nested(self, &path, old, new),
            (old, new) => self
                .violations
                .push(FieldViolation::new(path, to_json(&old), to_json(&new))),
        }
    }

    fn optional_scalar<T>(&mut self, path: FieldPath, old: &Option<T>, new: &Option<T>)
    where
        T: PartialEq + Serialize,
    {
        self.optional(path, old.as_ref(), new.as_ref(), |c, path, old, new| {
            c.scalar(path.clone(), old, new)
        });
    }

    fn spec(&mut self, path: &FieldPath, old: &KafkaSourceSpec, new: &KafkaSourceSpec) {
        self.scalar(
            path.child("bootstrapServers"),
            &old.bootstrap_servers,
            &new.bootstrap_servers,
        );
        self.scalar(path.child("topics"), &old.topics, &new.topics);
        self.scalar(
            path.child("consumerGroup"),
            &old.consumer_group,
            &new.consumer_group,
        );
        self.net(&path.child("net"), &old.net, &new.net);
        self.optional(
            path.child("sink"),
            old.sink.as_ref(),
            new.sink.as_ref(),
            Self::destination,
        );
        self.scalar(
            path.child("serviceAccountName"),
            &old.service_account_name,
            &new.service_account_name,
        );
        self.resources(&path.child("resources"), &old.resources, &new.resources);
    }

    fn net(&mut self, path: &FieldPath, old: &KafkaSourceNetSpec, new: &KafkaSourceNetSpec) {
        self.sasl(&path.child("sasl"), &old.sasl, &new.sasl);
        self.tls(&path.child("tls"), &old.tls, &new.tls);
    }

    fn sasl(&mut self, path: &FieldPath, old: &KafkaSourceSaslSpec, new: &KafkaSourceSaslSpec) {
        self.scalar(path.child("enable"), &old.enable, &new.enable);
        self.secret_value(&path.child("user"), &old.user, &new.user);
        self.secret_value(&path.child("password"), &old.password, &new.password);
    }

    fn tls(&mut self, path: &FieldPath, old: &KafkaSourceTlsSpec, new: &KafkaSourceTlsSpec) {
        self.scalar(path.child("enable"), &old.enable, &new.enable);
        self.secret_value(&path.child("cert"), &old.cert, &new.cert);
        self.secret_value(&path.child("key"), &old.key, &new.key);
        self.secret_value(&path.child("caCert"), &old.ca_cert, &new.ca_cert);
    }

    fn secret_value(
        &mut self,
        path: &FieldPath,
        old: &SecretValueFromSource,
        new: &SecretValueFromSource,
    ) {
        self.optional(
            path.child("secretKeyRef"),
            old.secret_key_ref.as_ref(),
            new.secret_key_ref.as_ref(),
            Self::secret_key,
        );
    }

    fn secret_key(&mut self, path: &FieldPath, old: &SecretKeySelector, new: &SecretKeySelector) {
        self.scalar(path.child("name"), &old.name, &new.name);
        self.scalar(path.child("key"), &old.key, &new.key);
        self.optional_scalar(path.child("optional"), &old.optional, &new.optional);
    }

    fn destination(&mut self, path: &FieldPath, old: &Destination, new: &Destination) {
        self.optional(
            path.child("ref"),
            old.r#ref.as_ref(),
            new.r#ref.as_ref(),
            Self::object_reference,
        );
        self.optional_scalar(path.child("uri"), &old.uri, &new.uri);
    }

    fn object_reference(&mut self, path: &FieldPath, old: &ObjectReference, new: &ObjectReference) {
        self.optional_scalar(path.child("apiVersion"), &old.api_version, &new.api_version);
        self.optional_scalar(path.child("kind"), &old.kind, &new.kind);
        self.optional_scalar(path.child("namespace"), &old.namespace, &new.namespace);
        self.optional_scalar(path.child("name"), &old.name, &new.name);
        self.optional_scalar(path.child("uid"), &old.uid, &new.uid);
        self.optional_scalar(
            path.child("resourceVersion"),
            &old.resource_version,
            &new.resource_version,
        );
        self.optional_scalar(path.child("fieldPath"), &old.field_path, &new.field_path);
    }

    fn resources(&mut self, path: &FieldPath, old: &KafkaResourceSpec, new: &KafkaResourceSpec) {
        self.quantities(&path.child("requests"), &old.requests, &new.requests);
        self.quantities(&path.child("limits"), &old.limits, &new.limits);
    }

    fn quantities(
        &mut self,
        path: &FieldPath,
        old: &KafkaResourceQuantities,
        new: &KafkaResourceQuantities,
    ) {
        self.scalar(path.child("cpu"), &old.cpu, &new.cpu);
        self.scalar(path.child("memory"), &old.memory, &new.memory);
    }
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
    use serde_json::json;

    fn full_spec() -> KafkaSourceSpec {
        KafkaSourceSpec {
            bootstrap_servers: "servers".to_string(),
            topics: "topics".to_string(),
            consumer_group: "group".to_string(),
            sink: Some(Destination {
                r#ref: Some(ObjectReference {
                    api_version: Some("foo".to_string()),
                    kind: Some("bar".to_string()),
                    namespace: Some("baz".to_string()),
                    name: Some("qux".to_string()),
                    ..Default::default()
                }),
                uri: None,
            }),
            service_account_name: "service-account-name".to_string(),
            ..Default::default()
        }
    }

    fn sink_ref(spec: &mut KafkaSourceSpec) -> &mut ObjectReference {
        spec.sink.as_mut().unwrap().r#ref.as_mut().unwrap()
    }

    fn paths(violations: &[FieldViolation]) -> Vec<String> {
        violations.iter().map(|v| v.path.to_string()).collect()
    }

    fn selector(name: &str, key: &str) -> Option<SecretKeySelector> {
        Some(SecretKeySelector {
            name: name.to_string(),
            key: key.to_string(),
            optional: Some(false),
        })
    }

    /// Spec with every optional populated, so each leaf can be changed in place.
    fn populated_spec() -> KafkaSourceSpec {
        let mut spec = full_spec();
        spec.net.sasl.enable = true;
        spec.net.sasl.user.secret_key_ref = selector("kafka-auth", "user");
        spec.net.sasl.password.secret_key_ref = selector("kafka-auth", "password");
        spec.net.tls.enable = true;
        spec.net.tls.cert.secret_key_ref = selector("kafka-tls", "tls.crt");
        spec.net.tls.key.secret_key_ref = selector("kafka-tls", "tls.key");
        spec.net.tls.ca_cert.secret_key_ref = selector("kafka-tls", "ca.crt");
        let sink = spec.sink.as_mut().unwrap();
        sink.uri = Some("/events".to_string());
        let reference = sink.r#ref.as_mut().unwrap();
        reference.uid = Some("uid-1".to_string());
        reference.resource_version = Some("42".to_string());
        reference.field_path = Some("spec.address".to_string());
        spec.resources.requests.cpu = "250m".to_string();
        spec.resources.requests.memory = "256Mi".to_string();
        spec.resources.limits.cpu = "1".to_string();
        spec.resources.limits.memory = "1Gi".to_string();
        spec
    }

    fn selector_mut(value: &mut SecretValueFromSource) -> &mut SecretKeySelector {
        value.secret_key_ref.as_mut().unwrap()
    }

    fn flip(value: &mut Option<bool>) {
        *value = value.map(|v| !v);
    }

    #[test]
    fn test_every_leaf_reported_at_its_own_path() {
        let cases: &[(&str, fn(&mut KafkaSourceSpec))] = &[
            ("bootstrapServers", |s| s.bootstrap_servers.push('x')),
            ("topics", |s| s.topics.push('x')),
            ("consumerGroup", |s| s.consumer_group.push('x')),
            ("net.sasl.enable", |s| s.net.sasl.enable = false),
            ("net.sasl.user.secretKeyRef.name", |s| {
                selector_mut(&mut s.net.sasl.user).name.push('x')
            }),
            ("net.sasl.user.secretKeyRef.key", |s| {
                selector_mut(&mut s.net.sasl.user).key.push('x')
            }),
            ("net.sasl.user.secretKeyRef.optional", |s| {
                flip(&mut selector_mut(&mut s.net.sasl.user).optional)
            }),
            ("net.sasl.password.secretKeyRef.name", |s| {
                selector_mut(&mut s.net.sasl.password).name.push('x')
            }),
            ("net.sasl.password.secretKeyRef.key", |s| {
                selector_mut(&mut s.net.sasl.password).key.push('x')
            }),
            ("net.sasl.password.secretKeyRef.optional", |s| {
                flip(&mut selector_mut(&mut s.net.sasl.password).optional)
            }),
            ("net.tls.enable", |s| s.net.tls.enable = false),
            ("net.tls.cert.secretKeyRef.name", |s| {
                selector_mut(&mut s.net.tls.cert).name.push('x')
            }),
            ("net.tls.cert.secretKeyRef.key", |s| {
                selector_mut(&mut s.net.tls.cert).key.push('x')
            }),
            ("net.tls.cert.secretKeyRef.optional", |s| {
                flip(&mut selector_mut(&mut s.net.tls.cert).optional)
            }),
            ("net.tls.key.secretKeyRef.name", |s| {
                selector_mut(&mut s.net.tls.key).name.push('x')
            }),
            ("net.tls.key.secretKeyRef.key", |s| {
                selector_mut(&mut s.net.tls.key).key.push('x')
            }),
            ("net.tls.key.secretKeyRef.optional", |s| {
                flip(&mut selector_mut(&mut s.net.tls.key).optional)
            }),
            ("net.tls.caCert.secretKeyRef.name", |s| {
                selector_mut(&mut s.net.tls.ca_cert).name.push('x')
            }),
            ("net.tls.caCert.secretKeyRef.key", |s| {
                selector_mut(&mut s.net.tls.ca_cert).key.push('x')
            }),
            ("net.tls.caCert.secretKeyRef.optional", |s| {
                flip(&mut selector_mut(&mut s.net.tls.ca_cert).optional)
            }),
            ("sink.ref.apiVersion", |s| sink_ref(s).api_version = Some("v2".to_string())),
            ("sink.ref.kind", |s| sink_ref(s).kind = Some("Other".to_string())),
            ("sink.ref.namespace", |s| sink_ref(s).namespace = Some("other".to_string())),
            ("sink.ref.name", |s| sink_ref(s).name = Some("other".to_string())),
            ("sink.ref.uid", |s| sink_ref(s).uid = Some("uid-2".to_string())),
            ("sink.ref.resourceVersion", |s| {
                sink_ref(s).resource_version = Some("43".to_string())
            }),
            ("sink.ref.fieldPath", |s| {
                sink_ref(s).field_path = Some("spec.other".to_string())
            }),
            ("sink.uri", |s| s.sink.as_mut().unwrap().uri = Some("/other".to_string())),
            ("serviceAccountName", |s| s.service_account_name.push('x')),
            ("resources.requests.cpu", |s| s.resources.requests.cpu.push('0')),
            ("resources.requests.memory", |s| s.resources.requests.memory.push('0')),
            ("resources.limits.cpu", |s| s.resources.limits.cpu.push('0')),
            ("resources.limits.memory", |s| s.resources.limits.memory.push('0')),
        ];

        let old = populated_spec();
        assert!(diff(&old, &old).is_empty());

        for &(expected, mutate) in cases {
            let mut new = populated_spec();
            mutate(&mut new);
            let violations = diff(&old, &new);
            assert_eq!(paths(&violations), vec![expected], "changing {expected}");
            assert_ne!(violations[0].old, violations[0].new, "changing {expected}");

            let set = aggregate(violations);
            let ValidationOutcome::Invalid(set) = set else {
                panic!("changing {expected} should be rejected");
            };
            assert_eq!(set.violations().len(), 1);
            assert_eq!(set.violations()[0].path.to_string(), expected);
        }
    }

    #[test]
    fn test_identical_specs_have_no_violations() {
        assert!(diff(&full_spec(), &full_spec()).is_empty());
    }

    #[test]
    fn test_topics_changed() {
        let mut new = full_spec();
        new.topics = "some-other-topic".to_string();

        let violations = diff(&full_spec(), &new);
        assert_eq!(paths(&violations), vec!["topics"]);
        assert_eq!(violations[0].old, json!("topics"));
        assert_eq!(violations[0].new, json!("some-other-topic"));
    }

    #[test]
    fn test_bootstrap_servers_changed() {
        let mut new = full_spec();
        new.bootstrap_servers = "server1,server2".to_string();

        assert_eq!(paths(&diff(&full_spec(), &new)), vec!["bootstrapServers"]);
    }

    #[test]
    fn test_consumer_group_changed() {
        let mut new = full_spec();
        new.consumer_group = "other-group".to_string();

        assert_eq!(paths(&diff(&full_spec(), &new)), vec!["consumerGroup"]);
    }

    #[test]
    fn test_service_account_name_changed() {
        let mut new = full_spec();
        new.service_account_name = "other-account".to_string();

        assert_eq!(paths(&diff(&full_spec(), &new)), vec!["serviceAccountName"]);
    }

    #[test]
    fn test_sink_ref_sub_fields_addressed_precisely() {
        let cases: [(&str, fn(&mut ObjectReference)); 4] = [
            ("sink.ref.apiVersion", |r| {
                r.api_version = Some("some-other-api-version".to_string())
            }),
            ("sink.ref.kind", |r| r.kind = Some("some-other-kind".to_string())),
            ("sink.ref.namespace", |r| {
                r.namespace = Some("some-other-namespace".to_string())
            }),
            ("sink.ref.name", |r| r.name = Some("some-other-name".to_string())),
        ];

        for (expected, mutate) in cases {
            let mut new = full_spec();
            mutate(sink_ref(&mut new));
            assert_eq!(paths(&diff(&full_spec(), &new)), vec![expected]);
        }
    }

    #[test]
    fn test_sink_presence_change() {
        let mut new = full_spec();
        new.sink = None;

        let violations = diff(&full_spec(), &new);
        assert_eq!(paths(&violations), vec!["sink"]);
        assert_eq!(violations[0].new, Value::Null);
        assert_eq!(violations[0].old["ref"]["kind"], json!("bar"));

        // And the other direction
        let violations = diff(&new, &full_spec());
        assert_eq!(paths(&violations), vec!["sink"]);
        assert_eq!(violations[0].old, Value::Null);
    }

    #[test]
    fn test_sink_ref_removed_is_single_violation() {
        let mut new = full_spec();
        new.sink.as_mut().unwrap().r#ref = None;

        assert_eq!(paths(&diff(&full_spec(), &new)), vec!["sink.ref"]);
    }

    #[test]
    fn test_sink_uri_added() {
        let mut new = full_spec();
        new.sink.as_mut().unwrap().uri = Some("/events".to_string());

        assert_eq!(paths(&diff(&full_spec(), &new)), vec!["sink.uri"]);
    }

    #[test]
    fn test_ref_optional_field_set() {
        let mut new = full_spec();
        sink_ref(&mut new).uid = Some("1234".to_string());

        let violations = diff(&full_spec(), &new);
        assert_eq!(paths(&violations), vec!["sink.ref.uid"]);
        assert_eq!(violations[0].old, Value::Null);
    }

    #[test]
    fn test_secret_key_ref_changes() {
        let mut old = full_spec();
        old.net.sasl.enable = true;
        old.net.sasl.user.secret_key_ref = Some(SecretKeySelector {
            name: "kafka-auth".to_string(),
            key: "user".to_string(),
            optional: None,
        });

        let mut new = old.clone();
        new.net.sasl.user.secret_key_ref.as_mut().unwrap().key = "username".to_string();
        assert_eq!(paths(&diff(&old, &new)), vec!["net.sasl.user.secretKeyRef.key"]);

        let mut new = old.clone();
        new.net.sasl.user.secret_key_ref = None;
        assert_eq!(paths(&diff(&old, &new)), vec!["net.sasl.user.secretKeyRef"]);

        let mut new = old.clone();
        new.net.tls.ca_cert.secret_key_ref = Some(SecretKeySelector {
            name: "kafka-ca".to_string(),
            key: "ca.crt".to_string(),
            optional: Some(true),
        });
        assert_eq!(paths(&diff(&old, &new)), vec!["net.tls.caCert.secretKeyRef"]);
    }

    #[test]
    fn test_no_normalization() {
        let mut new = full_spec();
        new.topics = "Topics".to_string();
        assert_eq!(paths(&diff(&full_spec(), &new)), vec!["topics"]);

        let mut new = full_spec();
        new.bootstrap_servers = "servers ".to_string();
        assert_eq!(paths(&diff(&full_spec(), &new)), vec!["bootstrapServers"]);
    }

    #[test]
    fn test_all_violations_in_declaration_order() {
        let mut new = full_spec();
        new.resources.limits.memory = "1Gi".to_string();
        new.service_account_name = "other".to_string();
        sink_ref(&mut new).name = Some("other".to_string());
        sink_ref(&mut new).kind = Some("other".to_string());
        new.net.tls.enable = true;
        new.topics = "other".to_string();
        new.bootstrap_servers = "other".to_string();

        assert_eq!(
            paths(&diff(&full_spec(), &new)),
            vec![
                "bootstrapServers",
                "topics",
                "net.tls.enable",
                "sink.ref.kind",
                "sink.ref.name",
                "serviceAccountName",
                "resources.limits.memory",
            ]
        );
    }

    #[test]
    fn test_mutable_fields_are_skipped() {
        let policy = ImmutabilityPolicy::with_mutable_fields(["resources", "sink.ref.namespace"]);

        let mut new = full_spec();
        new.resources.requests.cpu = "250m".to_string();
        new.resources.limits.memory = "1Gi".to_string();
        sink_ref(&mut new).namespace = Some("elsewhere".to_string());
        assert!(policy.diff(&full_spec(), &new).is_empty());

        new.topics = "other".to_string();
        assert_eq!(paths(&policy.diff(&full_spec(), &new)), vec!["topics"]);
    }

    #[test]
    fn test_validate_create_always_allowed() {
        let mut new = full_spec();
        new.sink = None;
        let request = UpdateRequest::create(&new);

        assert!(ImmutabilityPolicy::default().validate(&request).is_ok());
    }

    #[test]
    fn test_validate_update_rejected() {
        let old = full_spec();
        let mut new = full_spec();
        sink_ref(&mut new).api_version = Some("some-other-api-version".to_string());
        let request = UpdateRequest::update(&old, &new);

        let err = ImmutabilityPolicy::default().validate(&request).unwrap_err();
        let Error::ImmutableFields(violations) = err else {
            panic!("expected immutable field error");
        };
        assert_eq!(violations.paths(), vec!["sink.ref.apiVersion"]);
    }

    #[test]
    fn test_evaluate_no_change_is_valid() {
        let old = full_spec();
        let new = full_spec();
        let request = UpdateRequest::update(&old, &new);

        assert!(ImmutabilityPolicy::default().evaluate(&request).is_valid());
    }
}
