//! Test fixtures and builder patterns for KafkaSource.

use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kafka_source_webhook::crd::{Destination, KafkaSource, KafkaSourceSpec};

/// Builder for creating KafkaSource test fixtures.
///
/// Defaults match the spec used throughout the immutability tests:
/// servers/topics/group, a sink ref of foo/bar/baz/qux, and
/// `service-account-name`.
///
/// # Example
/// ```
/// let resource = KafkaSourceBuilder::new("orders")
///     .namespace("events")
///     .topics("orders")
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct KafkaSourceBuilder {
    name: String,
    namespace: Option<String>,
    uid: Option<String>,
    spec: KafkaSourceSpec,
}

impl KafkaSourceBuilder {
    /// Create a new builder with the given resource name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            uid: None,
            spec: full_spec(),
        }
    }

    /// Set the namespace for the resource.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the UID.
    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn bootstrap_servers(mut self, servers: impl Into<String>) -> Self {
        self.spec.bootstrap_servers = servers.into();
        self
    }

    pub fn topics(mut self, topics: impl Into<String>) -> Self {
        self.spec.topics = topics.into();
        self
    }

    pub fn consumer_group(mut self, group: impl Into<String>) -> Self {
        self.spec.consumer_group = group.into();
        self
    }

    pub fn service_account_name(mut self, name: impl Into<String>) -> Self {
        self.spec.service_account_name = name.into();
        self
    }

    /// Replace the sink with an object reference.
    pub fn sink_ref(mut self, api_version: &str, kind: &str, namespace: &str, name: &str) -> Self {
        self.spec.sink = Some(Destination {
            r#ref: Some(object_reference(api_version, kind, namespace, name)),
            uri: None,
        });
        self
    }

    /// Remove the sink entirely.
    pub fn no_sink(mut self) -> Self {
        self.spec.sink = None;
        self
    }

    /// Build only the spec.
    pub fn build_spec(self) -> KafkaSourceSpec {
        self.spec
    }

    /// Build the KafkaSource.
    pub fn build(self) -> KafkaSource {
        let mut resource = KafkaSource::new(&self.name, self.spec);
        resource.metadata = ObjectMeta {
            name: Some(self.name),
            namespace: self.namespace,
            uid: self.uid,
            ..Default::default()
        };
        resource
    }
}

impl Default for KafkaSourceBuilder {
    fn default() -> Self {
        Self::new("test-source")
    }
}

pub fn object_reference(api_version: &str, kind: &str, namespace: &str, name: &str) -> ObjectReference {
    ObjectReference {
        api_version: Some(api_version.to_string()),
        kind: Some(kind.to_string()),
        namespace: Some(namespace.to_string()),
        name: Some(name.to_string()),
        ..Default::default()
    }
}

/// The reference spec every field is set on.
pub fn full_spec() -> KafkaSourceSpec {
    KafkaSourceSpec {
        bootstrap_servers: "servers".to_string(),
        topics: "topics".to_string(),
        consumer_group: "group".to_string(),
        sink: Some(Destination {
            r#ref: Some(object_reference("foo", "bar", "baz", "qux")),
            uri: None,
        }),
        service_account_name: "service-account-name".to_string(),
        ..Default::default()
    }
}
