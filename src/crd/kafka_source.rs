//! KafkaSource Custom Resource Definition.
//!
//! A KafkaSource consumes records from one or more Kafka topics and
//! delivers them to a sink. The spec is treated as immutable once the
//! resource exists; see `webhooks::policies::immutability`.

use k8s_openapi::api::core::v1::ObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// KafkaSource is a custom resource describing a Kafka event source.
///
/// Example:
/// ```yaml
/// apiVersion: sources.eventing.knative.dev/v1alpha1
/// kind: KafkaSource
/// metadata:
///   name: orders
/// spec:
///   bootstrapServers: my-cluster-kafka-bootstrap.kafka:9092
///   topics: orders
///   consumerGroup: orders-consumer
///   sink:
///     ref:
///       apiVersion: serving.knative.dev/v1
///       kind: Service
///       name: event-display
///   serviceAccountName: orders-source
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "sources.eventing.knative.dev",
    version = "v1alpha1",
    kind = "KafkaSource",
    plural = "kafkasources",
    status = "KafkaSourceStatus",
    namespaced,
    printcolumn = r#"{"name":"Topics", "type":"string", "jsonPath":".spec.topics"}"#,
    printcolumn = r#"{"name":"BootstrapServers", "type":"string", "jsonPath":".spec.bootstrapServers"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct KafkaSourceSpec {
    /// Comma-separated list of Kafka bootstrap servers.
    pub bootstrap_servers: String,

    /// Comma-separated list of topics to consume from.
    pub topics: String,

    /// Consumer group ID.
    #[serde(default)]
    pub consumer_group: String,

    /// Network settings (SASL and TLS) for reaching the brokers.
    #[serde(default)]
    pub net: KafkaSourceNetSpec,

    /// Where consumed events are delivered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink: Option<Destination>,

    /// Service account the receive adapter runs as.
    #[serde(default)]
    pub service_account_name: String,

    /// Resource requests and limits for the receive adapter.
    #[serde(default)]
    pub resources: KafkaResourceSpec,
}

/// Network configuration for the Kafka client.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaSourceNetSpec {
    /// SASL authentication.
    #[serde(default)]
    pub sasl: KafkaSourceSaslSpec,

    /// TLS transport.
    #[serde(default)]
    pub tls: KafkaSourceTlsSpec,
}

/// SASL authentication settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaSourceSaslSpec {
    #[serde(default)]
    pub enable: bool,

    /// SASL user name.
    #[serde(default)]
    pub user: SecretValueFromSource,

    /// SASL password.
    #[serde(default)]
    pub password: SecretValueFromSource,
}

/// TLS settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaSourceTlsSpec {
    #[serde(default)]
    pub enable: bool,

    /// Client certificate.
    #[serde(default)]
    pub cert: SecretValueFromSource,

    /// Client private key.
    #[serde(default)]
    pub key: SecretValueFromSource,

    /// CA certificate used to verify the brokers.
    #[serde(default)]
    pub ca_cert: SecretValueFromSource,
}

/// A value read from a Secret.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretValueFromSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeySelector>,
}

/// Selects a key of a Secret in the resource's namespace.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Name of the Secret.
    pub name: String,

    /// Key within the Secret.
    pub key: String,

    /// Whether the Secret or its key must be defined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

/// Event delivery target: an object reference, a URI, or both.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    /// Reference to an addressable Kubernetes object.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub r#ref: Option<ObjectReference>,

    /// Absolute URI, or a path relative to `ref` when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Receive adapter compute resources.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaResourceSpec {
    #[serde(default)]
    pub requests: KafkaResourceQuantities,

    #[serde(default)]
    pub limits: KafkaResourceQuantities,
}

/// CPU and memory quantities, as Kubernetes quantity strings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaResourceQuantities {
    #[serde(default)]
    pub cpu: String,

    #[serde(default)]
    pub memory: String,
}

/// Observed state of a KafkaSource.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KafkaSourceStatus {
    /// Resolved URI of the sink.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink_uri: Option<String>,

    /// Status conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// The generation most recently observed by the controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Status condition for a KafkaSource.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition.
    pub r#type: String,
    /// Status of the condition ("True", "False", "Unknown").
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}
