//! Custom Resource Definitions (CRDs) for kafka-source-webhook.
//!
//! - `KafkaSource`: Kafka topic consumer delivering events to a sink

mod kafka_source;

pub use kafka_source::*;
