//! kafka-source-webhook - offline admission review for KafkaSource resources.
//!
//! Reads one AdmissionReview JSON document from stdin and writes the
//! response AdmissionReview to stdout. Logs go to stderr as JSON.
//!
//! ```bash
//! kafka-source-webhook < review.json
//! ```

use std::io::{Read, Write};

use tracing::{error, info};

use kafka_source_webhook::ImmutabilityPolicy;
use kafka_source_webhook::webhooks::review_json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kafka_source_webhook=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let mut input = Vec::new();
    std::io::stdin().read_to_end(&mut input)?;
    info!(bytes = input.len(), "Read admission review");

    let policy = ImmutabilityPolicy::default();
    let output = match review_json(&policy, &input) {
        Ok(output) => output,
        Err(e) => {
            error!(error = %e, "Failed to process admission review");
            return Err(e.into());
        }
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&output)?;
    stdout.write_all(b"\n")?;
    stdout.flush()?;

    Ok(())
}
