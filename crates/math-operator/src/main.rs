//! # Math Operator
//!
//! Runs the store and the controller in one process.
//!
//! 1. Load [`OperatorConfig`] from `MATH_OPERATOR_*` variables.
//! 2. Start the [`MathOperator`].
//! 3. Submit every manifest in `MATH_OPERATOR_MANIFESTS`, if set.
//! 4. Log each status transition until Ctrl-C, then shut down gracefully.
//!
//! ```bash
//! MATH_OPERATOR_MANIFESTS=maths.json RUST_LOG=info cargo run -p math-operator
//! ```

use anyhow::{Context, Result};
use math_operator::api::MathStatus;
use math_operator::clients::MathClient;
use math_operator::config::OperatorConfig;
use math_operator::lifecycle::MathOperator;
use reconcile_framework::tracing::setup_tracing;
use reconcile_framework::{ObjectKey, WatchEvent};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<()> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = OperatorConfig::from_env().context("loading configuration")?;
    info!(?config, "Starting math operator");

    let operator = MathOperator::start(&config)?;
    let reporter = tokio::spawn(report_status(operator.client.clone()));

    if let Some(path) = &config.manifests {
        let span = tracing::info_span!("manifests", path = %path.display());
        submit_manifests(&operator.client, path).instrument(span).await?;
    }

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("Ctrl-C received");

    // The reporter holds a client; the store only stops once it is gone.
    reporter.abort();
    let _ = reporter.await;
    operator.shutdown().await?;

    info!("Math operator exited");
    Ok(())
}

/// Submits a JSON array of manifests. A rejected manifest is logged and skipped.
async fn submit_manifests(client: &MathClient, path: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let manifests: Vec<Value> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    info!(count = manifests.len(), "Submitting manifests");
    for manifest in manifests {
        match client.submit(manifest).await {
            Ok(math) => info!(key = %math.metadata.key(), "Submitted"),
            Err(e) => error!(error = %e, "Manifest rejected"),
        }
    }
    Ok(())
}

/// Logs every status transition the controller makes.
async fn report_status(client: MathClient) {
    let mut events = client.watch();
    let mut last: HashMap<ObjectKey, MathStatus> = HashMap::new();

    while let Some(event) = events.next().await {
        let key = match event {
            WatchEvent::Added(key) | WatchEvent::Modified(key) => key,
            WatchEvent::Deleted(key) => {
                last.remove(&key);
                info!(%key, "Deleted");
                continue;
            }
            WatchEvent::Resync => continue,
        };

        match client.get(&key).await {
            Ok(Some(math)) => {
                if last.get(&key) != Some(&math.status) {
                    info!(
                        %key,
                        expression = %math.spec.expression,
                        result = %math.status.result,
                        message = %math.status.message,
                        "Status"
                    );
                    last.insert(key, math.status);
                }
            }
            Ok(None) => {}
            Err(e) => warn!(%key, error = %e, "Could not read object"),
        }
    }
}
