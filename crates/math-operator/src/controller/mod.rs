//! # Math Reconciler
//!
//! Drives a `Math` object's status toward its spec. One attempt is one pass of
//!
//! ```text
//! Fetching ──▶ Evaluating ──▶ WritingStatus ──▶ Done
//!    │              │                │
//!    └─ not found ──┼────────────────┼──▶ Done (no write)
//!                   └─ error ────────┴──▶ Failed (status written, key requeued)
//! ```
//!
//! Every attempt that gets past Fetching writes the status exactly once, whether the
//! evaluation succeeded or not. The store ignores a write that changes nothing, so a
//! converged object stops producing events.
//!
//! A stale write fails with `Conflict`. The attempt is then returned as failed and
//! the controller retries it from Fetching, never just the write.
//!
//! An object deleted between the read and the write ends the attempt as Done too:
//! the store answers `NotFound` and there is nothing left to reconcile.

pub mod error;

pub use error::ReconcileError;

use crate::api::{Math, MathSpec, MathStatus};
use crate::evaluator::{evaluate, parse_bindings, EvaluationError, Value};
use async_trait::async_trait;
use reconcile_framework::{Action, FrameworkError, ObjectKey, Reconciler, ResourceClient};
use tracing::{debug, info, warn};

/// `status.message` after a successful evaluation.
pub const OK_MESSAGE: &str = "OK";

/// Evaluates a spec: parses its variables, then its expression.
pub fn evaluate_spec(spec: &MathSpec) -> Result<Value, EvaluationError> {
    let bindings = parse_bindings(&spec.variables)?;
    evaluate(&spec.expression, &bindings)
}

/// The status an evaluation outcome leads to. A failure keeps the last good result.
pub fn next_status(current: &MathStatus, outcome: &Result<Value, EvaluationError>) -> MathStatus {
    match outcome {
        Ok(value) => MathStatus {
            result: value.to_string(),
            message: OK_MESSAGE.to_string(),
        },
        Err(e) => MathStatus {
            result: current.result.clone(),
            message: e.to_string(),
        },
    }
}

#[derive(Clone)]
pub struct MathReconciler {
    client: ResourceClient<Math>,
}

impl MathReconciler {
    pub fn new(client: ResourceClient<Math>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Reconciler for MathReconciler {
    type Error = ReconcileError;

    async fn reconcile(&self, key: &ObjectKey) -> Result<Action, ReconcileError> {
        // Fetching
        let Some(mut math) = self.client.get(key).await? else {
            debug!("Not found, nothing to reconcile");
            return Ok(Action::await_change());
        };

        // Evaluating
        let outcome = evaluate_spec(&math.spec);
        let status = next_status(&math.status, &outcome);
        let changed = status != math.status;

        // WritingStatus
        math.status = status;
        let written = match self.client.update_status(math).await {
            Ok(written) => written,
            Err(FrameworkError::NotFound(_)) => {
                debug!("Deleted before the status write, nothing to reconcile");
                return Ok(Action::await_change());
            }
            Err(e) => return Err(e.into()),
        };
        if changed {
            info!(
                result = %written.status.result,
                message = %written.status.message,
                resource_version = written.metadata.resource_version,
                "Status updated"
            );
        }

        match outcome {
            Ok(_) => Ok(Action::await_change()),
            Err(e) => {
                warn!(error = %e, "Evaluation failed");
                Err(e.into())
            }
        }
    }
}
