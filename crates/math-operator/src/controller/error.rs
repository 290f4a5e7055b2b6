//! Error types for the Math reconciler.

use crate::evaluator::EvaluationError;
use reconcile_framework::FrameworkError;
use thiserror::Error;

/// Why a reconcile attempt failed. Either way the controller requeues the key.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The spec could not be evaluated. The same text was written to `status.message`.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// The store rejected or could not serve a request. Nothing was written.
    #[error("store error: {0}")]
    Store(#[from] FrameworkError),
}

impl ReconcileError {
    /// True when retrying with fresh state can succeed without a spec change.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Evaluation(_) => false,
            Self::Store(e) => e.is_transient(),
        }
    }
}
