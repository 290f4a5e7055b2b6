//! # Framework Errors
//!
//! This module defines the common error types used by the store, the scheme and
//! the clients. By centralizing error definitions, every reconciler sees the same
//! failure vocabulary regardless of which resource kind it manages.

use crate::object::ObjectKey;

/// Errors that can occur within the reconcile framework itself.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    /// The store actor is gone; requests can no longer be delivered.
    #[error("Store closed")]
    ActorClosed,
    /// The store accepted a request but dropped the reply channel.
    #[error("Store dropped response channel")]
    ActorDropped,
    #[error("Object not found: {0}")]
    NotFound(ObjectKey),
    #[error("Object already exists: {0}")]
    AlreadyExists(ObjectKey),
    /// The write carried a stale version token.
    #[error("Conflict on {key}: expected resource version {expected}, found {actual}")]
    Conflict {
        key: ObjectKey,
        expected: u64,
        actual: u64,
    },
    #[error("Invalid object: {0}")]
    Invalid(String),
    #[error("Unknown API version: {0}")]
    UnknownVersion(String),
    #[error("Codec error: {0}")]
    Codec(String),
}

impl FrameworkError {
    /// True for failures that go away on their own: stale writes and an
    /// unreachable store.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. } | Self::ActorClosed | Self::ActorDropped
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<serde_json::Error> for FrameworkError {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}
