//! # Store Messages
//!
//! This module defines the request and event types exchanged between the
//! [`ResourceClient`](crate::ResourceClient) and the [`ResourceStore`](crate::ResourceStore).

use crate::error::FrameworkError;
use crate::object::{Hub, ObjectKey};
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the store.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Request sent to the store actor.
///
/// Every variant is applied atomically: the store processes one request at a time, so
/// a write either lands completely or not at all.
///
/// - **Get / List**: reads, returning hub objects.
/// - **Create**: first write of an object. Fails if the key exists.
/// - **Replace**: submitter-side write. Replaces the spec, keeps the persisted status.
/// - **UpdateStatus**: controller-side write. Replaces the status, keeps the spec.
/// - **Delete**: removes the object.
///
/// `Replace` and `UpdateStatus` are compare-and-swap operations on the object's
/// `resource_version`.
#[derive(Debug)]
pub enum StoreRequest<H: Hub> {
    Get {
        key: ObjectKey,
        respond_to: Response<Option<H>>,
    },
    List {
        respond_to: Response<Vec<H>>,
    },
    Create {
        object: H,
        respond_to: Response<H>,
    },
    Replace {
        object: H,
        respond_to: Response<H>,
    },
    UpdateStatus {
        object: H,
        respond_to: Response<H>,
    },
    Delete {
        key: ObjectKey,
        respond_to: Response<()>,
    },
}

/// Change notification published by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(ObjectKey),
    Modified(ObjectKey),
    Deleted(ObjectKey),
    /// The subscriber fell behind and missed events; it should re-list.
    Resync,
}

impl WatchEvent {
    pub fn key(&self) -> Option<&ObjectKey> {
        match self {
            Self::Added(key) | Self::Modified(key) | Self::Deleted(key) => Some(key),
            Self::Resync => None,
        }
    }
}
