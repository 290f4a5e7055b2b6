//! # Resource Store
//!
//! This module defines the `ResourceStore`, an in-process stand-in for a declarative
//! object store. It implements the "Server" side of the Actor Model: one task owns the
//! persisted objects and processes requests sequentially, so every write is atomic and
//! version tokens are assigned in a single total order.

use crate::client::ResourceClient;
use crate::error::FrameworkError;
use crate::message::{StoreRequest, WatchEvent};
use crate::object::{Hub, ObjectKey};
use crate::scheme::Scheme;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// The actor that persists objects of one kind.
///
/// # Storage Version
///
/// Objects are persisted as tagged documents in a single *storage version*, which
/// defaults to the hub version. Reads decode the stored document back into the hub, so
/// a store configured to persist a lossy spoke behaves exactly like a cluster whose
/// storage version is that spoke: whatever the spoke cannot express is gone.
///
/// # Version Tokens
///
/// Every accepted write assigns the next value of a store-wide revision counter to the
/// object's `resource_version`. `Replace` and `UpdateStatus` only succeed when the
/// caller presents the token it last read. A write that changes nothing is accepted
/// without consuming a revision or publishing an event; this is what lets a converged
/// object go quiet.
///
/// # Ownership
///
/// - `Create` ignores the submitted status.
/// - `Replace` keeps the persisted status.
/// - `UpdateStatus` keeps the persisted spec.
pub struct ResourceStore<H: Hub> {
    receiver: mpsc::Receiver<StoreRequest<H>>,
    events: broadcast::Sender<WatchEvent>,
    scheme: Arc<Scheme<H>>,
    storage_version: String,
    objects: BTreeMap<ObjectKey, Value>,
    revision: u64,
}

impl<H: Hub> ResourceStore<H> {
    /// Creates a new `ResourceStore` and its associated `ResourceClient`.
    ///
    /// # Arguments
    ///
    /// * `buffer_size` - Capacity of the request channel and of the watch broadcast.
    /// * `scheme` - The versions of the kind. Objects are stored in the hub version
    ///   until [`ResourceStore::storing_as`] says otherwise.
    pub fn new(buffer_size: usize, scheme: Scheme<H>) -> (Self, ResourceClient<H>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let (events, _) = broadcast::channel(buffer_size.max(1));
        let scheme = Arc::new(scheme);
        let store = Self {
            receiver,
            events: events.clone(),
            scheme: Arc::clone(&scheme),
            storage_version: H::API_VERSION.to_string(),
            objects: BTreeMap::new(),
            revision: 0,
        };
        let client = ResourceClient::new(sender, events, scheme);
        (store, client)
    }

    /// Persists objects in `api_version` instead of the hub version.
    pub fn storing_as(mut self, api_version: &str) -> Result<Self, FrameworkError> {
        if !self.scheme.recognizes(api_version) {
            return Err(FrameworkError::UnknownVersion(api_version.to_string()));
        }
        self.storage_version = api_version.to_string();
        Ok(self)
    }

    /// Runs the store's event loop until every client has been dropped.
    pub async fn run(mut self) {
        let kind = H::KIND;
        info!(kind, storage_version = %self.storage_version, "Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Get { key, respond_to } => {
                    let result = self.load(&key);
                    debug!(kind, %key, found = matches!(result, Ok(Some(_))), "Get");
                    let _ = respond_to.send(result);
                }
                StoreRequest::List { respond_to } => {
                    debug!(kind, size = self.objects.len(), "List");
                    let _ = respond_to.send(self.load_all());
                }
                StoreRequest::Create { object, respond_to } => {
                    debug!(kind, ?object, "Create");
                    let result = self.create(object);
                    self.report("Created", &result);
                    let _ = respond_to.send(result);
                }
                StoreRequest::Replace { object, respond_to } => {
                    debug!(kind, ?object, "Replace");
                    let result = self.replace(object);
                    self.report("Replaced", &result);
                    let _ = respond_to.send(result);
                }
                StoreRequest::UpdateStatus { object, respond_to } => {
                    debug!(kind, key = %object.key(), status = ?object.status(), "UpdateStatus");
                    let result = self.update_status(object);
                    self.report("Status updated", &result);
                    let _ = respond_to.send(result);
                }
                StoreRequest::Delete { key, respond_to } => {
                    debug!(kind, %key, "Delete");
                    let result = self.delete(&key);
                    match &result {
                        Ok(()) => info!(kind, %key, size = self.objects.len(), "Deleted"),
                        Err(e) => warn!(kind, %key, error = %e, "Delete failed"),
                    }
                    let _ = respond_to.send(result);
                }
            }
        }

        info!(kind, size = self.objects.len(), "Shutdown");
    }

    fn report(&self, action: &'static str, result: &Result<H, FrameworkError>) {
        let kind = H::KIND;
        match result {
            Ok(object) => info!(
                kind,
                key = %object.key(),
                resource_version = object.resource_version(),
                "{action}"
            ),
            Err(e) => warn!(kind, error = %e, "{action} rejected"),
        }
    }

    fn load(&self, key: &ObjectKey) -> Result<Option<H>, FrameworkError> {
        self.objects
            .get(key)
            .map(|document| self.scheme.decode(document.clone()))
            .transpose()
    }

    fn load_all(&self) -> Result<Vec<H>, FrameworkError> {
        self.objects
            .values()
            .map(|document| self.scheme.decode(document.clone()))
            .collect()
    }

    fn load_existing(&self, key: &ObjectKey) -> Result<H, FrameworkError> {
        self.load(key)?
            .ok_or_else(|| FrameworkError::NotFound(key.clone()))
    }

    /// Stamps the next revision, encodes in the storage version and returns the object
    /// as it now reads back.
    fn persist(&mut self, mut object: H) -> Result<H, FrameworkError> {
        let revision = self
            .revision
            .checked_add(1)
            .ok_or_else(|| FrameworkError::Invalid("revision counter exhausted".to_string()))?;
        object.meta_mut().resource_version = revision;
        let document = self.scheme.encode(&object, &self.storage_version)?;
        let stored = self.scheme.decode(document.clone())?;
        self.objects.insert(object.key(), document);
        self.revision = revision;
        Ok(stored)
    }

    /// The object as it reads back after a round trip through the storage version.
    fn as_stored(&self, object: &H) -> Result<H, FrameworkError> {
        let document = self.scheme.encode(object, &self.storage_version)?;
        self.scheme.decode(document)
    }

    fn check_version(current: &H, presented: &H) -> Result<(), FrameworkError> {
        if current.resource_version() == presented.resource_version() {
            Ok(())
        } else {
            Err(FrameworkError::Conflict {
                key: current.key(),
                expected: presented.resource_version(),
                actual: current.resource_version(),
            })
        }
    }

    fn publish(&self, event: WatchEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    fn create(&mut self, mut object: H) -> Result<H, FrameworkError> {
        if object.meta().name.is_empty() {
            return Err(FrameworkError::Invalid("metadata.name is required".to_string()));
        }
        object.validate().map_err(FrameworkError::Invalid)?;

        let key = object.key();
        if self.objects.contains_key(&key) {
            return Err(FrameworkError::AlreadyExists(key));
        }

        object.set_status(H::Status::default());
        let created = self.persist(object)?;
        self.publish(WatchEvent::Added(key));
        Ok(created)
    }

    fn replace(&mut self, mut object: H) -> Result<H, FrameworkError> {
        let current = self.load_existing(&object.key())?;
        Self::check_version(&current, &object)?;
        object.validate().map_err(FrameworkError::Invalid)?;

        object.set_status(current.status().clone());
        // Compare what would be stored, not what was submitted: a lossy storage
        // version may drop fields that `current` has already lost.
        if self.as_stored(&object)? == current {
            return Ok(current);
        }
        let key = object.key();
        let replaced = self.persist(object)?;
        self.publish(WatchEvent::Modified(key));
        Ok(replaced)
    }

    fn update_status(&mut self, object: H) -> Result<H, FrameworkError> {
        let current = self.load_existing(&object.key())?;
        Self::check_version(&current, &object)?;

        if current.status() == object.status() {
            return Ok(current);
        }
        let key = current.key();
        let mut updated = current;
        updated.set_status(object.status().clone());
        let updated = self.persist(updated)?;
        self.publish(WatchEvent::Modified(key));
        Ok(updated)
    }

    fn delete(&mut self, key: &ObjectKey) -> Result<(), FrameworkError> {
        self.objects
            .remove(key)
            .ok_or_else(|| FrameworkError::NotFound(key.clone()))?;
        self.publish(WatchEvent::Deleted(key.clone()));
        Ok(())
    }
}
