//! # Store Client
//!
//! This module defines the generic client for communicating with a
//! [`ResourceStore`](crate::ResourceStore).

use crate::error::FrameworkError;
use crate::message::{Response, StoreRequest, WatchEvent};
use crate::object::{Convertible, Hub, ObjectKey};
use crate::scheme::Scheme;
use crate::watch::WatchStream;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

/// A type-safe client for a `ResourceStore<H>`.
///
/// The store speaks hub objects only. The `*_as` methods let a caller work in any
/// version `V` that converts to the hub; conversion happens here, at the edge, so the
/// caller never sees which version the store persists in.
///
/// The client is cheap to clone: it holds a channel sender, a broadcast sender used to
/// open watches, and a shared [`Scheme`].
pub struct ResourceClient<H: Hub> {
    sender: mpsc::Sender<StoreRequest<H>>,
    events: broadcast::Sender<WatchEvent>,
    scheme: Arc<Scheme<H>>,
}

impl<H: Hub> Clone for ResourceClient<H> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            events: self.events.clone(),
            scheme: Arc::clone(&self.scheme),
        }
    }
}

impl<H: Hub> ResourceClient<H> {
    pub fn new(
        sender: mpsc::Sender<StoreRequest<H>>,
        events: broadcast::Sender<WatchEvent>,
        scheme: Arc<Scheme<H>>,
    ) -> Self {
        Self {
            sender,
            events,
            scheme,
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> StoreRequest<H>,
    ) -> Result<T, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub fn scheme(&self) -> &Scheme<H> {
        &self.scheme
    }

    pub async fn get(&self, key: &ObjectKey) -> Result<Option<H>, FrameworkError> {
        let key = key.clone();
        self.request(|respond_to| StoreRequest::Get { key, respond_to })
            .await
    }

    /// Fetches an object in version `V`.
    pub async fn get_as<V: Convertible<H>>(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<V>, FrameworkError> {
        Ok(self.get(key).await?.as_ref().map(V::convert_from))
    }

    pub async fn list(&self) -> Result<Vec<H>, FrameworkError> {
        self.request(|respond_to| StoreRequest::List { respond_to })
            .await
    }

    pub async fn create(&self, object: H) -> Result<H, FrameworkError> {
        self.request(|respond_to| StoreRequest::Create { object, respond_to })
            .await
    }

    pub async fn create_as<V: Convertible<H>>(&self, object: &V) -> Result<V, FrameworkError> {
        let created = self.create(object.convert_to()).await?;
        Ok(V::convert_from(&created))
    }

    /// Decodes a tagged document of any registered version and creates it.
    pub async fn submit(&self, document: Value) -> Result<H, FrameworkError> {
        let object = self.scheme.decode(document)?;
        self.create(object).await
    }

    /// Replaces the spec of an existing object. The object's `resource_version` must
    /// match the persisted one.
    pub async fn replace(&self, object: H) -> Result<H, FrameworkError> {
        self.request(|respond_to| StoreRequest::Replace { object, respond_to })
            .await
    }

    pub async fn replace_as<V: Convertible<H>>(&self, object: &V) -> Result<V, FrameworkError> {
        let replaced = self.replace(object.convert_to()).await?;
        Ok(V::convert_from(&replaced))
    }

    /// Writes the status of an existing object. The object's `resource_version` must
    /// match the persisted one; everything but the status is ignored.
    pub async fn update_status(&self, object: H) -> Result<H, FrameworkError> {
        self.request(|respond_to| StoreRequest::UpdateStatus { object, respond_to })
            .await
    }

    pub async fn update_status_as<V: Convertible<H>>(
        &self,
        object: &V,
    ) -> Result<V, FrameworkError> {
        let updated = self.update_status(object.convert_to()).await?;
        Ok(V::convert_from(&updated))
    }

    pub async fn delete(&self, key: &ObjectKey) -> Result<(), FrameworkError> {
        let key = key.clone();
        self.request(|respond_to| StoreRequest::Delete { key, respond_to })
            .await
    }

    /// Opens a new watch. Events published before this call are not replayed.
    pub fn watch(&self) -> WatchStream {
        WatchStream::new(self.events.subscribe())
    }
}
