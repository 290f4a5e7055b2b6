//! # Math Client
//!
//! Provides a high‑level API for working with `Math` objects.
//! It wraps a `ResourceClient<Math>` and exposes domain‑specific methods.
use crate::api::{v1alpha1, Math, MathSpec};
use reconcile_framework::{FrameworkError, ObjectKey, ResourceClient, WatchStream};
use serde_json::Value;
use tracing::{debug, instrument};

/// How often [`MathClient::update_spec`] re-reads and retries after a conflict.
const MAX_UPDATE_ATTEMPTS: usize = 5;

/// Client for submitting and inspecting `Math` objects.
#[derive(Clone)]
pub struct MathClient {
    inner: ResourceClient<Math>,
}

impl MathClient {
    pub fn new(inner: ResourceClient<Math>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &ResourceClient<Math> {
        &self.inner
    }

    #[instrument(skip(self, math), fields(name = %math.metadata.name))]
    pub async fn create(&self, math: Math) -> Result<Math, FrameworkError> {
        debug!("Sending request");
        self.inner.create(math).await
    }

    /// Creates an object written against the legacy version.
    #[instrument(skip(self, math), fields(name = %math.metadata.name))]
    pub async fn create_legacy(
        &self,
        math: &v1alpha1::Math,
    ) -> Result<v1alpha1::Math, FrameworkError> {
        debug!("Sending request");
        self.inner.create_as(math).await
    }

    /// Creates an object from a tagged manifest in any supported version.
    #[instrument(skip(self, manifest))]
    pub async fn submit(&self, manifest: Value) -> Result<Math, FrameworkError> {
        debug!("Sending request");
        self.inner.submit(manifest).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, key: &ObjectKey) -> Result<Option<Math>, FrameworkError> {
        self.inner.get(key).await
    }

    #[instrument(skip(self))]
    pub async fn get_legacy(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<v1alpha1::Math>, FrameworkError> {
        self.inner.get_as(key).await
    }

    pub async fn list(&self) -> Result<Vec<Math>, FrameworkError> {
        self.inner.list().await
    }

    /// Applies `edit` to the latest spec and replaces it, re-reading on conflict.
    #[instrument(skip(self, edit))]
    pub async fn update_spec(
        &self,
        key: &ObjectKey,
        edit: impl Fn(&mut MathSpec) + Send + Sync,
    ) -> Result<Math, FrameworkError> {
        let mut attempt = 1;
        loop {
            let mut math = self
                .inner
                .get(key)
                .await?
                .ok_or_else(|| FrameworkError::NotFound(key.clone()))?;
            edit(&mut math.spec);

            match self.inner.replace(math).await {
                Err(e) if e.is_conflict() && attempt < MAX_UPDATE_ATTEMPTS => {
                    debug!(attempt, "Spec update conflicted, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, key: &ObjectKey) -> Result<(), FrameworkError> {
        self.inner.delete(key).await
    }

    pub fn watch(&self) -> WatchStream {
        self.inner.watch()
    }
}
