//! # Object Model & Conversion Contract
//!
//! Every resource kind managed by the framework has exactly one **hub** type: the
//! canonical representation that the store, the controller and the reconciler work
//! with. Every other schema version of the same kind is a **spoke** that converts
//! only to and from the hub.
//!
//! # Hub and Spoke
//!
//! With two versions the difference between pairwise and hub conversion is small.
//! With three it is not: pairwise needs six conversion functions, the hub needs four,
//! and adding a fourth version to the hub design touches nothing that already exists.
//!
//! - [`Hub`] - implemented once per kind, by the canonical type.
//! - [`Convertible`] - implemented by every spoke. The hub gets an identity
//!   implementation for free.
//! - [`Versioned`] - the wire tag (`apiVersion`) of a concrete schema version.
//!
//! Conversions are pure and total: they never fail and never touch metadata except to
//! copy it.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};

/// Namespace used when an object does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Identifies one object within a kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key in the default namespace.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(DEFAULT_NAMESPACE, name)
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

/// Metadata shared by every version of every kind.
///
/// `resource_version` is the optimistic-concurrency token. It is assigned by the
/// store on every accepted write; `0` means the object has never been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub resource_version: u64,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: default_namespace(),
            resource_version: 0,
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

/// The wire tag of a concrete schema version, e.g. `math.example.com/v1beta1`.
pub trait Versioned {
    const API_VERSION: &'static str;
    const KIND: &'static str;
}

/// The canonical representation of a resource kind.
///
/// The store persists and returns hub objects; spokes are converted at the edge. The
/// spec/status split mirrors ownership: the submitter owns the spec, the controller
/// owns the status, and the store only lets each side write its own half.
pub trait Hub: Versioned + Clone + Debug + PartialEq + Send + Sync + 'static {
    /// The controller-owned half of the object.
    type Status: Clone + Debug + Default + PartialEq + Send + Sync;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn status(&self) -> &Self::Status;

    fn set_status(&mut self, status: Self::Status);

    /// Admission check run by the store before a create or replace is accepted.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn key(&self) -> ObjectKey {
        self.meta().key()
    }

    fn resource_version(&self) -> u64 {
        self.meta().resource_version
    }
}

/// A schema version that converts to and from the hub `H`.
///
/// `convert_to` must be total. `convert_from` may be lossy when the spoke cannot
/// express something the hub can, but it must still be total: a lossy downgrade is a
/// policy, not a failure.
pub trait Convertible<H: Hub>: Sized {
    fn convert_to(&self) -> H;

    fn convert_from(hub: &H) -> Self;
}

impl<H: Hub> Convertible<H> for H {
    fn convert_to(&self) -> H {
        self.clone()
    }

    fn convert_from(hub: &H) -> Self {
        hub.clone()
    }
}
