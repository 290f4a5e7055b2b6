//! # Math API
//!
//! The `Math` kind of the `math.example.com` group, in two schema versions:
//!
//! - [`v1beta1`] - the hub. Variables are a list of typed `{name, value, type}` entries.
//! - [`v1alpha1`] - the legacy spoke. Variables are a plain name → value mapping,
//!   implicitly numeric.
//!
//! Clients may read and write either version; the [`scheme`] routes every conversion
//! through the hub.

pub mod v1alpha1;
pub mod v1beta1;

pub use v1beta1::{Math, MathSpec, MathStatus, Variable};

use reconcile_framework::Scheme;

pub const GROUP: &str = "math.example.com";

pub const KIND: &str = "Math";

/// Every version of `Math`, with `v1beta1` as the hub.
pub fn scheme() -> Scheme<Math> {
    Scheme::new().register::<v1alpha1::Math>()
}
