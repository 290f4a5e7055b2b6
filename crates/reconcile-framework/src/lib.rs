//! # Reconcile Framework
//!
//! This crate provides the building blocks for declarative, level-triggered control
//! loops in Rust. Users submit **objects** (a spec they own plus a status the system
//! owns) to a versioned **store**; a **controller** watches the store and drives each
//! object's status toward what its spec asks for.
//!
//! ## Why Declarative + Actor Model?
//!
//! ### Declarative Resources
//!
//! - A submitter states *what* it wants and never calls the logic that computes it
//! - Every change is a new version of an object, guarded by an optimistic-concurrency token
//! - Several schema versions of a kind coexist; each converts through one canonical hub
//!
//! ### Actor Model
//!
//! - The store is one task that owns all objects (no shared memory, no locks)
//! - Requests are processed sequentially, so each write is atomic
//! - The controller is one task that owns its work queue and spawns reconcile attempts
//!
//! ### The Synergy
//!
//! - **Convergence**: The reconciler reads the latest object and writes a status. It never
//!   needs to know what changed, only what is true now.
//! - **Safety**: A stale write is rejected by the store, not silently applied, and the
//!   controller simply retries with fresh state.
//! - **Quiescence**: Writing a status equal to the stored one is a no-op, so a converged
//!   object produces no further events and the loop goes quiet.
//!
//! **Further Reading**:
//! - [Actors in Rust](https://ryhl.io/blog/actors-with-tokio/) - Practical guide to implementing actors with Tokio
//! - [Kubernetes API Conventions](https://github.com/kubernetes/community/blob/master/contributors/devel/sig-architecture/api-conventions.md) - spec/status, resourceVersion and versioning
//!
//! ## Architecture Overview
//!
//! 1. **Object Layer** ([`Hub`], [`Convertible`], [`Scheme`]) - Your kind, its versions and their conversions
//! 2. **Storage Layer** ([`ResourceStore`]) - Versioned persistence, concurrency tokens and change events
//! 3. **Interface Layer** ([`ResourceClient`], [`WatchStream`]) - Type-safe access from any task
//! 4. **Control Layer** ([`Controller`], [`Reconciler`]) - Scheduling, retries and shutdown
//!
//! You write the kind and the reconciler; the framework handles the message passing,
//! version conversion, queueing and backoff.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reconcile_framework::{Controller, ControllerConfig, ResourceStore, Scheme};
//!
//! let scheme = Scheme::<Math>::new().register::<v1alpha1::Math>();
//! let (store, client) = ResourceStore::new(32, scheme);
//! tokio::spawn(store.run());
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let controller = Controller::new(client.clone(), MathReconciler::new(client.clone()), ControllerConfig::default());
//! let handle = tokio::spawn(controller.run(shutdown_rx));
//!
//! client.create(math).await?;
//! // ... later
//! let _ = shutdown_tx.send(true);
//! handle.await??;
//! ```
//!
//! ## Concurrency Model
//!
//! - The store and the controller each run in their own Tokio task
//! - A key is never reconciled by two attempts at once
//! - Different keys reconcile in parallel, up to `max_concurrent_reconciles`
//! - A change that lands during an attempt schedules exactly one more attempt afterwards
//!
//! ## Testing
//!
//! The [`mock`] module provides a `MockClient` that answers a real [`ResourceClient`] from
//! scripted expectations, so a reconciler's branches can be tested without a store.

pub mod client;
pub mod controller;
pub mod error;
pub mod message;
pub mod mock;
pub mod object;
pub mod queue;
pub mod scheme;
pub mod store;
pub mod tracing;
pub mod watch;

// Re-export core types for convenience
pub use client::ResourceClient;
pub use controller::{Action, Controller, ControllerConfig, Reconciler};
pub use error::FrameworkError;
pub use message::{Response, StoreRequest, WatchEvent};
pub use object::{Convertible, Hub, ObjectKey, ObjectMeta, Versioned, DEFAULT_NAMESPACE};
pub use queue::{BackoffPolicy, WorkQueue};
pub use scheme::Scheme;
pub use store::ResourceStore;
pub use watch::WatchStream;
