//! # Operator Lifecycle
//!
//! Starts, wires and stops the two actors that make up the operator.
//!
//! ## Wiring
//!
//! ```text
//!               ┌──────────── watch events ────────────┐
//!               ▼                                      │
//!   Controller<Math, MathReconciler> ── get/status ──▶ ResourceStore<Math>
//!                                                      ▲
//!   MathClient (manifests, users) ── create/replace ───┘
//! ```
//!
//! 1. **Store** - created with the `Math` scheme and the configured storage version,
//!    then spawned. It hands back the only way in: a `ResourceClient<Math>`.
//! 2. **Controller** - gets one clone of the client for its watch and the reconciler
//!    gets another for reads and status writes. Spawned with the receiving end of a
//!    shutdown channel.
//! 3. **Users** - everything else talks to the store through [`MathClient`].
//!
//! ## Graceful Shutdown
//!
//! 1. **Signal the controller** - it stops dispatching, aborts in-flight reconciles
//!    and waits for them to report back. A reconcile aborted between its read and its
//!    write has persisted nothing.
//! 2. **Await the controller** - which drops the controller's and reconciler's clients.
//! 3. **Drop the operator's client** - the store's channel closes once every client
//!    is gone, so callers must drop their own clones before calling
//!    [`MathOperator::shutdown`].
//! 4. **Await the store**.

use crate::api;
use crate::clients::MathClient;
use crate::config::OperatorConfig;
use crate::controller::MathReconciler;
use anyhow::{Context, Result};
use reconcile_framework::{Controller, FrameworkError, ResourceStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// The running operator: a store actor and a controller reconciling its `Math` objects.
///
/// # Example
///
/// ```ignore
/// let operator = MathOperator::start(&OperatorConfig::default())?;
/// operator.client.create(Math::new("sum", "1 + 1")).await?;
/// operator.shutdown().await?;
/// ```
pub struct MathOperator {
    /// Client for submitting and reading `Math` objects.
    pub client: MathClient,

    shutdown: watch::Sender<bool>,
    controller: JoinHandle<Result<(), FrameworkError>>,
    store: JoinHandle<()>,
}

impl MathOperator {
    /// Spawns the store and the controller. Must be called inside a Tokio runtime.
    pub fn start(config: &OperatorConfig) -> Result<Self> {
        let (store, client) = ResourceStore::new(config.channel_capacity, api::scheme());
        let store = store
            .storing_as(&config.storage_version)
            .with_context(|| format!("unsupported storage version {}", config.storage_version))?;
        let store = tokio::spawn(store.run());

        let (shutdown, shutdown_rx) = watch::channel(false);
        let reconciler = MathReconciler::new(client.clone());
        let controller = Controller::new(client.clone(), reconciler, config.controller());
        let controller = tokio::spawn(controller.run(shutdown_rx));

        info!(
            storage_version = %config.storage_version,
            max_concurrent = config.max_concurrent,
            "Math operator started"
        );

        Ok(Self {
            client: MathClient::new(client),
            shutdown,
            controller,
            store,
        })
    }

    /// Stops the controller, then the store, and waits for both.
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down math operator...");

        // Nobody listening means the controller is already gone; joining it below
        // reports why.
        let _ = self.shutdown.send(true);
        self.controller
            .await
            .context("controller task panicked")?
            .context("controller failed")?;

        drop(self.client);
        self.store.await.context("store task panicked")?;

        info!("Math operator stopped");
        Ok(())
    }
}
