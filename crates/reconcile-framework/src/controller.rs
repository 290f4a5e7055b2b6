//! # Controller Runtime
//!
//! The driving scheduler for a [`Reconciler`]. A [`Controller`] turns the store's
//! change stream into reconcile attempts:
//!
//! 1. Subscribe to the watch, then list every object so nothing is missed in between.
//! 2. Queue the key of every change event. Duplicates collapse in the [`WorkQueue`].
//! 3. Hand queued keys to reconcile tasks, never more than one per key and never more
//!    than `max_concurrent_reconciles` in total.
//! 4. On failure, requeue the key after an exponential backoff. On success, clear its
//!    failure history and honour any requested requeue. A key has at most one pending
//!    retry however many events arrive while it keeps failing, so its attempt rate
//!    stays bounded by the backoff plus the rate of real changes.
//!
//! The controller is itself an actor: one task owns the queue and reacts to watch
//! events, completed attempts, delayed requeues and the shutdown signal. Reconcile
//! attempts run on their own tasks, so a panicking reconciler costs one attempt, not
//! the controller.
//!
//! # Shutdown
//!
//! Shutdown is a `watch::Receiver<bool>`. When it flips to `true` (or its sender is
//! dropped) the controller stops dispatching, every in-flight attempt is aborted at
//! its next suspension point, and `run` returns once all attempts have reported back.

use crate::client::ResourceClient;
use crate::error::FrameworkError;
use crate::message::WatchEvent;
use crate::object::{Hub, ObjectKey};
use crate::queue::{BackoffPolicy, WorkQueue};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// What the controller should do with a key after a successful attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Action {
    requeue_after: Option<Duration>,
}

impl Action {
    /// Nothing more to do until the object changes.
    pub fn await_change() -> Self {
        Self::default()
    }

    /// Reconcile again after `after`, even if nothing changes.
    pub fn requeue(after: Duration) -> Self {
        Self {
            requeue_after: Some(after),
        }
    }

    pub fn requeue_after(&self) -> Option<Duration> {
        self.requeue_after
    }
}

/// Per-kind reconciliation logic.
///
/// An attempt either succeeds with an [`Action`] or fails with `Self::Error`; failures
/// are requeued with backoff by the controller. Implementations must tolerate being
/// called repeatedly for the same key and must not assume the object still exists.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn reconcile(&self, key: &ObjectKey) -> Result<Action, Self::Error>;
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Upper bound on reconcile attempts running at once, across all keys.
    pub max_concurrent_reconciles: usize,

    /// Retry schedule for failed keys.
    pub backoff: BackoffPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_reconciles: 4,
            backoff: BackoffPolicy::default(),
        }
    }
}

enum Outcome<E> {
    Reconciled(Action),
    Failed(E),
    Cancelled,
    Panicked(String),
}

struct Completion<E> {
    key: ObjectKey,
    outcome: Outcome<E>,
}

pub struct Controller<H: Hub, R: Reconciler> {
    client: ResourceClient<H>,
    reconciler: Arc<R>,
    config: ControllerConfig,
    queue: WorkQueue,
}

impl<H: Hub, R: Reconciler> Controller<H, R> {
    pub fn new(client: ResourceClient<H>, reconciler: R, config: ControllerConfig) -> Self {
        let queue = WorkQueue::new(config.backoff.clone());
        Self {
            client,
            reconciler: Arc::new(reconciler),
            config,
            queue,
        }
    }

    /// Runs until shutdown is signalled or the store goes away.
    ///
    /// Fails only if the initial listing fails.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), FrameworkError> {
        let kind = H::KIND;
        info!(
            kind,
            max_concurrent = self.config.max_concurrent_reconciles,
            "Controller started"
        );

        let mut events = self.client.watch();
        self.relist().await?;

        let (completions_tx, mut completions_rx) = mpsc::unbounded_channel();
        let (requeue_tx, mut requeue_rx) = mpsc::unbounded_channel();

        loop {
            self.dispatch(&completions_tx, &shutdown);

            tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => {
                    info!(kind, "Shutdown signalled");
                    break;
                }
                Some(completion) = completions_rx.recv() => {
                    self.complete(completion, &requeue_tx);
                }
                Some((key, generation)) = requeue_rx.recv() => {
                    self.queue.wake(key, generation);
                }
                event = events.next() => match event {
                    Some(WatchEvent::Resync) => {
                        if let Err(e) = self.relist().await {
                            warn!(kind, error = %e, "Resync failed");
                        }
                    }
                    Some(event) => {
                        if let Some(key) = event.key() {
                            debug!(kind, ?event, "Watch event");
                            self.queue.add(key.clone());
                        }
                    }
                    None => {
                        info!(kind, "Watch closed");
                        break;
                    }
                },
            }
        }

        while self.queue.in_flight() > 0 {
            let Some(completion) = completions_rx.recv().await else {
                break;
            };
            self.complete(completion, &requeue_tx);
        }

        info!(kind, pending = self.queue.len(), "Controller stopped");
        Ok(())
    }

    async fn relist(&mut self) -> Result<(), FrameworkError> {
        let objects = self.client.list().await?;
        debug!(kind = H::KIND, count = objects.len(), "Listed");
        for object in objects {
            self.queue.add(object.key());
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        completions: &mpsc::UnboundedSender<Completion<R::Error>>,
        shutdown: &watch::Receiver<bool>,
    ) {
        while self.queue.in_flight() < self.config.max_concurrent_reconciles {
            let Some(key) = self.queue.pop() else {
                break;
            };
            self.spawn_attempt(key, completions.clone(), shutdown.clone());
        }
    }

    fn spawn_attempt(
        &self,
        key: ObjectKey,
        completions: mpsc::UnboundedSender<Completion<R::Error>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let reconciler = Arc::clone(&self.reconciler);
        let span = info_span!("reconcile", kind = H::KIND, key = %key);
        let attempt_key = key.clone();
        let attempt = tokio::spawn(
            async move { reconciler.reconcile(&attempt_key).await }.instrument(span),
        );
        let abort = attempt.abort_handle();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                joined = attempt => match joined {
                    Ok(Ok(action)) => Outcome::Reconciled(action),
                    Ok(Err(e)) => Outcome::Failed(e),
                    Err(e) if e.is_cancelled() => Outcome::Cancelled,
                    Err(e) => Outcome::Panicked(e.to_string()),
                },
                _ = stopped(&mut shutdown) => {
                    abort.abort();
                    Outcome::Cancelled
                }
            };
            let _ = completions.send(Completion { key, outcome });
        });
    }

    fn complete(
        &mut self,
        Completion { key, outcome }: Completion<R::Error>,
        requeue: &mpsc::UnboundedSender<(ObjectKey, u64)>,
    ) {
        let kind = H::KIND;
        self.queue.done(&key);

        match outcome {
            Outcome::Reconciled(action) => {
                self.queue.forget(&key);
                debug!(kind, %key, ?action, "Reconciled");
                if let Some(after) = action.requeue_after() {
                    self.defer(requeue, key, after);
                }
            }
            Outcome::Failed(e) => {
                let delay = self.queue.fail(&key);
                warn!(
                    kind,
                    %key,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "Reconcile failed, requeueing"
                );
                self.defer(requeue, key, delay);
            }
            Outcome::Panicked(message) => {
                let delay = self.queue.fail(&key);
                error!(kind, %key, error = %message, "Reconcile panicked, requeueing");
                self.defer(requeue, key, delay);
            }
            Outcome::Cancelled => {
                debug!(kind, %key, "Reconcile cancelled");
            }
        }
    }

    /// Starts a wake-up timer unless the key already has an earlier one pending.
    fn defer(
        &mut self,
        requeue: &mpsc::UnboundedSender<(ObjectKey, u64)>,
        key: ObjectKey,
        after: Duration,
    ) {
        let Some(generation) = self.queue.defer(key.clone(), after) else {
            return;
        };
        let requeue = requeue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = requeue.send((key, generation));
        });
    }
}

/// Resolves once shutdown is requested or the shutdown sender is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
