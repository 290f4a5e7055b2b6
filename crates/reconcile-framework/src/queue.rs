//! # Work Queue
//!
//! The bookkeeping behind the controller's scheduling guarantees. The queue is plain
//! data owned by the controller task, so like the store it needs no locks.
//!
//! A key is in at most one of three places:
//!
//! - **queued**: waiting to be handed to a worker. Adding it again is a no-op.
//! - **in flight**: a reconcile is running. Adding it again marks it *dirty*.
//! - **idle**: neither.
//!
//! When an in-flight key completes, a dirty mark puts it straight back in the queue, so
//! a change that arrives mid-reconcile is never lost and never runs concurrently with
//! the reconcile it raced.
//!
//! Independently of that, a key can have one **deferred** wake-up: a retry after a
//! failure or a requested requeue. A key never has more than one, and the earliest
//! deadline wins. Each wake-up carries a generation number, so a timer whose wake-up
//! was replaced or cancelled (by a fresh change or a clean reconcile) does nothing when
//! it fires.

use crate::object::ObjectKey;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Exponential backoff for keys whose reconcile failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub base: Duration,

    /// Upper bound on any delay.
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(100),
            max: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    pending: VecDeque<ObjectKey>,
    queued: HashSet<ObjectKey>,
    in_flight: HashSet<ObjectKey>,
    dirty: HashSet<ObjectKey>,
    failures: HashMap<ObjectKey, u32>,
    deferred: HashMap<ObjectKey, Deferred>,
    generation: u64,
    backoff: BackoffPolicy,
}

#[derive(Debug, Clone, Copy)]
struct Deferred {
    deadline: Instant,
    generation: u64,
}

impl WorkQueue {
    pub fn new(backoff: BackoffPolicy) -> Self {
        Self {
            backoff,
            ..Self::default()
        }
    }

    /// Queues a key now. Cancels any deferred wake-up for it.
    pub fn add(&mut self, key: ObjectKey) {
        self.deferred.remove(&key);
        if self.in_flight.contains(&key) {
            self.dirty.insert(key);
        } else if self.queued.insert(key.clone()) {
            self.pending.push_back(key);
        }
    }

    /// Hands out the next key and marks it in flight.
    pub fn pop(&mut self) -> Option<ObjectKey> {
        let key = self.pending.pop_front()?;
        self.queued.remove(&key);
        self.in_flight.insert(key.clone());
        Some(key)
    }

    /// Marks an in-flight key complete, re-queueing it if it changed meanwhile.
    pub fn done(&mut self, key: &ObjectKey) {
        self.in_flight.remove(key);
        if self.dirty.remove(key) {
            self.add(key.clone());
        }
    }

    /// Records a failure and returns how long to wait before retrying.
    pub fn fail(&mut self, key: &ObjectKey) -> Duration {
        let failures = self.failures.entry(key.clone()).or_insert(0);
        let delay = self.backoff.delay(*failures);
        *failures = failures.saturating_add(1);
        delay
    }

    /// Clears the failure history and any deferred wake-up of a key after it
    /// reconciled cleanly.
    pub fn forget(&mut self, key: &ObjectKey) {
        self.failures.remove(key);
        self.deferred.remove(key);
    }

    /// Schedules a wake-up for `key` after `after`.
    ///
    /// Returns the generation the caller's timer must hand to [`WorkQueue::wake`], or
    /// `None` when an earlier wake-up is already pending and no timer is needed. A
    /// delay too long to represent as a deadline never wakes.
    pub fn defer(&mut self, key: ObjectKey, after: Duration) -> Option<u64> {
        let deadline = Instant::now().checked_add(after)?;
        if let Some(pending) = self.deferred.get(&key) {
            if pending.deadline <= deadline {
                return None;
            }
        }
        self.generation += 1;
        let generation = self.generation;
        self.deferred.insert(key, Deferred { deadline, generation });
        Some(generation)
    }

    /// A deferred timer fired. Queues the key if `generation` is still its pending
    /// wake-up; stale timers are ignored.
    pub fn wake(&mut self, key: ObjectKey, generation: u64) {
        let current = self
            .deferred
            .get(&key)
            .is_some_and(|pending| pending.generation == generation);
        if current {
            self.add(key);
        }
    }

    pub fn is_deferred(&self, key: &ObjectKey) -> bool {
        self.deferred.contains_key(key)
    }

    pub fn failures(&self, key: &ObjectKey) -> u32 {
        self.failures.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
