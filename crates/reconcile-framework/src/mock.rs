//! # Mock Store & Testing Guide
//!
//! `MockClient<H>` hands out a real [`ResourceClient<H>`] whose requests are answered
//! from a queue of expectations instead of a running [`ResourceStore`](crate::ResourceStore).
//! It lets you test a reconciler's branches (not found, conflicts, an unreachable
//! store) deterministically and without building state first.
//!
//! ## When to use Mocks vs a Real Store
//!
//! | Feature | MockClient | ResourceStore |
//! |---------|------------|---------------|
//! | **Determinism** | Scripted responses | Real version tokens |
//! | **Error Injection** | Easy (`return_err`) | Needs a racing writer |
//! | **Asserting absence** | Unexpected requests fail the test | Not observable |
//! | **Use Case** | One reconcile attempt, one branch | End-to-end convergence |
//!
//! Requests are matched in order. A request that does not match the next expectation
//! makes the mock drop it, so the caller sees [`FrameworkError::ActorDropped`], and
//! [`MockClient::verify`] then fails the test. That is how a test asserts that a
//! reconciler did *not* write status.
//!
//! ## Mocking Utilities
//!
//! Use [`create_mock_client`] to get a client and the raw request receiver, or use the
//! fluent [`MockClient`] API.

use crate::client::ResourceClient;
use crate::error::FrameworkError;
use crate::message::{Response, StoreRequest, WatchEvent};
use crate::object::{Hub, ObjectKey};
use crate::scheme::Scheme;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

enum Expectation<H: Hub> {
    Get {
        key: ObjectKey,
        response: Result<Option<H>, FrameworkError>,
    },
    List {
        response: Result<Vec<H>, FrameworkError>,
    },
    UpdateStatus {
        response: Result<H, FrameworkError>,
    },
}

impl<H: Hub> Expectation<H> {
    fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "get",
            Self::List { .. } => "list",
            Self::UpdateStatus { .. } => "update_status",
        }
    }
}

fn request_name<H: Hub>(request: &StoreRequest<H>) -> &'static str {
    match request {
        StoreRequest::Get { .. } => "get",
        StoreRequest::List { .. } => "list",
        StoreRequest::Create { .. } => "create",
        StoreRequest::Replace { .. } => "replace",
        StoreRequest::UpdateStatus { .. } => "update_status",
        StoreRequest::Delete { .. } => "delete",
    }
}

struct MockState<H: Hub> {
    expectations: VecDeque<Expectation<H>>,
    status_writes: Vec<H>,
    mismatches: Vec<String>,
}

type Shared<H> = Arc<Mutex<MockState<H>>>;

fn lock<H: Hub>(state: &Shared<H>) -> MutexGuard<'_, MockState<H>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn reply<T>(respond_to: Response<T>, response: Result<T, FrameworkError>) {
    let _ = respond_to.send(response);
}

/// A mock store with expectation tracking for fluent testing.
///
/// # Example
/// ```ignore
/// let mut mock = MockClient::<Math>::new();
/// mock.expect_get(ObjectKey::named("sum")).return_ok(Some(math.clone()));
/// mock.expect_update_status().return_ok(math);
///
/// let reconciler = MathReconciler::new(mock.client());
/// reconciler.reconcile(&ObjectKey::named("sum")).await?;
///
/// mock.verify(); // Ensures all expectations were met
/// assert_eq!(mock.status_writes()[0].status.message, "OK");
/// ```
pub struct MockClient<H: Hub> {
    client: ResourceClient<H>,
    events: broadcast::Sender<WatchEvent>,
    state: Shared<H>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<H> Default for MockClient<H>
where
    H: Hub + Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<H> MockClient<H>
where
    H: Hub + Serialize + DeserializeOwned,
{
    /// Creates a new mock with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<StoreRequest<H>>(100);
        let (events, _) = broadcast::channel(16);
        let state: Shared<H> = Arc::new(Mutex::new(MockState {
            expectations: VecDeque::new(),
            status_writes: Vec::new(),
            mismatches: Vec::new(),
        }));
        let task_state = Arc::clone(&state);

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let mut state = lock(&task_state);
                let expectation = state.expectations.pop_front();

                match (request, expectation) {
                    (
                        StoreRequest::Get { key, respond_to },
                        Some(Expectation::Get {
                            key: expected,
                            response,
                        }),
                    ) => {
                        if key != expected {
                            state
                                .mismatches
                                .push(format!("get: expected key {expected}, got {key}"));
                        }
                        reply(respond_to, response);
                    }
                    (StoreRequest::List { respond_to }, Some(Expectation::List { response })) => {
                        reply(respond_to, response);
                    }
                    (
                        StoreRequest::UpdateStatus { object, respond_to },
                        Some(Expectation::UpdateStatus { response }),
                    ) => {
                        state.status_writes.push(object);
                        reply(respond_to, response);
                    }
                    (request, expectation) => {
                        let expected = expectation.as_ref().map_or("nothing", Expectation::name);
                        let unexpected = format!(
                            "unexpected {} request, expected {expected}",
                            request_name(&request)
                        );
                        state.mismatches.push(unexpected);
                        if let StoreRequest::UpdateStatus { object, .. } = request {
                            state.status_writes.push(object);
                        }
                        // Dropping the request drops its responder: the caller sees
                        // `ActorDropped`.
                    }
                }
            }
        });

        let client = ResourceClient::new(sender, events.clone(), Arc::new(Scheme::new()));

        Self {
            client,
            events,
            state,
            _handle: handle,
        }
    }
}

impl<H: Hub> MockClient<H> {
    /// Returns the client for use in tests.
    pub fn client(&self) -> ResourceClient<H> {
        self.client.clone()
    }

    /// Expects a `get` operation.
    pub fn expect_get(&mut self, key: ObjectKey) -> GetExpectationBuilder<H> {
        GetExpectationBuilder {
            key,
            state: Arc::clone(&self.state),
        }
    }

    /// Expects a `list` operation.
    pub fn expect_list(&mut self) -> ListExpectationBuilder<H> {
        ListExpectationBuilder {
            state: Arc::clone(&self.state),
        }
    }

    /// Expects an `update_status` operation.
    pub fn expect_update_status(&mut self) -> UpdateStatusExpectationBuilder<H> {
        UpdateStatusExpectationBuilder {
            state: Arc::clone(&self.state),
        }
    }

    /// Sends `event` to every open watch. Returns false if nobody is watching yet.
    pub fn publish(&self, event: WatchEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Every object sent to `update_status`, expected or not, in arrival order.
    pub fn status_writes(&self) -> Vec<H> {
        lock(&self.state).status_writes.clone()
    }

    /// Verifies that all expectations were met and nothing unexpected arrived.
    pub fn verify(&self) {
        let state = lock(&self.state);
        if !state.mismatches.is_empty() {
            panic!("Mock received unexpected requests: {:?}", state.mismatches);
        }
        if !state.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                state.expectations.len()
            );
        }
    }
}

/// Builder for `get` expectations.
pub struct GetExpectationBuilder<H: Hub> {
    key: ObjectKey,
    state: Shared<H>,
}

impl<H: Hub> GetExpectationBuilder<H> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: Option<H>) {
        lock(&self.state).expectations.push_back(Expectation::Get {
            key: self.key,
            response: Ok(value),
        });
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        lock(&self.state).expectations.push_back(Expectation::Get {
            key: self.key,
            response: Err(error),
        });
    }
}

/// Builder for `list` expectations.
pub struct ListExpectationBuilder<H: Hub> {
    state: Shared<H>,
}

impl<H: Hub> ListExpectationBuilder<H> {
    pub fn return_ok(self, objects: Vec<H>) {
        lock(&self.state)
            .expectations
            .push_back(Expectation::List {
                response: Ok(objects),
            });
    }

    pub fn return_err(self, error: FrameworkError) {
        lock(&self.state)
            .expectations
            .push_back(Expectation::List {
                response: Err(error),
            });
    }
}

/// Builder for `update_status` expectations.
pub struct UpdateStatusExpectationBuilder<H: Hub> {
    state: Shared<H>,
}

impl<H: Hub> UpdateStatusExpectationBuilder<H> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, object: H) {
        lock(&self.state)
            .expectations
            .push_back(Expectation::UpdateStatus { response: Ok(object) });
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        lock(&self.state)
            .expectations
            .push_back(Expectation::UpdateStatus {
                response: Err(error),
            });
    }
}

// =============================================================================
// RAW HELPERS
// =============================================================================

/// Creates a client and the receiver its requests arrive on.
///
/// # Testing Strategy
/// When a test needs to look *inside* a request (the exact status a reconciler wrote,
/// say) and decide the response on the spot, take the receiver and play the store by
/// hand.
///
/// **Note**: Consider using [`MockClient`] for a more fluent API.
pub fn create_mock_client<H>(
    buffer_size: usize,
) -> (ResourceClient<H>, mpsc::Receiver<StoreRequest<H>>)
where
    H: Hub + Serialize + DeserializeOwned,
{
    let (sender, receiver) = mpsc::channel(buffer_size);
    let (events, _) = broadcast::channel(16);
    (
        ResourceClient::new(sender, events, Arc::new(Scheme::new())),
        receiver,
    )
}

/// Helper to verify that the next message is a Get request.
pub async fn expect_get<H: Hub>(
    receiver: &mut mpsc::Receiver<StoreRequest<H>>,
) -> Option<(ObjectKey, Response<Option<H>>)> {
    match receiver.recv().await {
        Some(StoreRequest::Get { key, respond_to }) => Some((key, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an UpdateStatus request.
pub async fn expect_update_status<H: Hub>(
    receiver: &mut mpsc::Receiver<StoreRequest<H>>,
) -> Option<(H, Response<H>)> {
    match receiver.recv().await {
        Some(StoreRequest::UpdateStatus { object, respond_to }) => Some((object, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectMeta, Versioned};
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        metadata: ObjectMeta,
        target: u32,
        #[serde(default)]
        observed: u32,
    }

    impl Versioned for Counter {
        const API_VERSION: &'static str = "test/v1";
        const KIND: &'static str = "Counter";
    }

    impl Hub for Counter {
        type Status = u32;
        fn meta(&self) -> &ObjectMeta {
            &self.metadata
        }
        fn meta_mut(&mut self) -> &mut ObjectMeta {
            &mut self.metadata
        }
        fn status(&self) -> &u32 {
            &self.observed
        }
        fn set_status(&mut self, status: u32) {
            self.observed = status;
        }
    }

    fn counter(name: &str, target: u32) -> Counter {
        Counter {
            metadata: ObjectMeta::new(name),
            target,
            observed: 0,
        }
    }

    #[tokio::test]
    async fn test_raw_mock_client() {
        let (client, mut receiver) = create_mock_client::<Counter>(10);

        let task = tokio::spawn(async move { client.get(&ObjectKey::named("c")).await });

        let (key, responder) = expect_get(&mut receiver)
            .await
            .expect("Expected Get request");
        assert_eq!(key, ObjectKey::named("c"));
        responder.send(Ok(Some(counter("c", 3)))).unwrap();

        let fetched = task.await.unwrap().unwrap().unwrap();
        assert_eq!(fetched.target, 3);
    }

    #[tokio::test]
    async fn test_mock_client_with_expectations() {
        let mut mock = MockClient::<Counter>::new();
        let key = ObjectKey::named("c");

        mock.expect_get(key.clone()).return_ok(Some(counter("c", 3)));
        mock.expect_update_status().return_err(FrameworkError::Conflict {
            key: key.clone(),
            expected: 1,
            actual: 2,
        });

        let client = mock.client();
        let mut fetched = client.get(&key).await.unwrap().unwrap();
        fetched.observed = 3;
        let err = client.update_status(fetched).await.unwrap_err();
        assert!(err.is_conflict());

        mock.verify();
        assert_eq!(mock.status_writes().len(), 1);
        assert_eq!(mock.status_writes()[0].observed, 3);
    }

    #[tokio::test]
    async fn test_unexpected_request_is_dropped_and_recorded() {
        let mock = MockClient::<Counter>::new();
        let client = mock.client();

        let err = client.update_status(counter("c", 1)).await.unwrap_err();
        assert!(matches!(err, FrameworkError::ActorDropped));
        assert_eq!(mock.status_writes().len(), 1);

        let verified = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| mock.verify()));
        assert!(verified.is_err());
    }
}
