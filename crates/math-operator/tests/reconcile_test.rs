use math_operator::api::{Math, MathStatus, Variable};
use math_operator::controller::{MathReconciler, ReconcileError, OK_MESSAGE};
use math_operator::evaluator::EvaluationError;
use reconcile_framework::mock::{create_mock_client, expect_get, expect_update_status, MockClient};
use reconcile_framework::{Action, FrameworkError, ObjectKey, Reconciler};

fn stored(name: &str, expression: &str, resource_version: u64) -> Math {
    let mut math = Math::new(name, expression).with_variable(Variable::float("x", "4"));
    math.metadata.resource_version = resource_version;
    math
}

/// Pattern 1: Reconciler + MockClient
/// - Real reconciler logic
/// - Scripted store responses, so every branch is reachable on demand
#[tokio::test]
async fn test_not_found_is_done_without_a_write() {
    let mut mock = MockClient::<Math>::new();
    let key = ObjectKey::named("gone");
    mock.expect_get(key.clone()).return_ok(None);

    let reconciler = MathReconciler::new(mock.client());
    let action = reconciler.reconcile(&key).await.unwrap();

    assert_eq!(action, Action::await_change());
    mock.verify();
    assert!(mock.status_writes().is_empty());
}

#[tokio::test]
async fn test_success_writes_result_once() {
    let mut mock = MockClient::<Math>::new();
    let key = ObjectKey::named("sum");
    let math = stored("sum", "3 * x + 7", 3);

    mock.expect_get(key.clone()).return_ok(Some(math.clone()));
    mock.expect_update_status().return_ok(math);

    let reconciler = MathReconciler::new(mock.client());
    reconciler.reconcile(&key).await.unwrap();

    mock.verify();
    let writes = mock.status_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(
        writes[0].status,
        MathStatus {
            result: "19".into(),
            message: OK_MESSAGE.into(),
        }
    );
    // The write carries the token that was read.
    assert_eq!(writes[0].metadata.resource_version, 3);
}

#[tokio::test]
async fn test_evaluation_failure_still_writes_status() {
    let mut mock = MockClient::<Math>::new();
    let key = ObjectKey::named("broken");
    let mut math = stored("broken", "x + y", 5);
    math.status.result = "4".into();

    mock.expect_get(key.clone()).return_ok(Some(math.clone()));
    mock.expect_update_status().return_ok(math);

    let reconciler = MathReconciler::new(mock.client());
    let err = reconciler.reconcile(&key).await.unwrap_err();

    assert!(matches!(
        &err,
        ReconcileError::Evaluation(EvaluationError::UnboundVariable(name)) if name == "y"
    ));
    assert!(!err.is_transient());

    mock.verify();
    let writes = mock.status_writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].status.result, "4");
    assert_eq!(writes[0].status.message, err.to_string());
}

#[tokio::test]
async fn test_variable_parse_failure_is_recorded() {
    let mut mock = MockClient::<Math>::new();
    let key = ObjectKey::named("typed");
    let math = Math::new("typed", "x + 1").with_variable(Variable::float("x", "four"));

    mock.expect_get(key.clone()).return_ok(Some(math.clone()));
    mock.expect_update_status().return_ok(math);

    let reconciler = MathReconciler::new(mock.client());
    let err = reconciler.reconcile(&key).await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Evaluation(EvaluationError::VariableParse { .. })
    ));
    mock.verify();
    assert_eq!(
        mock.status_writes()[0].status.message,
        "cannot parse variable \"x\": \"four\" is not a number"
    );
}

#[tokio::test]
async fn test_non_numeric_types_evaluate_as_zero() {
    let mut mock = MockClient::<Math>::new();
    let key = ObjectKey::named("typed");
    let math = Math::new("typed", "flag + n")
        .with_variable(Variable::new("flag", "true", "bool"))
        .with_variable(Variable::new("n", "2.5", "int"));

    mock.expect_get(key.clone()).return_ok(Some(math.clone()));
    mock.expect_update_status().return_ok(math);

    let reconciler = MathReconciler::new(mock.client());
    reconciler.reconcile(&key).await.unwrap();

    mock.verify();
    let writes = mock.status_writes();
    assert_eq!(writes[0].status.result, "2.5");
    assert_eq!(writes[0].status.message, OK_MESSAGE);
}

#[tokio::test]
async fn test_deleted_before_the_write_is_done() {
    let mut mock = MockClient::<Math>::new();
    let key = ObjectKey::named("sum");

    mock.expect_get(key.clone())
        .return_ok(Some(stored("sum", "3 * x + 7", 3)));
    mock.expect_update_status()
        .return_err(FrameworkError::NotFound(key.clone()));

    let reconciler = MathReconciler::new(mock.client());
    let action = reconciler.reconcile(&key).await.unwrap();

    assert_eq!(action, Action::await_change());
    mock.verify();
}

#[tokio::test]
async fn test_conflict_fails_the_attempt() {
    let mut mock = MockClient::<Math>::new();
    let key = ObjectKey::named("sum");

    mock.expect_get(key.clone())
        .return_ok(Some(stored("sum", "3 * x + 7", 3)));
    mock.expect_update_status().return_err(FrameworkError::Conflict {
        key: key.clone(),
        expected: 3,
        actual: 4,
    });

    let reconciler = MathReconciler::new(mock.client());
    let err = reconciler.reconcile(&key).await.unwrap_err();

    assert!(matches!(&err, ReconcileError::Store(e) if e.is_conflict()));
    assert!(err.is_transient());
    mock.verify();
}

#[tokio::test]
async fn test_store_unavailable_fails_before_any_write() {
    let mut mock = MockClient::<Math>::new();
    let key = ObjectKey::named("sum");
    mock.expect_get(key.clone())
        .return_err(FrameworkError::ActorClosed);

    let reconciler = MathReconciler::new(mock.client());
    let err = reconciler.reconcile(&key).await.unwrap_err();

    assert!(matches!(err, ReconcileError::Store(FrameworkError::ActorClosed)));
    assert!(err.is_transient());
    mock.verify();
    assert!(mock.status_writes().is_empty());
}

#[tokio::test]
async fn test_unchanged_spec_reconciles_to_identical_status() {
    let mut mock = MockClient::<Math>::new();
    let key = ObjectKey::named("sum");
    let math = stored("sum", "x ** 2 / 8", 7);

    for _ in 0..2 {
        mock.expect_get(key.clone()).return_ok(Some(math.clone()));
        mock.expect_update_status().return_ok(math.clone());
    }

    let reconciler = MathReconciler::new(mock.client());
    reconciler.reconcile(&key).await.unwrap();
    reconciler.reconcile(&key).await.unwrap();

    mock.verify();
    let writes = mock.status_writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].status, writes[1].status);
    assert_eq!(writes[0].status.result, "2");
}

/// Pattern 2: Raw channel
/// - The test plays the store by hand and inspects the request before answering
#[tokio::test]
async fn test_status_write_with_raw_channel() {
    let (client, mut receiver) = create_mock_client::<Math>(10);
    let key = ObjectKey::named("cmp");
    let reconciler = MathReconciler::new(client);

    let attempt = tokio::spawn({
        let key = key.clone();
        async move { reconciler.reconcile(&key).await }
    });

    let (requested, responder) = expect_get(&mut receiver).await.expect("Expected Get request");
    assert_eq!(requested, key);
    let math = stored("cmp", "x > 3 && x < 5", 1);
    responder.send(Ok(Some(math))).unwrap();

    let (written, responder) = expect_update_status(&mut receiver)
        .await
        .expect("Expected UpdateStatus request");
    assert_eq!(written.status.result, "true");
    assert_eq!(written.status.message, OK_MESSAGE);
    responder.send(Ok(written)).unwrap();

    attempt.await.unwrap().unwrap();
}
