use math_operator::api::{v1alpha1, Math, Variable};
use math_operator::clients::MathClient;
use math_operator::config::OperatorConfig;
use math_operator::controller::OK_MESSAGE;
use math_operator::lifecycle::MathOperator;
use reconcile_framework::{ObjectKey, Versioned};
use serde_json::json;
use std::time::Duration;

fn test_config() -> OperatorConfig {
    OperatorConfig {
        backoff_base: Duration::from_millis(1),
        backoff_max: Duration::from_millis(20),
        ..OperatorConfig::default()
    }
}

/// Polls until the object's status satisfies `done`, and returns it.
async fn wait_for(client: &MathClient, key: &ObjectKey, done: impl Fn(&Math) -> bool) -> Math {
    let polled = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Some(math) = client.get(key).await.unwrap() {
                if done(&math) {
                    return math;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    polled.unwrap_or_else(|_| panic!("{key} did not converge"))
}

/// Full system test: real store, real controller, real reconciler.
#[tokio::test]
async fn test_legacy_manifest_converges() {
    let operator = MathOperator::start(&test_config()).unwrap();
    let client = &operator.client;

    let submitted = client
        .submit(json!({
            "apiVersion": "math.example.com/v1alpha1",
            "kind": "Math",
            "metadata": { "name": "linear" },
            "spec": { "expression": "3 * x + 7", "variables": { "x": "4" } }
        }))
        .await
        .unwrap();
    assert_eq!(submitted.spec.variables, vec![Variable::float("x", "4")]);

    let key = ObjectKey::named("linear");
    let math = wait_for(client, &key, |m| m.status.message == OK_MESSAGE).await;
    assert_eq!(math.status.result, "19");

    // Legacy readers see the same status.
    let legacy = client.get_legacy(&key).await.unwrap().unwrap();
    assert_eq!(legacy.status.result, "19");
    assert_eq!(legacy.status.message, OK_MESSAGE);

    operator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bad_expression_converges_to_an_error_message() {
    let operator = MathOperator::start(&test_config()).unwrap();
    let client = &operator.client;
    let key = ObjectKey::named("broken");

    client
        .create(Math::new("broken", "a + b").with_variable(Variable::float("a", "1")))
        .await
        .unwrap();

    let math = wait_for(client, &key, |m| !m.status.message.is_empty()).await;
    assert_eq!(math.status.message, "unbound variable \"b\"");
    assert_eq!(math.status.result, "");

    // Fixing the spec clears the error.
    client
        .update_spec(&key, |spec| spec.variables.push(Variable::float("b", "2")))
        .await
        .unwrap();
    let math = wait_for(client, &key, |m| m.status.message == OK_MESSAGE).await;
    assert_eq!(math.status.result, "3");

    operator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_spec_changes_and_deletes() {
    let operator = MathOperator::start(&test_config()).unwrap();
    let client = &operator.client;
    let key = ObjectKey::named("area");

    client
        .create_legacy(
            &v1alpha1::Math::new("area", "w * h")
                .with_variable("w", "3")
                .with_variable("h", "5"),
        )
        .await
        .unwrap();
    wait_for(client, &key, |m| m.status.result == "15").await;

    client
        .update_spec(&key, |spec| spec.expression = "w * h / 2".into())
        .await
        .unwrap();
    let math = wait_for(client, &key, |m| m.status.result == "7.5").await;
    assert_eq!(math.status.message, OK_MESSAGE);

    client.delete(&key).await.unwrap();
    assert!(client.get(&key).await.unwrap().is_none());

    // A delete is not a failure: the operator still shuts down cleanly.
    operator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stale_status_write_conflicts_until_refetched() {
    let operator = MathOperator::start(&test_config()).unwrap();
    let client = &operator.client;
    let key = ObjectKey::named("sum");

    let stale = client
        .create(Math::new("sum", "x + 1").with_variable(Variable::float("x", "1")))
        .await
        .unwrap();
    let converged = wait_for(client, &key, |m| m.status.message == OK_MESSAGE).await;
    assert!(converged.metadata.resource_version > stale.metadata.resource_version);

    let mut forged = stale;
    forged.status.result = "42".into();
    let err = client.inner().update_status(forged).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(client.get(&key).await.unwrap().unwrap(), converged);

    let mut fresh = client.get(&key).await.unwrap().unwrap();
    fresh.status.message = "manually annotated".into();
    let written = client.inner().update_status(fresh).await.unwrap();
    assert_eq!(written.status.message, "manually annotated");

    // The controller sees the change and puts its own status back.
    wait_for(client, &key, |m| m.status.message == OK_MESSAGE).await;

    operator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_legacy_storage_version_downgrades_unsupported_types() {
    let config = OperatorConfig {
        storage_version: v1alpha1::Math::API_VERSION.to_string(),
        ..test_config()
    };
    let operator = MathOperator::start(&config).unwrap();
    let client = &operator.client;
    let key = ObjectKey::named("flagged");

    let created = client
        .create(Math::new("flagged", "x + 1").with_variable(Variable::new("x", "5", "bool")))
        .await
        .unwrap();
    // Persisted as v1alpha1: the bool became a float "0".
    assert_eq!(created.spec.variables, vec![Variable::float("x", "0")]);

    let math = wait_for(client, &key, |m| m.status.message == OK_MESSAGE).await;
    assert_eq!(math.status.result, "1");

    operator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_status_does_not_depend_on_storage_version() {
    let mut statuses = Vec::new();
    for storage_version in [Math::API_VERSION, v1alpha1::Math::API_VERSION] {
        let config = OperatorConfig {
            storage_version: storage_version.to_string(),
            ..test_config()
        };
        let operator = MathOperator::start(&config).unwrap();
        let client = &operator.client;
        let key = ObjectKey::named("mixed");

        client
            .create(
                Math::new("mixed", "x + n + flag")
                    .with_variable(Variable::float("x", "1.5"))
                    .with_variable(Variable::new("n", "2.5", "int"))
                    .with_variable(Variable::new("flag", "true", "bool")),
            )
            .await
            .unwrap();
        let math = wait_for(client, &key, |m| !m.status.message.is_empty()).await;
        statuses.push(math.status);

        operator.shutdown().await.unwrap();
    }

    assert_eq!(statuses[0], statuses[1]);
    assert_eq!(statuses[0].result, "4");
    assert_eq!(statuses[0].message, OK_MESSAGE);
}

#[tokio::test]
async fn test_duplicate_variables_are_rejected_at_admission() {
    let operator = MathOperator::start(&test_config()).unwrap();

    let duplicate = Math::new("dup", "x")
        .with_variable(Variable::float("x", "1"))
        .with_variable(Variable::float("x", "2"));
    let err = operator.client.create(duplicate).await.unwrap_err();
    assert!(err.to_string().contains("duplicate variable"));

    operator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_storage_version_fails_to_start() {
    let config = OperatorConfig {
        storage_version: "math.example.com/v2".to_string(),
        ..test_config()
    };
    assert!(MathOperator::start(&config).is_err());
}
