//! `math.example.com/v1alpha1`, the legacy version of `Math`.
//!
//! Variables carry no type and are implicitly numeric. Upgrading tags every value as
//! `float`. Downgrading keeps values whose type is `float` or `int` and writes `"0"`
//! for anything else, since this version has nowhere to put the type.

use super::v1beta1::{self, Variable, FLOAT};
use reconcile_framework::{Convertible, ObjectMeta, Versioned};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value written for variables whose type this version cannot express.
pub const UNSUPPORTED_VALUE: &str = "0";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MathSpec {
    pub expression: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathStatus {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Math {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: MathSpec,
    #[serde(default)]
    pub status: MathStatus,
}

impl Math {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(name),
            spec: MathSpec {
                expression: expression.into(),
                variables: BTreeMap::new(),
            },
            status: MathStatus::default(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.variables.insert(name.into(), value.into());
        self
    }
}

impl Versioned for Math {
    const API_VERSION: &'static str = "math.example.com/v1alpha1";
    const KIND: &'static str = "Math";
}

impl Convertible<v1beta1::Math> for Math {
    fn convert_to(&self) -> v1beta1::Math {
        v1beta1::Math {
            metadata: self.metadata.clone(),
            spec: v1beta1::MathSpec {
                expression: self.spec.expression.clone(),
                variables: self
                    .spec
                    .variables
                    .iter()
                    .map(|(name, value)| Variable::new(name.clone(), value.clone(), FLOAT))
                    .collect(),
            },
            status: v1beta1::MathStatus {
                result: self.status.result.clone(),
                message: self.status.message.clone(),
            },
        }
    }

    fn convert_from(hub: &v1beta1::Math) -> Self {
        let variables = hub
            .spec
            .variables
            .iter()
            .map(|variable| {
                let value = if variable.is_numeric() {
                    variable.value.clone()
                } else {
                    UNSUPPORTED_VALUE.to_string()
                };
                (variable.name.clone(), value)
            })
            .collect();

        Self {
            metadata: hub.metadata.clone(),
            spec: MathSpec {
                expression: hub.spec.expression.clone(),
                variables,
            },
            status: MathStatus {
                result: hub.status.result.clone(),
                message: hub.status.message.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::v1beta1::INT;

    fn hub() -> v1beta1::Math {
        let mut math = v1beta1::Math::new("sum", "x + y + flag")
            .with_variable(Variable::float("x", "1.5"))
            .with_variable(Variable::new("y", "2", INT))
            .with_variable(Variable::new("flag", "true", "bool"));
        math.metadata.namespace = "team-a".into();
        math.metadata.resource_version = 42;
        math.status.result = "3.5".into();
        math.status.message = "OK".into();
        math
    }

    #[test]
    fn test_upgrade_tags_every_value_as_float() {
        let legacy = Math::new("sum", "a * b")
            .with_variable("a", "3")
            .with_variable("b", "not a number");
        let upgraded = legacy.convert_to();

        assert_eq!(upgraded.spec.expression, "a * b");
        assert_eq!(
            upgraded.spec.variables,
            vec![
                Variable::float("a", "3"),
                Variable::float("b", "not a number"),
            ]
        );
    }

    #[test]
    fn test_downgrade_zeroes_unsupported_types() {
        let legacy = Math::convert_from(&hub());
        assert_eq!(legacy.spec.variables["x"], "1.5");
        assert_eq!(legacy.spec.variables["y"], "2");
        assert_eq!(legacy.spec.variables["flag"], UNSUPPORTED_VALUE);
    }

    #[test]
    fn test_bool_variable_downgrades_to_zero() {
        let hub = v1beta1::Math::new("m", "x").with_variable(Variable::new("x", "5", "bool"));
        let legacy = Math::convert_from(&hub);
        assert_eq!(
            legacy.spec.variables,
            BTreeMap::from([("x".to_string(), "0".to_string())])
        );
    }

    #[test]
    fn test_round_trip_keeps_metadata_status_and_names() {
        let original = hub();
        let restored = Math::convert_from(&original).convert_to();

        assert_eq!(restored.metadata, original.metadata);
        assert_eq!(restored.status, original.status);
        assert_eq!(restored.spec.expression, original.spec.expression);

        let mut names: Vec<_> = restored.spec.variables.iter().map(|v| &v.name).collect();
        names.sort();
        assert_eq!(names, ["flag", "x", "y"]);

        for variable in &restored.spec.variables {
            assert_eq!(variable.ty, FLOAT);
            let before = original
                .spec
                .variables
                .iter()
                .find(|v| v.name == variable.name)
                .unwrap();
            if before.is_numeric() {
                assert_eq!(variable.value, before.value);
            } else {
                assert_eq!(variable.value, UNSUPPORTED_VALUE);
            }
        }
    }

    #[test]
    fn test_decodes_legacy_wire_form_through_the_scheme() {
        let scheme = crate::api::scheme();
        let hub = scheme
            .decode(serde_json::json!({
                "apiVersion": "math.example.com/v1alpha1",
                "kind": "Math",
                "metadata": { "name": "sum" },
                "spec": { "expression": "x + 1", "variables": { "x": "2" } }
            }))
            .unwrap();
        assert_eq!(hub.spec.variables, vec![Variable::float("x", "2")]);

        let legacy = scheme.encode(&hub, Math::API_VERSION).unwrap();
        assert_eq!(legacy["spec"]["variables"]["x"], "2");
        assert_eq!(legacy["apiVersion"], Math::API_VERSION);
    }
}
