//! `math.example.com/v1beta1`, the hub version of `Math`.

use reconcile_framework::{Hub, ObjectMeta, Versioned};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Type tag for decimal values.
pub const FLOAT: &str = "float";

/// Type tag for integral values.
pub const INT: &str = "int";

/// A named input to the expression. `value` is always text; `ty` says how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ty: ty.into(),
        }
    }

    pub fn float(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, FLOAT)
    }

    /// True for the types the legacy version can carry.
    pub fn is_numeric(&self) -> bool {
        self.ty == FLOAT || self.ty == INT
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MathSpec {
    pub expression: String,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathStatus {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub message: String,
}

/// A declared expression and the controller's last evaluation of it.
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
                variables: Vec::new(),
            },
            status: MathStatus::default(),
        }
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.spec.variables.push(variable);
        self
    }

    /// The first variable name that appears more than once, if any.
    pub fn duplicate_variable(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.spec
            .variables
            .iter()
            .map(|v| v.name.as_str())
            .find(|name| !seen.insert(*name))
    }
}

impl Versioned for Math {
    const API_VERSION: &'static str = "math.example.com/v1beta1";
    const KIND: &'static str = "Math";
}

impl Hub for Math {
    type Status = MathStatus;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn status(&self) -> &MathStatus {
        &self.status
    }

    fn set_status(&mut self, status: MathStatus) {
        self.status = status;
    }

    fn validate(&self) -> Result<(), String> {
        match self.duplicate_variable() {
            Some(name) => Err(format!("duplicate variable name \"{name}\"")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_variable_type_is_named_type_on_the_wire() {
        let value = serde_json::to_value(Variable::float("x", "4")).unwrap();
        assert_eq!(value, json!({ "name": "x", "value": "4", "type": "float" }));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let math = Math::new("m", "x + x")
            .with_variable(Variable::float("x", "1"))
            .with_variable(Variable::new("x", "2", INT));
        assert_eq!(math.duplicate_variable(), Some("x"));
        assert!(math.validate().unwrap_err().contains("\"x\""));

        let ok = Math::new("m", "x").with_variable(Variable::float("x", "1"));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_missing_spec_fields_default() {
        let math: Math = serde_json::from_value(json!({
            "metadata": { "name": "m" },
            "spec": { "expression": "1 + 1" }
        }))
        .unwrap();
        assert!(math.spec.variables.is_empty());
        assert_eq!(math.status, MathStatus::default());
    }
}
