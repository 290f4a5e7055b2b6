//! # Expression Evaluator
//!
//! A small, pure evaluator for arithmetic, relational and logical expressions over
//! named `f64` variables. See [`parser`] for the grammar.
//!
//! ```rust
//! use math_operator::evaluator::{evaluate, Value};
//! use std::collections::HashMap;
//!
//! let bindings = HashMap::from([("x".to_string(), 4.0)]);
//! assert_eq!(evaluate("3 * x + 7", &bindings), Ok(Value::Number(19.0)));
//! assert_eq!(evaluate("x > 3 && x < 5", &bindings), Ok(Value::Bool(true)));
//! ```
//!
//! Evaluation is deterministic. Arithmetic follows IEEE-754, so `1 / 0` is `inf` rather
//! than an error.

mod error;
pub mod lexer;
pub mod parser;

pub use error::EvaluationError;
pub use parser::{parse, BinaryOp, Expr, UnaryOp};

use crate::api::v1alpha1::UNSUPPORTED_VALUE;
use crate::api::v1beta1::Variable;
use std::collections::HashMap;
use std::fmt::{self, Display};

/// The result of an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Evaluates `expression` with the given variable bindings.
///
/// Every variable the expression mentions must be bound, even one that short-circuit
/// evaluation would never reach.
pub fn evaluate(
    expression: &str,
    bindings: &HashMap<String, f64>,
) -> Result<Value, EvaluationError> {
    let expr = parse(expression)?;
    if let Some(unbound) = expr
        .variables()
        .into_iter()
        .find(|name| !bindings.contains_key(*name))
    {
        return Err(EvaluationError::UnboundVariable(unbound.to_string()));
    }
    eval(&expr, bindings)
}

/// Parses typed variables into evaluator bindings.
///
/// Every value is read as a decimal `f64`, whatever its declared type. A non-numeric
/// type reads as `0`, the same value the legacy version stores for it, so the result
/// does not depend on which version an object was persisted in.
pub fn parse_bindings(variables: &[Variable]) -> Result<HashMap<String, f64>, EvaluationError> {
    let mut bindings = HashMap::with_capacity(variables.len());
    for variable in variables {
        let value = parse_variable(variable)?;
        if bindings.insert(variable.name.clone(), value).is_some() {
            return Err(EvaluationError::DuplicateVariable(variable.name.clone()));
        }
    }
    Ok(bindings)
}

fn parse_variable(variable: &Variable) -> Result<f64, EvaluationError> {
    let parse_error = |reason: String| EvaluationError::VariableParse {
        name: variable.name.clone(),
        reason,
    };

    let text = if variable.is_numeric() {
        variable.value.as_str()
    } else {
        UNSUPPORTED_VALUE
    };
    text.parse()
        .map_err(|_| parse_error(format!("\"{text}\" is not a number")))
}

fn eval(expr: &Expr, bindings: &HashMap<String, f64>) -> Result<Value, EvaluationError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Variable(name) => bindings
            .get(name)
            .map(|n| Value::Number(*n))
            .ok_or_else(|| EvaluationError::UnboundVariable(name.clone())),
        Expr::Unary(op, operand) => {
            let value = eval(operand, bindings)?;
            match (op, value) {
                (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOp::Neg, other) => Err(type_error("-", other)),
                (UnaryOp::Not, other) => Err(type_error("!", other)),
            }
        }
        Expr::Binary(op @ BinaryOp::And, left, right) => {
            let value = boolean(*op, left, bindings)? && boolean(*op, right, bindings)?;
            Ok(Value::Bool(value))
        }
        Expr::Binary(op @ BinaryOp::Or, left, right) => {
            let value = boolean(*op, left, bindings)? || boolean(*op, right, bindings)?;
            Ok(Value::Bool(value))
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, bindings)?;
            let right = eval(right, bindings)?;
            binary(*op, left, right)
        }
    }
}

fn boolean(
    op: BinaryOp,
    expr: &Expr,
    bindings: &HashMap<String, f64>,
) -> Result<bool, EvaluationError> {
    match eval(expr, bindings)? {
        Value::Bool(b) => Ok(b),
        other => Err(type_error(op.symbol(), other)),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvaluationError> {
    use Value::{Bool, Number};

    match (op, left, right) {
        (BinaryOp::Eq, Bool(a), Bool(b)) => Ok(Bool(a == b)),
        (BinaryOp::Ne, Bool(a), Bool(b)) => Ok(Bool(a != b)),
        (_, Number(a), Number(b)) => Ok(match op {
            BinaryOp::Add => Number(a + b),
            BinaryOp::Sub => Number(a - b),
            BinaryOp::Mul => Number(a * b),
            BinaryOp::Div => Number(a / b),
            BinaryOp::Rem => Number(a % b),
            BinaryOp::Pow => Number(a.powf(b)),
            BinaryOp::Lt => Bool(a < b),
            BinaryOp::Le => Bool(a <= b),
            BinaryOp::Gt => Bool(a > b),
            BinaryOp::Ge => Bool(a >= b),
            BinaryOp::Eq => Bool(a == b),
            BinaryOp::Ne => Bool(a != b),
            BinaryOp::And | BinaryOp::Or => return Err(type_error(op.symbol(), Number(a))),
        }),
        (_, left, right) => Err(EvaluationError::Type(format!(
            "cannot apply '{}' to {} and {}",
            op.symbol(),
            left.kind(),
            right.kind()
        ))),
    }
}

fn type_error(op: &str, value: Value) -> EvaluationError {
    EvaluationError::Type(format!("cannot apply '{op}' to {}", value.kind()))
}
