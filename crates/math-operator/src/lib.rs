//! # Math Operator
//!
//! A declarative calculator built on `reconcile_framework`. Users submit `Math` objects
//! (an expression plus named variables) and the operator keeps each object's status
//! equal to the expression's value.
//!
//! ## Core Components
//!
//! - **[api]**: The `Math` kind in two versions, [`v1beta1`](api::v1beta1) (the hub) and
//!   [`v1alpha1`](api::v1alpha1) (legacy), with the conversions between them.
//! - **[evaluator]**: A pure expression evaluator over `f64` variables.
//! - **[controller]**: The [`MathReconciler`](controller::MathReconciler) that evaluates
//!   specs and writes statuses.
//! - **[clients]**: [`MathClient`](clients::MathClient), a type-safe wrapper over the
//!   store client.
//! - **[lifecycle]**: [`MathOperator`](lifecycle::MathOperator) starts and stops the
//!   store and the controller.
//! - **[config]**: Environment-driven [`OperatorConfig`](config::OperatorConfig).
//!
//! ## Testing
//!
//! See [`reconcile_framework::mock`] for utilities to test the reconciler without a store.

pub mod api;
pub mod clients;
pub mod config;
pub mod controller;
pub mod evaluator;
pub mod lifecycle;
