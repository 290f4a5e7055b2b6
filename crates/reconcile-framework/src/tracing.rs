//! # Tracing Setup
//!
//! Structured logging for every component built on the framework. The store, the
//! controller and reconcile attempts all log with a `kind` field, and each attempt runs
//! inside a `reconcile{kind, key}` span, so one object's history can be followed with a
//! plain grep on its key.
//!
//! ```bash
//! RUST_LOG=info cargo run                            # lifecycle and status changes
//! RUST_LOG=debug cargo run                           # every request and watch event
//! RUST_LOG=reconcile_framework=warn,info cargo run   # quiet framework, chatty app
//! ```
//!
//! Without `RUST_LOG` the filter defaults to `info`.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Call once, at the top of `main`.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false) // Spans and the `kind` field already say where a line came from
        .compact()
        .init();
}
