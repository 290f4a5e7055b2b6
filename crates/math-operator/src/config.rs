//! Configuration for the math operator.

use crate::api::v1beta1;
use anyhow::{bail, Context, Result};
use reconcile_framework::{BackoffPolicy, ControllerConfig, Versioned};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const PREFIX: &str = "MATH_OPERATOR_";

/// Operator configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorConfig {
    /// JSON file holding an array of `Math` manifests to submit at startup.
    pub manifests: Option<PathBuf>,

    /// API version the store persists objects in.
    pub storage_version: String,

    /// Upper bound on reconciles running at once.
    pub max_concurrent: usize,

    /// Retry delay after a key's first failure.
    pub backoff_base: Duration,

    /// Upper bound on any retry delay.
    pub backoff_max: Duration,

    /// Capacity of the store's request channel and watch buffer.
    pub channel_capacity: usize,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            manifests: None,
            storage_version: v1beta1::Math::API_VERSION.to_string(),
            max_concurrent: 4,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_secs(30),
            channel_capacity: 32,
        }
    }
}

impl OperatorConfig {
    /// Load configuration from `MATH_OPERATOR_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source. Unset variables take their
    /// defaults; set but malformed ones are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |suffix: &str| lookup(&format!("{PREFIX}{suffix}"));

        let manifests = var("MANIFESTS").map(PathBuf::from);
        let storage_version = var("STORAGE_VERSION").unwrap_or(defaults.storage_version);

        let max_concurrent = parse(&var, "MAX_CONCURRENT")?.unwrap_or(defaults.max_concurrent);
        let channel_capacity =
            parse(&var, "CHANNEL_CAPACITY")?.unwrap_or(defaults.channel_capacity);
        let backoff_base = parse(&var, "BACKOFF_BASE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.backoff_base);
        let backoff_max = parse(&var, "BACKOFF_MAX_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.backoff_max);

        if max_concurrent == 0 {
            bail!("{PREFIX}MAX_CONCURRENT must be at least 1");
        }
        if channel_capacity == 0 {
            bail!("{PREFIX}CHANNEL_CAPACITY must be at least 1");
        }
        if backoff_base > backoff_max {
            bail!("{PREFIX}BACKOFF_BASE_MS must not exceed {PREFIX}BACKOFF_MAX_MS");
        }

        Ok(Self {
            manifests,
            storage_version,
            max_concurrent,
            backoff_base,
            backoff_max,
            channel_capacity,
        })
    }

    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            max_concurrent_reconciles: self.max_concurrent,
            backoff: BackoffPolicy {
                base: self.backoff_base,
                max: self.backoff_max,
            },
        }
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, suffix: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(suffix)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("invalid {PREFIX}{suffix}: {raw:?}"))
        })
        .transpose()
}
