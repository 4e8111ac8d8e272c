//! Configuration structures.
//!
//! Configuration is loaded from JSON documents or environment variables; every
//! field has a default so partial documents are accepted.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::{Error, Result};

/// Global dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Argument binding and invocation settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Argument binding and invocation settings, fixed per registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Parse numbers and booleans out of strings, accept integral floats for
    /// integer parameters, and stringify scalars for string parameters.
    pub lenient_coercion: bool,

    /// Ignore named arguments that match no declared parameter instead of
    /// rejecting the call.
    pub allow_unknown_arguments: bool,

    /// Largest raw argument text accepted before parsing.
    pub max_raw_argument_bytes: usize,

    /// Calls taking longer than this are logged at warn level.
    #[serde(with = "humantime_serde")]
    pub slow_call_threshold: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            lenient_coercion: false,
            allow_unknown_arguments: false,
            max_raw_argument_bytes: 1024 * 1024,
            slow_call_threshold: Duration::from_secs(1),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Parse a JSON configuration document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::config(format!("invalid config: {}", e)))
    }

    /// Build configuration from `JEEVES_*` environment variables on top of defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(v) = lookup("JEEVES_DISPATCH_LENIENT") {
            config.dispatch.lenient_coercion = parse_flag("JEEVES_DISPATCH_LENIENT", &v)?;
        }
        if let Some(v) = lookup("JEEVES_DISPATCH_ALLOW_UNKNOWN_ARGS") {
            config.dispatch.allow_unknown_arguments =
                parse_flag("JEEVES_DISPATCH_ALLOW_UNKNOWN_ARGS", &v)?;
        }
        if let Some(v) = lookup("JEEVES_DISPATCH_MAX_ARG_BYTES") {
            config.dispatch.max_raw_argument_bytes = v.trim().parse().map_err(|_| {
                Error::config(format!("JEEVES_DISPATCH_MAX_ARG_BYTES: not a size: {}", v))
            })?;
        }
        if let Some(v) = lookup("JEEVES_DISPATCH_SLOW_CALL") {
            config.dispatch.slow_call_threshold = humantime::parse_duration(v.trim())
                .map_err(|e| Error::config(format!("JEEVES_DISPATCH_SLOW_CALL: {}", e)))?;
        }
        if let Some(v) = lookup("JEEVES_LOG_LEVEL") {
            config.observability.log_level = v;
        }
        if let Some(v) = lookup("JEEVES_LOG_FORMAT") {
            config.observability.json_logs = v.eq_ignore_ascii_case("json");
        }

        Ok(config)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config(format!("{}: expected boolean, got '{}'", key, other))),
    }
}
