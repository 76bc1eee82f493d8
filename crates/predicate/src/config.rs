//! Compiler configuration.
//!
//! Supports programmatic construction, serde (for embedding in a larger
//! server configuration file) and command line / environment parsing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PREDICATE_MAX_CHAIN_DEPTH` | 4 | Maximum forward chain hops |
//! | `PREDICATE_MAX_REVERSE_CHAIN_DEPTH` | 4 | Maximum `_has` hops |
//! | `PREDICATE_COLLAPSE_REFERENCE_SETS` | true | Run the reference-set rewrite |
//! | `PREDICATE_IDENTITY_CACHE_TTL` | 5m | Identity cache entry lifetime |
//! | `PREDICATE_APPROXIMATE_MARGIN` | 10 | `ap` margin for numbers and quantities (percent) |
//!
//! # Example
//!
//! ```rust
//! use helios_predicate::CompilerConfig;
//!
//! let config = CompilerConfig {
//!     max_chain_depth: 2,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::ffi::OsString;
use std::time::Duration;

use clap::{ArgAction, Parser};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A value could not be parsed from the arguments or environment.
    #[error("cannot parse compiler configuration: {0}")]
    Parse(String),

    /// Parsed values that fail validation.
    #[error("invalid compiler configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Configuration of the predicate compiler.
#[derive(Debug, Clone, PartialEq, Parser, Serialize, Deserialize)]
#[command(name = "predicate-compiler")]
#[command(about = "FHIR search predicate compiler")]
pub struct CompilerConfig {
    /// Maximum number of forward chain hops in one criterion.
    #[arg(long, env = "PREDICATE_MAX_CHAIN_DEPTH", default_value = "4")]
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,

    /// Maximum number of `_has` hops in one criterion.
    #[arg(long, env = "PREDICATE_MAX_REVERSE_CHAIN_DEPTH", default_value = "4")]
    #[serde(default = "default_max_chain_depth")]
    pub max_reverse_chain_depth: usize,

    /// Collapse same-shape reference equalities into one id-set test.
    #[arg(
        long,
        env = "PREDICATE_COLLAPSE_REFERENCE_SETS",
        default_value = "true",
        action = ArgAction::Set
    )]
    #[serde(default = "default_true")]
    pub collapse_reference_sets: bool,

    /// Lifetime of cached server identities.
    #[arg(
        long,
        env = "PREDICATE_IDENTITY_CACHE_TTL",
        default_value = "5m",
        value_parser = humantime::parse_duration
    )]
    #[serde(with = "humantime_serde", default = "default_identity_cache_ttl")]
    pub identity_cache_ttl: Duration,

    /// Width of the `ap` band for numbers and quantities, in percent of the value.
    #[arg(long, env = "PREDICATE_APPROXIMATE_MARGIN", default_value = "10")]
    #[serde(default = "default_approximate_margin")]
    pub approximate_margin_percent: u32,
}

fn default_max_chain_depth() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_identity_cache_ttl() -> Duration {
    Duration::from_secs(300)
}

fn default_approximate_margin() -> u32 {
    10
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_chain_depth: default_max_chain_depth(),
            max_reverse_chain_depth: default_max_chain_depth(),
            collapse_reference_sets: default_true(),
            identity_cache_ttl: default_identity_cache_ttl(),
            approximate_margin_percent: default_approximate_margin(),
        }
    }
}

impl CompilerConfig {
    /// Creates a configuration from environment variables only.
    ///
    /// Unparseable or invalid values are errors, never silently replaced by
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_args(["predicate-compiler"])
    }

    /// Parses command line style arguments, falling back to the environment
    /// and then to defaults, and validates the result.
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Self::try_parse_from(args).map_err(|e| {
            error!(error = %e, "Cannot parse compiler configuration");
            ConfigError::Parse(e.to_string())
        })?;
        config.validate().map_err(|errors| {
            for e in &errors {
                error!("Invalid configuration: {}", e);
            }
            ConfigError::Invalid(errors)
        })?;
        Ok(config)
    }

    /// The `ap` margin as a fraction (10% is 0.10).
    pub fn approximate_margin(&self) -> Decimal {
        Decimal::new(i64::from(self.approximate_margin_percent), 2)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.max_chain_depth == 0 {
            errors.push("Max chain depth cannot be 0".to_string());
        }

        if self.max_reverse_chain_depth == 0 {
            errors.push("Max reverse chain depth cannot be 0".to_string());
        }

        if self.identity_cache_ttl.is_zero() {
            errors.push("Identity cache TTL cannot be 0".to_string());
        }

        if self.approximate_margin_percent > 100 {
            errors.push("Approximate margin cannot exceed 100 percent".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
