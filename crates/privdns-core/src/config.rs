//! Configuration types for the validation engine
//!
//! Latency thresholds are not configured here: they are experiment flags read
//! through [`ExperimentFlags`](crate::traits::ExperimentFlags) on every probe.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backoff::Backoff;
use crate::server::DOT_PORT;

/// Maximum probes per attempt in opportunistic mode
pub const OPPORTUNISTIC_MODE_MAX_ATTEMPTS: u32 = 3;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of probes one validation attempt may run
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay schedule between probes of one attempt
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Port applied to server addresses given without one
    #[serde(default = "default_port")]
    pub default_port: u16,
}

impl EngineConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffConfig::default(),
            default_port: default_port(),
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_attempts == 0 {
            return Err(crate::Error::config("max_attempts must be >= 1"));
        }
        if self.default_port == 0 {
            return Err(crate::Error::config("default_port must be > 0"));
        }
        self.backoff.validate()
    }

    /// Set the maximum number of probes per attempt
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the first backoff delay
    pub fn with_initial_retransmission_time(mut self, delay: Duration) -> Self {
        self.backoff.initial_retransmission_ms = duration_ms(delay);
        self
    }

    /// Set the backoff cap
    pub fn with_maximum_retransmission_time(mut self, delay: Duration) -> Self {
        self.backoff.maximum_retransmission_ms = duration_ms(delay);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Backoff schedule configuration
///
/// Delays start at `initial_retransmission_ms` and are multiplied by
/// `multiplier` after every retry, capped at `maximum_retransmission_ms`.
/// A multiplier of 1.0 gives a constant schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// First delay (in milliseconds)
    #[serde(default = "default_initial_retransmission_ms")]
    pub initial_retransmission_ms: u64,

    /// Upper bound for any delay (in milliseconds)
    #[serde(default = "default_maximum_retransmission_ms")]
    pub maximum_retransmission_ms: u64,

    /// Growth factor applied after every delay
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl BackoffConfig {
    /// Validate the backoff configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.initial_retransmission_ms > self.maximum_retransmission_ms {
            return Err(crate::Error::config(
                "initial_retransmission_ms cannot exceed maximum_retransmission_ms",
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(crate::Error::config("backoff multiplier must be >= 1.0"));
        }
        Ok(())
    }

    /// Start a fresh delay sequence
    pub fn build(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.initial_retransmission_ms),
            Duration::from_millis(self.maximum_retransmission_ms),
            self.multiplier,
        )
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_retransmission_ms: default_initial_retransmission_ms(),
            maximum_retransmission_ms: default_maximum_retransmission_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn duration_ms(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

fn default_max_attempts() -> u32 {
    OPPORTUNISTIC_MODE_MAX_ATTEMPTS
}

fn default_port() -> u16 {
    DOT_PORT
}

fn default_initial_retransmission_ms() -> u64 {
    60_000
}

fn default_maximum_retransmission_ms() -> u64 {
    3_600_000
}

fn default_multiplier() -> f64 {
    2.0
}
