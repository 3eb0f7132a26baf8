//! Probe policy
//!
//! Pure decision logic run after every probe of a validation attempt. It owns
//! no state: the attempt passes in its probe number, a fresh snapshot of the
//! experiment flags, whether it is a forced revalidation and whether the
//! probe is the confirmation of a mid-range latency.
//!
//! ## Decision Table
//!
//! For a probe that got an answer:
//!
//! | avoid_bad_private_dns | latency            | decision                                  |
//! |-----------------------|--------------------|-------------------------------------------|
//! | off                   | any                | accept                                    |
//! | on                    | `< min`            | accept                                    |
//! | on                    | `[min, max)`       | confirm                                   |
//! | on                    | `>= max`           | retry until `max_attempts`, then reject   |
//!
//! A confirmation probe that got an answer is accepted whatever its latency.
//! A probe that got no answer is rejected at once, except in a revalidation,
//! which retries until `max_attempts`.

use std::time::Duration;

use crate::traits::ExperimentFlags;

/// Probes needed to confirm a mid-range latency
const CONFIRMATION_PROBES: u32 = 2;

/// Outcome of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered after `latency`
    Responded {
        /// Wall-clock duration of the probe
        latency: Duration,
    },
    /// Connection refused, timeout or handshake failure
    Failed,
}

/// What the attempt does next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Terminal success
    Accept,
    /// Back off and probe again
    Retry,
    /// Back off and run one confirmation probe, accepted if answered
    Confirm,
    /// Terminal failure
    Reject,
}

/// Flag values in effect for one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSnapshot {
    /// Latency-aware rejection of slow servers
    pub avoid_bad_private_dns: bool,
    /// Below this, a server is accepted after one probe
    pub min_latency_threshold: Duration,
    /// At or above this, a server is considered too slow
    pub max_latency_threshold: Duration,
}

impl FlagSnapshot {
    /// Read the current flag values
    pub fn read(flags: &dyn ExperimentFlags) -> Self {
        Self {
            avoid_bad_private_dns: flags.avoid_bad_private_dns(),
            min_latency_threshold: Duration::from_millis(flags.min_latency_threshold_ms()),
            max_latency_threshold: Duration::from_millis(flags.max_latency_threshold_ms()),
        }
    }
}

/// Retry policy for validation attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    max_attempts: u32,
}

impl ProbePolicy {
    /// Create a policy allowing at most `max_attempts` probes per attempt
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Maximum probes per attempt
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide what follows probe number `attempt` (1-based)
    ///
    /// `confirming` is set for the probe following a [`Decision::Confirm`].
    pub fn decide(
        &self,
        outcome: ProbeOutcome,
        attempt: u32,
        flags: &FlagSnapshot,
        revalidation: bool,
        confirming: bool,
    ) -> Decision {
        let latency = match outcome {
            ProbeOutcome::Responded { latency } => latency,
            ProbeOutcome::Failed if revalidation && attempt < self.max_attempts => {
                return Decision::Retry;
            }
            ProbeOutcome::Failed => return Decision::Reject,
        };

        if confirming || !flags.avoid_bad_private_dns || latency < flags.min_latency_threshold {
            return Decision::Accept;
        }

        if latency < flags.max_latency_threshold {
            if attempt < CONFIRMATION_PROBES.min(self.max_attempts) {
                Decision::Confirm
            } else {
                Decision::Accept
            }
        } else if attempt < self.max_attempts {
            Decision::Retry
        } else {
            Decision::Reject
        }
    }
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self::new(crate::config::OPPORTUNISTIC_MODE_MAX_ATTEMPTS)
    }
}
