//! Validation attempt
//!
//! One attempt validates one server on one network. It owns the server's
//! in-flight slot from the moment it is spawned until its terminal state is
//! written, and runs:
//!
//! ```text
//! Probing ──accept──▶ Terminal(success)
//!    │ ▲  ──reject──▶ Terminal(fail)
//!  retry│
//! confirm in_process
//!    ▼ │
//! Backoff
//! ```
//!
//! An attempt dropped before reaching a terminal state (its task panicked or
//! its runtime shut down) ends as `fail`, so the slot is always released. The
//! observer is told, except when the drop happens while unwinding a panic.

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::Shared;
use crate::policy::{Decision, FlagSnapshot, ProbeOutcome};
use crate::server::{PrivateDnsServer, ServerIdentity, Validation};

/// Why an attempt was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttemptKind {
    /// Server newly configured by `set`
    Initial,
    /// Forced by `request_validation`
    Revalidation,
}

pub(crate) struct ValidationAttempt {
    shared: Arc<Shared>,
    net_id: u32,
    identity: ServerIdentity,
    server: PrivateDnsServer,
    kind: AttemptKind,
    finished: bool,
}

impl ValidationAttempt {
    pub(crate) fn new(
        shared: Arc<Shared>,
        net_id: u32,
        server: PrivateDnsServer,
        kind: AttemptKind,
    ) -> Self {
        Self {
            shared,
            net_id,
            identity: server.identity(),
            server,
            kind,
            finished: false,
        }
    }

    /// Probe until the policy reaches a terminal decision
    pub(crate) async fn run(mut self) {
        let mut backoff = self.shared.config.backoff.build();
        let mut attempt = 1;
        let mut confirming = false;

        loop {
            debug!(
                "Validating {} on net {} with mark {:#x} (probe {}, {:?})",
                self.identity, self.net_id, self.server.mark, attempt, self.kind
            );

            let started = Instant::now();
            let outcome = match self.shared.prober.probe(&self.server).await {
                Ok(()) => ProbeOutcome::Responded {
                    latency: started.elapsed(),
                },
                Err(e) => {
                    warn!("Probe {} of {} on net {} failed: {}", attempt, self.identity, self.net_id, e);
                    ProbeOutcome::Failed
                }
            };

            let flags = FlagSnapshot::read(self.shared.flags.as_ref());
            let decision = self.shared.policy.decide(
                outcome,
                attempt,
                &flags,
                self.kind == AttemptKind::Revalidation,
                confirming,
            );
            debug!(
                "Probe {} of {} on net {}: {:?} -> {:?}",
                attempt, self.identity, self.net_id, outcome, decision
            );

            match decision {
                Decision::Accept => return self.finish(Validation::Success),
                Decision::Reject => return self.finish(Validation::Fail),
                Decision::Retry | Decision::Confirm => {
                    confirming |= decision == Decision::Confirm;
                    let delay = backoff.next_delay();
                    debug!("Retrying {} on net {} in {:?}", self.identity, self.net_id, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    self.announce_retry();
                }
            }
        }
    }

    fn announce_retry(&self) {
        let _transition = self.shared.transition();
        self.shared
            .table
            .write_result(self.net_id, &self.identity, Validation::InProcess);
        self.shared
            .notify(&self.server.ip_string(), Validation::InProcess, self.net_id);
    }

    fn finish(&mut self, validation: Validation) {
        self.finished = true;
        let _transition = self.shared.transition();
        let recorded = self
            .shared
            .table
            .write_result(self.net_id, &self.identity, validation);

        if recorded {
            info!("Validation of {} on net {}: {}", self.identity, self.net_id, validation);
        } else {
            info!(
                "Validation of {} on net {}: {}, not recorded: server no longer configured",
                self.identity, self.net_id, validation
            );
        }

        self.shared
            .notify(&self.server.ip_string(), validation, self.net_id);
    }
}

impl Drop for ValidationAttempt {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(
            "Validation of {} on net {} abandoned before completing",
            self.identity, self.net_id
        );
        // No observer call while unwinding; only release the slot.
        if std::thread::panicking() {
            let _transition = self.shared.transition();
            self.shared
                .table
                .write_result(self.net_id, &self.identity, Validation::Fail);
            return;
        }
        self.finish(Validation::Fail);
    }
}
