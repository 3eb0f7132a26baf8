//! Private DNS validation engine
//!
//! The ValidationEngine is responsible for:
//! - Tracking the private DNS servers configured for every network
//! - Starting one validation attempt per newly configured server
//! - Allowing forced revalidation of a configured server
//! - Reporting every state transition to the registered observer
//!
//! ## Architecture
//!
//! ```text
//!   set / clear / request_validation
//!                 │
//!                 ▼
//!        ┌──────────────────┐        ┌────────────────────┐
//!        │ ValidationEngine │───────▶│ ConfigurationTable │
//!        └──────────────────┘        └────────────────────┘
//!                 │ spawn                       ▲
//!                 ▼                             │ write_result
//!        ┌──────────────────┐                   │
//!        │ValidationAttempt │───────────────────┘
//!        └──────────────────┘
//!           │            │
//!           ▼            ▼
//!     ┌──────────┐  ┌────────────────────┐
//!     │  Prober  │  │ ValidationObserver │
//!     └──────────┘  └────────────────────┘
//! ```
//!
//! ## Attempt Flow
//!
//! 1. Server added by `set` (or revalidation requested)
//! 2. In-flight slot claimed, observer told `in_process`
//! 3. Attempt task probes, the probe policy decides accept / retry / confirm / reject
//! 4. On retry or confirm: back off, tell the observer `in_process` again, probe again
//! 5. Terminal state written to the table if the server is still configured,
//!    observer told `success` or `fail` in every case
//!
//! Removing a server, switching the network off or clearing it never cancels a
//! running attempt; it only keeps the attempt's result out of the table.

mod attempt;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::policy::ProbePolicy;
use crate::server::{
    PrivateDnsMode, PrivateDnsServer, ServerIdentity, Validation, parse_server_address,
};
use crate::table::{ConfigurationTable, PrivateDnsStatus};
use crate::traits::{ExperimentFlags, Prober, ValidationObserver};
use attempt::{AttemptKind, ValidationAttempt};

/// Private DNS validation engine
///
/// ## Threading
///
/// The engine is cheap to clone; clones share the same table. Public
/// operations are synchronous and never wait on a probe. Validation attempts
/// run as tasks on the tokio runtime the engine was created in.
///
/// ## Ordering
///
/// Table transitions and the observer notifications that go with them are
/// serialized through one engine-wide gate, so for one server the observer
/// sees one attempt's terminal state before the next attempt's `in_process`.
/// The gate covers every server on every network: a slow observer delays all
/// notifications and blocks the thread that triggered them.
#[derive(Clone)]
pub struct ValidationEngine {
    shared: Arc<Shared>,
}

/// State shared between the engine and its attempt tasks
pub(crate) struct Shared {
    pub(crate) table: ConfigurationTable,
    pub(crate) prober: Arc<dyn Prober>,
    pub(crate) flags: Arc<dyn ExperimentFlags>,
    pub(crate) policy: ProbePolicy,
    pub(crate) config: EngineConfig,
    observer: RwLock<Option<Arc<dyn ValidationObserver>>>,
    /// Held across a table transition and its notification, engine-wide
    transitions: Mutex<()>,
    runtime: Handle,
}

impl Shared {
    pub(crate) fn transition(&self) -> MutexGuard<'_, ()> {
        self.transitions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn notify(&self, server: &str, validation: Validation, net_id: u32) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match observer {
            Some(observer) => observer.on_validation_state_update(server, validation, net_id),
            None => debug!("No observer registered, {} on net {} is {}", server, net_id, validation),
        }
    }
}

impl ValidationEngine {
    /// Create a new validation engine on the current tokio runtime
    ///
    /// # Parameters
    ///
    /// - `prober`: Probe implementation
    /// - `flags`: Experiment flag reader
    /// - `config`: Engine configuration
    ///
    /// # Returns
    ///
    /// - `Ok(ValidationEngine)`: Engine with no networks and no observer
    /// - `Err(Error)`: Invalid configuration, or called outside a tokio runtime
    pub fn new(
        prober: Arc<dyn Prober>,
        flags: Arc<dyn ExperimentFlags>,
        config: EngineConfig,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::runtime(format!("validation engine needs a tokio runtime: {}", e)))?;
        Self::with_runtime(prober, flags, config, runtime)
    }

    /// Create a new validation engine spawning attempts on `runtime`
    pub fn with_runtime(
        prober: Arc<dyn Prober>,
        flags: Arc<dyn ExperimentFlags>,
        config: EngineConfig,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;

        let shared = Shared {
            table: ConfigurationTable::new(),
            prober,
            flags,
            policy: ProbePolicy::new(config.max_attempts),
            config,
            observer: RwLock::new(None),
            transitions: Mutex::new(()),
            runtime,
        };

        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    /// Register the observer, replacing any previous one
    pub fn set_observer(&self, observer: Arc<dyn ValidationObserver>) {
        *self
            .shared
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    /// Configure the private DNS servers of a network
    ///
    /// Every address is parsed before anything changes; one bad address
    /// rejects the whole call. Servers already configured keep their state and
    /// running attempts; each new server gets a validation attempt. An empty
    /// list with no provider hostname switches the network off.
    ///
    /// # Parameters
    ///
    /// - `net_id`: Network id
    /// - `mark`: Socket mark probes are sent with
    /// - `servers`: Server addresses, bare IP (default port) or `ip:port`
    /// - `provider_hostname`: Provider hostname; non-empty selects strict mode
    /// - `ca_certificate`: PEM CA certificate to pin, or empty
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Configuration applied
    /// - `Err(Error::InvalidArgument)`: A server address did not parse
    pub fn set<S: AsRef<str>>(
        &self,
        net_id: u32,
        mark: u32,
        servers: &[S],
        provider_hostname: &str,
        ca_certificate: &str,
    ) -> Result<()> {
        let parsed = servers
            .iter()
            .map(|s| {
                parse_server_address(s.as_ref(), self.shared.config.default_port).map(|address| {
                    PrivateDnsServer::new(address, mark)
                        .with_provider_hostname(provider_hostname)
                        .with_ca_certificate(ca_certificate)
                })
            })
            .collect::<Result<Vec<_>>>()
            .inspect_err(|e| warn!("Rejected private DNS config for net {}: {}", net_id, e))?;

        let mode = PrivateDnsMode::derive(provider_hostname, parsed.len());
        info!("Setting private DNS on net {}: mode {}, {} servers", net_id, mode, parsed.len());

        let _transition = self.shared.transition();
        let diff = self.shared.table.reconcile(net_id, mark, mode, parsed);

        for identity in &diff.removed {
            debug!("Server {} removed from net {}", identity, net_id);
        }

        for server in diff.added {
            let identity = server.identity();
            if self.shared.table.try_mark_in_process(net_id, &identity) {
                self.start_attempt(net_id, server, AttemptKind::Initial);
            } else {
                debug!("Server {} re-added on net {} while still validating", identity, net_id);
            }
        }

        Ok(())
    }

    /// Delete a network's configuration
    ///
    /// Running attempts for the network finish and notify the observer, but
    /// their results are not recorded.
    pub fn clear(&self, net_id: u32) {
        let _transition = self.shared.transition();
        if self.shared.table.clear(net_id) {
            info!("Cleared private DNS configuration of net {}", net_id);
        }
    }

    /// Force a fresh validation of a configured server
    ///
    /// Allowed whatever the server's last result was, as long as no attempt
    /// is running for it. A revalidation also retries probes that fail
    /// outright, up to the attempt cap.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Attempt started
    /// - `Err(Error::NotFound)`: Server not configured on the network, or `mark` differs
    /// - `Err(Error::Conflict)`: An attempt is already running for the server
    pub fn request_validation(&self, net_id: u32, identity: &ServerIdentity, mark: u32) -> Result<()> {
        let _transition = self.shared.transition();

        let server = self
            .shared
            .table
            .lookup(identity, net_id)
            .ok_or_else(|| Error::not_found(format!("{} is not configured on net {}", identity, net_id)))?;

        if server.mark != mark {
            return Err(Error::not_found(format!(
                "{} on net {} uses mark {:#x}, not {:#x}",
                identity, net_id, server.mark, mark
            )));
        }

        if !self.shared.table.try_mark_in_process(net_id, identity) {
            return Err(Error::conflict(format!(
                "{} on net {} is already being validated",
                identity, net_id
            )));
        }

        info!("Revalidating {} on net {}", identity, net_id);
        self.start_attempt(net_id, server, AttemptKind::Revalidation);
        Ok(())
    }

    /// Snapshot a network's mode and server states
    pub fn get_status(&self, net_id: u32) -> PrivateDnsStatus {
        self.shared.table.snapshot(net_id)
    }

    /// Look up a configured server
    ///
    /// # Returns
    ///
    /// - `Ok(PrivateDnsServer)`: The server as last configured
    /// - `Err(Error::NotFound)`: Not configured on that network
    pub fn get_private_dns(&self, identity: &ServerIdentity, net_id: u32) -> Result<PrivateDnsServer> {
        self.shared
            .table
            .lookup(identity, net_id)
            .ok_or_else(|| Error::not_found(format!("{} is not configured on net {}", identity, net_id)))
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Announce and spawn an attempt whose in-flight slot is already claimed
    ///
    /// Must be called with the transition lock held.
    fn start_attempt(&self, net_id: u32, server: PrivateDnsServer, kind: AttemptKind) {
        self.shared.notify(&server.ip_string(), Validation::InProcess, net_id);

        let attempt = ValidationAttempt::new(Arc::clone(&self.shared), net_id, server, kind);
        self.shared.runtime.spawn(attempt.run());
    }
}

impl std::fmt::Debug for ValidationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("networks", &self.shared.table.len())
            .field("config", &self.shared.config)
            .finish()
    }
}
