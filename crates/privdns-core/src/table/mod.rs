// # Configuration Table
//
// Owns, per network id, the configured private DNS servers, the network's
// mode and each server's validation state.
//
// ## Locking
//
// All state sits behind one mutex and is only reachable through the
// operations below, each of which holds the lock for its whole duration and
// never across an await point. Probes run without it.
//
// ## In-Flight Slots
//
// Whether an attempt is running for (net_id, server) is tracked separately
// from the status map. A server removed while its attempt runs loses its
// status entry at once, but keeps its slot until the attempt ends, so adding
// it back does not start a second attempt.

pub mod record;

pub use record::{PrivateDnsStatus, Reconciliation};

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::server::{PrivateDnsMode, PrivateDnsServer, ServerIdentity, Validation};
use record::{NetworkRecord, ServerEntry};

/// Per-network configuration table
///
/// # Example
///
/// ```rust
/// use privdns_core::table::ConfigurationTable;
/// use privdns_core::{PrivateDnsMode, PrivateDnsServer, Validation};
///
/// let table = ConfigurationTable::new();
/// let server = PrivateDnsServer::new("127.0.2.2:853".parse().unwrap(), 30);
/// let identity = server.identity();
///
/// let diff = table.reconcile(30, 30, PrivateDnsMode::Opportunistic, vec![server]);
/// assert_eq!(diff.added.len(), 1);
///
/// assert!(table.try_mark_in_process(30, &identity));
/// assert!(!table.try_mark_in_process(30, &identity));
///
/// assert!(table.write_result(30, &identity, Validation::Success));
/// assert_eq!(table.snapshot(30).validation(&identity), Some(Validation::Success));
/// ```
#[derive(Debug, Default)]
pub struct ConfigurationTable {
    inner: Mutex<TableState>,
}

#[derive(Debug, Default)]
struct TableState {
    networks: HashMap<u32, NetworkRecord>,
    in_flight: HashSet<(u32, ServerIdentity)>,
}

impl ConfigurationTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TableState> {
        // Every operation leaves the state consistent before it can panic.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace a network's configured servers
    ///
    /// Servers already configured keep their validation state, with their
    /// value (mark, certificate) replaced. New servers start `InProcess`: the
    /// caller is expected to claim their slot and start an attempt. Duplicate
    /// identities in `servers` collapse into one entry.
    ///
    /// # Returns
    ///
    /// The servers added and the identities removed by this call
    pub fn reconcile(
        &self,
        net_id: u32,
        mark: u32,
        mode: PrivateDnsMode,
        servers: Vec<PrivateDnsServer>,
    ) -> Reconciliation {
        let mut state = self.state();
        let record = state
            .networks
            .entry(net_id)
            .or_insert_with(|| NetworkRecord::new(net_id, mark, mode));
        record.mark = mark;
        record.mode = mode;

        let mut previous = std::mem::take(&mut record.servers);
        let mut diff = Reconciliation::default();

        for server in servers {
            let identity = server.identity();
            if record.servers.contains_key(&identity) {
                continue;
            }
            let validation = match previous.remove(&identity) {
                Some(entry) => entry.validation,
                None => {
                    diff.added.push(server.clone());
                    Validation::InProcess
                }
            };
            record.servers.insert(identity, ServerEntry { server, validation });
        }

        diff.removed = previous.into_keys().collect();

        debug!(
            "Reconciled net {} ({}, mark {:#x}): {} added, {} removed, {} configured",
            record.net_id,
            record.mode,
            record.mark,
            diff.added.len(),
            diff.removed.len(),
            record.servers.len()
        );
        diff
    }

    /// Claim the in-flight slot for a server
    ///
    /// # Returns
    ///
    /// `true` if no attempt was running and the slot is now taken; the
    /// server's status (if configured) is then `InProcess`
    pub fn try_mark_in_process(&self, net_id: u32, identity: &ServerIdentity) -> bool {
        let mut state = self.state();
        if !state.in_flight.insert((net_id, identity.clone())) {
            return false;
        }
        if let Some(entry) = state
            .networks
            .get_mut(&net_id)
            .and_then(|record| record.servers.get_mut(identity))
        {
            entry.validation = Validation::InProcess;
        }
        true
    }

    /// Whether an attempt is running for a server
    pub fn is_in_flight(&self, net_id: u32, identity: &ServerIdentity) -> bool {
        self.state().in_flight.contains(&(net_id, identity.clone()))
    }

    /// Record a validation state
    ///
    /// A terminal state releases the server's in-flight slot whether or not
    /// the server is still configured.
    ///
    /// # Returns
    ///
    /// `true` if the server is still configured on the network and its state
    /// was written
    pub fn write_result(&self, net_id: u32, identity: &ServerIdentity, validation: Validation) -> bool {
        let mut state = self.state();
        if validation.is_terminal() {
            state.in_flight.remove(&(net_id, identity.clone()));
        }
        match state
            .networks
            .get_mut(&net_id)
            .and_then(|record| record.servers.get_mut(identity))
        {
            Some(entry) => {
                entry.validation = validation;
                true
            }
            None => false,
        }
    }

    /// Snapshot a network's mode and server states
    ///
    /// An unknown network reports `Off` with no servers.
    pub fn snapshot(&self, net_id: u32) -> PrivateDnsStatus {
        self.state()
            .networks
            .get(&net_id)
            .map(NetworkRecord::status)
            .unwrap_or_default()
    }

    /// Look up a configured server
    pub fn lookup(&self, identity: &ServerIdentity, net_id: u32) -> Option<PrivateDnsServer> {
        self.state()
            .networks
            .get(&net_id)
            .and_then(|record| record.servers.get(identity))
            .map(|entry| entry.server.clone())
    }

    /// Delete a network's record
    ///
    /// In-flight slots are kept: running attempts still own them.
    ///
    /// # Returns
    ///
    /// `true` if the network was known
    pub fn clear(&self, net_id: u32) -> bool {
        self.state().networks.remove(&net_id).is_some()
    }

    /// Number of networks with a record
    pub fn len(&self) -> usize {
        self.state().networks.len()
    }

    /// Whether no network has a record
    pub fn is_empty(&self) -> bool {
        self.state().networks.is_empty()
    }
}
