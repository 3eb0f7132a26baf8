// # Network Records
//
// Per-network configuration and the status snapshots handed out to callers.

use std::collections::HashMap;

use crate::server::{PrivateDnsMode, PrivateDnsServer, ServerIdentity, Validation};

/// Configuration and validation state of one network
#[derive(Debug, Clone)]
pub(crate) struct NetworkRecord {
    pub(crate) net_id: u32,
    /// Socket mark given to the last `set`
    pub(crate) mark: u32,
    /// Mode derived by the last `set`
    pub(crate) mode: PrivateDnsMode,
    pub(crate) servers: HashMap<ServerIdentity, ServerEntry>,
}

/// One configured server and its validation state
#[derive(Debug, Clone)]
pub(crate) struct ServerEntry {
    pub(crate) server: PrivateDnsServer,
    pub(crate) validation: Validation,
}

impl NetworkRecord {
    pub(crate) fn new(net_id: u32, mark: u32, mode: PrivateDnsMode) -> Self {
        Self {
            net_id,
            mark,
            mode,
            servers: HashMap::new(),
        }
    }

    pub(crate) fn status(&self) -> PrivateDnsStatus {
        PrivateDnsStatus {
            mode: self.mode,
            servers: self
                .servers
                .iter()
                .map(|(identity, entry)| (identity.clone(), entry.validation))
                .collect(),
        }
    }
}

/// Read-only snapshot of a network's private DNS state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivateDnsStatus {
    /// Current mode
    pub mode: PrivateDnsMode,
    /// Validation state of every configured server
    pub servers: HashMap<ServerIdentity, Validation>,
}

impl PrivateDnsStatus {
    /// State of one server, if configured
    pub fn validation(&self, identity: &ServerIdentity) -> Option<Validation> {
        self.servers.get(identity).copied()
    }

    /// Servers whose last validation succeeded, in address order
    pub fn validated_servers(&self) -> Vec<ServerIdentity> {
        let mut validated: Vec<_> = self
            .servers
            .iter()
            .filter(|(_, validation)| **validation == Validation::Success)
            .map(|(identity, _)| identity.clone())
            .collect();
        validated.sort();
        validated
    }

    /// Server states keyed by IP address text, as observers see them
    pub fn by_ip(&self) -> HashMap<String, Validation> {
        self.servers
            .iter()
            .map(|(identity, validation)| (identity.address().ip().to_string(), *validation))
            .collect()
    }
}

/// Difference applied by one `reconcile`
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Servers that were not configured before
    pub added: Vec<PrivateDnsServer>,
    /// Servers that are no longer configured
    pub removed: Vec<ServerIdentity>,
}
