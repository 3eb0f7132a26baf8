// # privdns-core
//
// Core library for private DNS (DNS-over-TLS) server validation.
//
// ## Architecture Overview
//
// For every network, the engine tracks the configured DNS-over-TLS servers,
// probes each one in the background and keeps a per-server validation state:
// - **ValidationEngine**: Public operations (`set`, `clear`, `request_validation`,
//   `get_status`, `get_private_dns`)
// - **ConfigurationTable**: Per-network servers, mode and validation state
// - **ProbePolicy**: Accept / retry / reject decision after every probe
// - **Prober**: Trait for running one probe (TLS and DNS live outside this crate)
// - **ExperimentFlags**: Trait for the latency experiment flags
// - **ValidationObserver**: Trait notified of every validation state transition
//
// ## Design Principles
//
// 1. **Asynchronous Results**: Configuration errors are returned, probe results only observed
// 2. **One Attempt per Server**: At most one validation runs per (network, server)
// 3. **No Cancellation**: Reconfiguration suppresses stale results instead of interrupting probes
// 4. **Bounded Attempts**: The attempt cap and backoff bound every validation
// 5. **Library-First**: No process-level logging setup, configuration files or CLI

pub mod traits;
pub mod engine;
pub mod table;
pub mod policy;
pub mod backoff;
pub mod server;
pub mod flags;
pub mod events;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{Prober, ExperimentFlags, ValidationObserver};
pub use engine::ValidationEngine;
pub use table::{ConfigurationTable, PrivateDnsStatus};
pub use policy::{Decision, ProbeOutcome, ProbePolicy};
pub use server::{PrivateDnsMode, PrivateDnsServer, ServerIdentity, Validation, DOT_PORT};
pub use flags::StaticFlags;
pub use events::{ChannelObserver, ValidationEvent};
pub use config::{BackoffConfig, EngineConfig, OPPORTUNISTIC_MODE_MAX_ATTEMPTS};
pub use error::{Error, Result};
