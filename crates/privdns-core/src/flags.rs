// # Static Experiment Flags
//
// In-memory implementation of ExperimentFlags.
//
// ## Purpose
//
// Holds the three latency flags in atomics so they can be flipped at runtime
// from any thread, e.g. by an embedder that mirrors a remote experiment
// service, or by tests that change a flag while an attempt is backing off.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::traits::ExperimentFlags;

/// Default minimum latency threshold (ms)
pub const DEFAULT_MIN_LATENCY_THRESHOLD_MS: u64 = 500;

/// Default maximum latency threshold (ms)
pub const DEFAULT_MAX_LATENCY_THRESHOLD_MS: u64 = 2000;

/// In-memory experiment flags
///
/// # Example
///
/// ```rust
/// use privdns_core::flags::StaticFlags;
/// use privdns_core::traits::ExperimentFlags;
///
/// let flags = StaticFlags::new(true, 500, 1000);
/// assert!(flags.avoid_bad_private_dns());
///
/// flags.set_avoid_bad_private_dns(false);
/// assert!(!flags.avoid_bad_private_dns());
/// ```
#[derive(Debug)]
pub struct StaticFlags {
    avoid_bad_private_dns: AtomicBool,
    min_latency_threshold_ms: AtomicU64,
    max_latency_threshold_ms: AtomicU64,
}

impl StaticFlags {
    /// Create flags with explicit values
    pub fn new(avoid_bad_private_dns: bool, min_latency_ms: u64, max_latency_ms: u64) -> Self {
        Self {
            avoid_bad_private_dns: AtomicBool::new(avoid_bad_private_dns),
            min_latency_threshold_ms: AtomicU64::new(min_latency_ms),
            max_latency_threshold_ms: AtomicU64::new(max_latency_ms),
        }
    }

    /// Turn latency-aware validation on or off
    pub fn set_avoid_bad_private_dns(&self, enabled: bool) {
        self.avoid_bad_private_dns.store(enabled, Ordering::SeqCst);
    }

    /// Change both latency thresholds
    pub fn set_latency_thresholds_ms(&self, min_latency_ms: u64, max_latency_ms: u64) {
        self.min_latency_threshold_ms.store(min_latency_ms, Ordering::SeqCst);
        self.max_latency_threshold_ms.store(max_latency_ms, Ordering::SeqCst);
    }
}

impl Default for StaticFlags {
    fn default() -> Self {
        Self::new(
            false,
            DEFAULT_MIN_LATENCY_THRESHOLD_MS,
            DEFAULT_MAX_LATENCY_THRESHOLD_MS,
        )
    }
}

impl ExperimentFlags for StaticFlags {
    fn avoid_bad_private_dns(&self) -> bool {
        self.avoid_bad_private_dns.load(Ordering::SeqCst)
    }

    fn min_latency_threshold_ms(&self) -> u64 {
        self.min_latency_threshold_ms.load(Ordering::SeqCst)
    }

    fn max_latency_threshold_ms(&self) -> u64 {
        self.max_latency_threshold_ms.load(Ordering::SeqCst)
    }
}
