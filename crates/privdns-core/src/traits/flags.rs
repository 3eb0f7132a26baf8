// # Experiment Flags Trait
//
// Defines the interface for reading the latency experiment flags.
//
// ## Purpose
//
// Whether slow-but-reachable servers are avoided, and what counts as slow,
// is controlled by experiment flags that can change at runtime. The engine
// reads them after every probe, so a change reaches attempts that are already
// running between two probes.
//
// ## Implementations
//
// - In-memory: [`StaticFlags`](crate::flags::StaticFlags)
// - Platform property stores live outside this crate

/// Trait for experiment flag readers
///
/// Implementations must be cheap and non-blocking: they are called from
/// validation tasks.
pub trait ExperimentFlags: Send + Sync {
    /// Whether slow servers should be retried and eventually rejected
    fn avoid_bad_private_dns(&self) -> bool;

    /// Latency (ms) below which a server is accepted after a single probe
    fn min_latency_threshold_ms(&self) -> u64;

    /// Latency (ms) at or above which a server is considered too slow
    fn max_latency_threshold_ms(&self) -> u64;
}
