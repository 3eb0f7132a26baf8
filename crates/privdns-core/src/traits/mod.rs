//! Core traits for private DNS validation
//!
//! This module defines the seams between the engine and its collaborators.
//!
//! - [`Prober`]: Run one DNS-over-TLS probe against a server
//! - [`ExperimentFlags`]: Read the latency experiment flags
//! - [`ValidationObserver`]: Receive validation state transitions

pub mod prober;
pub mod flags;
pub mod observer;

pub use prober::Prober;
pub use flags::ExperimentFlags;
pub use observer::ValidationObserver;
