// # Validation Observer Trait
//
// Defines the interface notified of every validation state transition.
//
// ## Ordering
//
// For one (network, server) pair the observer sees exactly:
//
//   in_process, [in_process ...], success | fail
//
// and the terminal notification of one attempt always precedes the first
// notification of the next attempt for that pair. Calls never overlap, but no
// ordering is promised between different servers.

use crate::server::Validation;

/// Trait for validation observers
///
/// # Thread Safety
///
/// Called from validation tasks on any runtime worker, and from the thread
/// calling `set` or `request_validation`.
///
/// # Blocking
///
/// All calls are serialized by one engine-wide gate, across servers and
/// networks, and the calling thread (often a tokio worker) waits for the
/// callback to return. An implementation that blocks stalls every
/// validation. Hand work off (e.g. to a channel, see
/// [`ChannelObserver`](crate::events::ChannelObserver)) instead.
/// Reading [`ValidationEngine::get_status`](crate::ValidationEngine::get_status)
/// from the callback is allowed; calling `set`, `clear` or
/// `request_validation` from it deadlocks.
pub trait ValidationObserver: Send + Sync {
    /// A server changed state
    ///
    /// # Parameters
    ///
    /// - `server`: IP address of the server, without port
    /// - `validation`: New state
    /// - `net_id`: Network the server is validated on
    fn on_validation_state_update(&self, server: &str, validation: Validation, net_id: u32);
}
