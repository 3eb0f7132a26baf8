// # Prober Trait
//
// Defines the interface for probing one DNS-over-TLS server.
//
// ## Implementations
//
// The TLS handshake and DNS exchange live outside this crate. Tests use
// scripted probers that sleep for a configured latency.
//
// ## Usage
//
// ```rust,ignore
// use privdns_core::Prober;
//
// let prober = /* Prober implementation */;
// match prober.probe(&server).await {
//     Ok(()) => println!("{} answered", server.address),
//     Err(e) => println!("{} unreachable: {}", server.address, e),
// }
// ```

use async_trait::async_trait;

use crate::server::PrivateDnsServer;

/// Trait for DNS-over-TLS probe implementations
///
/// One call is one probe: connect to `server.address` with `server.mark`,
/// verify the certificate against `server.provider_hostname` and
/// `server.ca_certificate` when set, send a query and wait for the answer.
///
/// # Thread Safety
///
/// Implementations must be thread-safe: the engine probes different servers
/// from concurrent tasks.
///
/// # No Retry Logic
///
/// A probe may block for as long as the network makes it, but it must not
/// retry on its own. Retries, backoff and the attempt cap are owned by the
/// engine's probe policy; the engine also measures the probe's latency.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe a server once
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The server answered
    /// - `Err(Error)`: Connection, handshake or query failure
    async fn probe(&self, server: &PrivateDnsServer) -> Result<(), crate::Error>;
}
