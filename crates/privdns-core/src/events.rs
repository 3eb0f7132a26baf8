//! Validation events
//!
//! [`ChannelObserver`] is a ready-made [`ValidationObserver`] that turns every
//! notification into a [`ValidationEvent`] and forwards it over a channel, so
//! consumers can process transitions on their own task:
//!
//! ```rust,no_run
//! use privdns_core::events::ChannelObserver;
//! use tokio_stream::StreamExt;
//!
//! # async fn demo(engine: privdns_core::ValidationEngine) {
//! let (observer, mut events) = ChannelObserver::new();
//! engine.set_observer(std::sync::Arc::new(observer));
//!
//! while let Some(event) = events.next().await {
//!     println!("{} on net {}: {}", event.server, event.net_id, event.validation);
//! }
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::warn;

use crate::server::Validation;
use crate::traits::ValidationObserver;

/// Stream of validation events
pub type ValidationEvents = UnboundedReceiverStream<ValidationEvent>;

/// A validation state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationEvent {
    /// IP address of the server
    pub server: String,
    /// New state
    pub validation: Validation,
    /// Network the server is validated on
    pub net_id: u32,
    /// When the transition was observed
    pub timestamp: DateTime<Utc>,
}

/// Observer forwarding every notification into a channel
///
/// The channel is unbounded: dropping events under load would break the
/// per-server ordering observers rely on.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ValidationEvent>,
}

impl ChannelObserver {
    /// Create an observer and the stream its events arrive on
    pub fn new() -> (Self, ValidationEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UnboundedReceiverStream::new(rx))
    }
}

impl ValidationObserver for ChannelObserver {
    fn on_validation_state_update(&self, server: &str, validation: Validation, net_id: u32) {
        let event = ValidationEvent {
            server: server.to_string(),
            validation,
            net_id,
            timestamp: Utc::now(),
        };
        if self.tx.send(event).is_err() {
            warn!("Validation event receiver dropped, discarding {} for {}", validation, server);
        }
    }
}
