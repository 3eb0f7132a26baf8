//! Private DNS server values
//!
//! - [`PrivateDnsServer`]: one configured DNS-over-TLS resolver
//! - [`ServerIdentity`]: the key a server is tracked under
//! - [`Validation`]: validation state of one server on one network
//! - [`PrivateDnsMode`]: the mode a network runs in

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::error::{Error, Result};

/// Well-known DNS-over-TLS port
pub const DOT_PORT: u16 = 853;

/// Validation state of a server on a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
    /// An attempt is running (or retrying) for the server
    InProcess,
    /// The last attempt accepted the server
    Success,
    /// The last attempt rejected the server
    Fail,
}

impl Validation {
    /// Whether this state ends an attempt
    pub fn is_terminal(self) -> bool {
        !matches!(self, Validation::InProcess)
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Validation::InProcess => "in_process",
            Validation::Success => "success",
            Validation::Fail => "fail",
        };
        f.write_str(s)
    }
}

/// Private DNS mode of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivateDnsMode {
    /// No private DNS servers configured
    #[default]
    Off,
    /// Use validated servers when available, fall back otherwise
    Opportunistic,
    /// A provider hostname is pinned; only that provider may be used
    Strict,
}

impl PrivateDnsMode {
    /// Derive the mode from a `set` call's arguments
    ///
    /// A provider hostname selects strict mode even before any address has
    /// been resolved for it.
    pub fn derive(provider_hostname: &str, server_count: usize) -> Self {
        if !provider_hostname.is_empty() {
            PrivateDnsMode::Strict
        } else if server_count > 0 {
            PrivateDnsMode::Opportunistic
        } else {
            PrivateDnsMode::Off
        }
    }
}

impl fmt::Display for PrivateDnsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrivateDnsMode::Off => "OFF",
            PrivateDnsMode::Opportunistic => "OPPORTUNISTIC",
            PrivateDnsMode::Strict => "STRICT",
        };
        f.write_str(s)
    }
}

/// A configured DNS-over-TLS server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateDnsServer {
    /// Server socket address
    pub address: SocketAddr,
    /// Provider hostname used for certificate verification (empty when opportunistic)
    pub provider_hostname: String,
    /// Socket mark probes are sent with
    pub mark: u32,
    /// PEM-encoded CA certificate pinned for this provider, if any
    pub ca_certificate: Option<String>,
}

impl PrivateDnsServer {
    /// Create a server with no provider hostname and no pinned certificate
    pub fn new(address: SocketAddr, mark: u32) -> Self {
        Self {
            address,
            provider_hostname: String::new(),
            mark,
            ca_certificate: None,
        }
    }

    /// Set the provider hostname
    pub fn with_provider_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.provider_hostname = hostname.into();
        self
    }

    /// Set the pinned CA certificate; an empty string clears it
    pub fn with_ca_certificate(mut self, pem: impl Into<String>) -> Self {
        let pem = pem.into();
        self.ca_certificate = if pem.is_empty() { None } else { Some(pem) };
        self
    }

    /// Identity this server is tracked under
    pub fn identity(&self) -> ServerIdentity {
        ServerIdentity::from(self)
    }

    /// Address text reported to observers
    pub fn ip_string(&self) -> String {
        self.address.ip().to_string()
    }
}

/// Key identifying a configured server
///
/// Two servers are the same server only when both the socket address and the
/// provider hostname match. The port is part of the address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerIdentity {
    address: SocketAddr,
    provider_hostname: String,
}

impl ServerIdentity {
    /// Create an identity from its parts
    pub fn new(address: SocketAddr, provider_hostname: impl Into<String>) -> Self {
        Self {
            address,
            provider_hostname: provider_hostname.into(),
        }
    }

    /// Socket address of the server
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Provider hostname of the server
    pub fn provider_hostname(&self) -> &str {
        &self.provider_hostname
    }
}

impl From<&PrivateDnsServer> for ServerIdentity {
    fn from(server: &PrivateDnsServer) -> Self {
        Self::new(server.address, server.provider_hostname.clone())
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.provider_hostname.is_empty() {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{} ({})", self.address, self.provider_hostname)
        }
    }
}

/// Parse a configured server address
///
/// Accepts a bare IP address (`"1.1.1.1"`, `"2606:4700::1111"`), which gets
/// `default_port`, or a full socket address (`"1.1.1.1:853"`, `"[::1]:853"`).
pub fn parse_server_address(input: &str, default_port: u16) -> Result<SocketAddr> {
    let trimmed = input.trim();
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }
    trimmed
        .parse::<SocketAddr>()
        .map_err(|_| Error::invalid_argument(format!("invalid server address: {:?}", input)))
}
