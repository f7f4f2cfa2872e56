// # Prober Trait
//
// Read-only diagnostics used by the verify step: DNS lookups through the
// public resolver path and plain HTTPS requests. None of these talk to a
// provider API.

use async_trait::async_trait;
use std::net::IpAddr;

/// Result of a single HTTP probe
///
/// Probing never fails with an `Err`; transport problems are outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered
    Status {
        /// HTTP status code
        code: u16,
        /// `Location` header, when present
        location: Option<String>,
    },
    /// No answer within the probe timeout
    Timeout,
    /// Connection, TLS or other transport failure
    Failed(String),
}

impl ProbeOutcome {
    /// Whether the endpoint answered with a 2xx or 3xx status
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Status { code, .. } if (200..400).contains(code))
    }
}

/// A mail exchanger as seen through DNS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailExchanger {
    /// MX preference
    pub preference: u16,
    /// Exchange host, without trailing dot
    pub exchange: String,
}

/// Trait for verification probes
#[async_trait]
pub trait Prober: Send + Sync {
    /// Resolve a host to its addresses
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, crate::Error>;

    /// Current NS records of a domain, without trailing dots
    async fn nameservers(&self, domain: &str) -> Result<Vec<String>, crate::Error>;

    /// Current MX records of a domain
    async fn mail_exchangers(&self, domain: &str) -> Result<Vec<MailExchanger>, crate::Error>;

    /// Request a URL once, without following redirects
    async fn probe(&self, url: &str) -> ProbeOutcome;
}
