// # Source Provider Trait
//
// Defines the interface to the legacy registrar/DNS provider the domains are
// leaving. It is both the source of the record set and the registrar of
// record, so nameserver delegation and transfer unlocks go through it too.
//
// ## Implementations
//
// - `dnsmig-provider-dnsimple`: DNSimple API v2

use async_trait::async_trait;

/// A DNS record as held by the source provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    /// Provider record identifier
    pub id: String,
    /// Record type as reported by the provider (e.g. "MX", "URL")
    pub record_type: String,
    /// Name relative to the zone apex ("" for the apex)
    pub name: String,
    /// Record content
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Priority for MX/SRV records
    pub priority: Option<u16>,
}

impl SourceRecord {
    /// Create a record without priority
    pub fn new(
        record_type: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            record_type: record_type.into(),
            name: name.into(),
            content: content.into(),
            ttl: 3600,
            priority: None,
        }
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Trait for the source registrar/DNS provider
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Check that the configured credentials are accepted
    async fn authenticate(&self) -> Result<(), crate::Error>;

    /// List the full record set of a domain's zone
    async fn list_records(&self, domain: &str) -> Result<Vec<SourceRecord>, crate::Error>;

    /// Delegate the domain to the given nameservers at the registrar
    ///
    /// This is the live DNS cutover.
    async fn delegate(&self, domain: &str, nameservers: &[String]) -> Result<(), crate::Error>;

    /// Remove the registrar transfer lock
    async fn unlock_transfer(&self, domain: &str) -> Result<(), crate::Error>;

    /// Request the transfer authorization code (emailed to the registrant)
    async fn authorize_transfer_out(&self, domain: &str) -> Result<(), crate::Error>;

    /// Get the provider name (for logging)
    fn provider_name(&self) -> &'static str;
}
