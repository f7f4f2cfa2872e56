// # Target Provider Trait
//
// Defines the interface to the DNS provider the domains are moving to.
//
// ## Purpose
//
// The runner needs a small slice of the target's API:
// - Zone management (create, find by name, status)
// - Record management (list, delete, create)
// - Edge redirect rules
//
// ## Implementations
//
// - `dnsmig-provider-cloudflare`: Cloudflare API v4
//
// Providers are single-shot: one method call, one logical API operation
// (pagination aside). Retry is always manual; the operator re-runs the step.

use async_trait::async_trait;

use crate::records::RecordSpec;

/// A zone as reported by the target provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Provider zone identifier
    pub id: String,
    /// Zone apex (e.g. "example.com")
    pub name: String,
    /// Activation status (e.g. "pending", "active")
    pub status: String,
    /// Nameservers assigned to the zone, in provider order
    pub name_servers: Vec<String>,
}

/// A record currently present in a target zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRecord {
    /// Provider record identifier
    pub id: String,
    /// Record type (e.g. "A", "NS")
    pub record_type: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record content
    pub content: String,
}

impl TargetRecord {
    /// Whether the clearing pass must leave this record alone
    ///
    /// NS and SOA records belong to the zone itself.
    pub fn is_protected(&self) -> bool {
        matches!(self.record_type.to_ascii_uppercase().as_str(), "NS" | "SOA")
    }
}

/// A host-level redirect rule at the target's edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRule {
    /// Host to match (e.g. "blog.example.com")
    pub host: String,
    /// Absolute destination URL
    pub destination: String,
    /// HTTP status code of the redirect
    pub status_code: u16,
}

impl RedirectRule {
    /// Create a permanent (301) redirect rule
    pub fn permanent(host: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            destination: destination.into(),
            status_code: 301,
        }
    }
}

/// Trait for the target DNS provider
///
/// Methods are grouped as read-only (`authenticate`, `find_zone`, `get_zone`,
/// `list_records`) and mutating (`create_zone`, `delete_record`,
/// `create_record`, `put_redirect_rules`). The verify step only ever calls
/// read-only methods.
#[async_trait]
pub trait TargetProvider: Send + Sync {
    /// Check that the configured credentials are accepted
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Credentials are valid
    /// - `Err(Error::Authentication)`: Credentials were rejected
    async fn authenticate(&self) -> Result<(), crate::Error>;

    /// Create a zone for a domain
    ///
    /// # Returns
    ///
    /// - `Ok(Zone)`: The new zone with its assigned nameservers
    /// - `Err(Error::ZoneExists)`: The provider already has this zone
    /// - `Err(Error)`: Any other failure
    async fn create_zone(&self, domain: &str) -> Result<Zone, crate::Error>;

    /// Look up an existing zone by its apex name
    async fn find_zone(&self, domain: &str) -> Result<Zone, crate::Error>;

    /// Fetch a zone by identifier
    async fn get_zone(&self, zone_id: &str) -> Result<Zone, crate::Error>;

    /// List every record in a zone
    async fn list_records(&self, zone_id: &str) -> Result<Vec<TargetRecord>, crate::Error>;

    /// Delete one record from a zone
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), crate::Error>;

    /// Create a record in a zone, returning the new record ID
    async fn create_record(&self, zone_id: &str, record: &RecordSpec)
    -> Result<String, crate::Error>;

    /// Replace the zone's redirect rules with `rules`
    async fn put_redirect_rules(
        &self,
        zone_id: &str,
        rules: &[RedirectRule],
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging)
    fn provider_name(&self) -> &'static str;
}
