// # Zone Store Trait
//
// Defines the interface for the migration's persistent state.
//
// ## Purpose
//
// Each step is usually a separate process invocation. The zone store is the
// only thing that carries zone IDs and nameservers from one step to the next:
// - add-zones writes one `ZoneRecord` per domain
// - every later step reads it
// - create-records / create-redirects hand pending redirects to each other
//
// Every mutation is a read-modify-write performed under the store's lock and
// persisted before the method returns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::traits::target_provider::Zone;

/// State kept for one migrated domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    /// Target provider zone identifier
    pub zone_id: String,
    /// Nameserver pair assigned by the target provider
    pub nameservers: [String; 2],
    /// When the record was written
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// URL records replaced by placeholders; each becomes a redirect rule
    #[serde(default)]
    pub pending_redirects: Vec<PendingRedirect>,
}

impl ZoneRecord {
    /// Create a new zone record
    pub fn new(zone_id: impl Into<String>, nameservers: [String; 2]) -> Self {
        Self {
            zone_id: zone_id.into(),
            nameservers,
            created_at: chrono::Utc::now(),
            pending_redirects: Vec::new(),
        }
    }

    /// Build a record from a provider zone
    ///
    /// Fails when the provider assigned fewer than two nameservers.
    pub fn from_zone(zone: &Zone) -> Result<Self, crate::Error> {
        match zone.name_servers.as_slice() {
            [first, second, ..] => Ok(Self::new(
                zone.id.clone(),
                [first.clone(), second.clone()],
            )),
            _ => Err(crate::Error::invalid_input(format!(
                "Zone {} has {} nameserver(s), expected at least 2",
                zone.name,
                zone.name_servers.len()
            ))),
        }
    }
}

/// A redirect derived from a source URL record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRedirect {
    /// Fully-qualified host of the replaced URL record
    pub host: String,
    /// Destination URL taken from the URL record
    pub target: String,
}

/// Trait for zone store implementations
#[async_trait]
pub trait ZoneStore: Send + Sync {
    /// Get the zone record for a domain
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ZoneRecord))`: The domain has a zone
    /// - `Ok(None)`: No zone recorded yet
    /// - `Err(Error)`: Storage error
    async fn get_zone(&self, domain: &str) -> Result<Option<ZoneRecord>, crate::Error>;

    /// Create or overwrite the zone record for a domain
    async fn put_zone(&self, domain: &str, record: &ZoneRecord) -> Result<(), crate::Error>;

    /// Record a pending redirect on a domain's zone record
    ///
    /// A redirect for a host already recorded replaces the earlier target.
    ///
    /// # Returns
    ///
    /// - `Err(Error::MissingZone)`: The domain has no zone record
    async fn add_pending_redirect(
        &self,
        domain: &str,
        redirect: &PendingRedirect,
    ) -> Result<(), crate::Error>;

    /// List all domains with a zone record
    async fn list_domains(&self) -> Result<Vec<String>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(name_servers: &[&str]) -> Zone {
        Zone {
            id: "zone-1".to_string(),
            name: "example.com".to_string(),
            status: "pending".to_string(),
            name_servers: name_servers.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn from_zone_takes_first_two_nameservers() {
        let record =
            ZoneRecord::from_zone(&zone(&["ada.ns.example", "bob.ns.example", "cy.ns.example"]))
                .unwrap();
        assert_eq!(record.zone_id, "zone-1");
        assert_eq!(record.nameservers, ["ada.ns.example", "bob.ns.example"]);
        assert!(record.pending_redirects.is_empty());
    }

    #[test]
    fn from_zone_needs_two_nameservers() {
        assert!(ZoneRecord::from_zone(&zone(&["ada.ns.example"])).is_err());
    }

    #[test]
    fn pending_redirects_default_when_absent() {
        let json = r#"{
            "zone_id": "z",
            "nameservers": ["a", "b"],
            "created_at": "2025-01-09T12:00:00Z"
        }"#;
        let record: ZoneRecord = serde_json::from_str(json).unwrap();
        assert!(record.pending_redirects.is_empty());
    }
}
