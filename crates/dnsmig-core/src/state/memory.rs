// # Memory Zone Store
//
// In-memory implementation of ZoneStore.
//
// ## Purpose
//
// Nothing survives the process, so this only suits a single `all` run or
// tests. Re-running add-zones in a new process with this store would fall
// back to zone lookups for every domain.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::zone_store::{PendingRedirect, ZoneRecord, ZoneStore};

/// In-memory zone store implementation
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryZoneStore {
    inner: Arc<RwLock<BTreeMap<String, ZoneRecord>>>,
}

impl MemoryZoneStore {
    /// Create a new empty memory zone store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of zones in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl ZoneStore for MemoryZoneStore {
    async fn get_zone(&self, domain: &str) -> Result<Option<ZoneRecord>, Error> {
        Ok(self.inner.read().await.get(domain).cloned())
    }

    async fn put_zone(&self, domain: &str, record: &ZoneRecord) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .insert(domain.to_string(), record.clone());
        Ok(())
    }

    async fn add_pending_redirect(
        &self,
        domain: &str,
        redirect: &PendingRedirect,
    ) -> Result<(), Error> {
        let mut zones = self.inner.write().await;
        let record = zones
            .get_mut(domain)
            .ok_or_else(|| Error::missing_zone(domain))?;
        match record
            .pending_redirects
            .iter_mut()
            .find(|r| r.host == redirect.host)
        {
            Some(existing) => *existing = redirect.clone(),
            None => record.pending_redirects.push(redirect.clone()),
        }
        Ok(())
    }

    async fn list_domains(&self) -> Result<Vec<String>, Error> {
        Ok(self.inner.read().await.keys().cloned().collect())
    }
}
