// # File Zone Store
//
// File-based implementation of ZoneStore with crash recovery.
//
// ## Purpose
//
// Carries zone IDs and nameservers from one step invocation to the next.
// Re-running add-zones consults it to avoid creating a zone twice.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "zones": {
//     "example.com": {
//       "zone_id": "023e105f4ecef8ad9ca31a8372d0c353",
//       "nameservers": ["ada.ns.cloudflare.com", "bob.ns.cloudflare.com"],
//       "created_at": "2025-01-09T12:00:00Z",
//       "pending_redirects": []
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::zone_store::{PendingRedirect, ZoneRecord, ZoneStore};

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

type Zones = BTreeMap<String, ZoneRecord>;

/// File-based zone store with crash recovery
///
/// Every mutation rewrites the whole document while holding the write lock,
/// so readers never observe a half-applied update and an interrupted run
/// leaves either the old or the new file on disk.
///
/// # Example
///
/// ```rust,no_run
/// use dnsmig_core::state::FileZoneStore;
/// use dnsmig_core::traits::{ZoneRecord, ZoneStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileZoneStore::new("dns-migration-state.json").await?;
///
///     let record = ZoneRecord::new(
///         "023e105f4ecef8ad9ca31a8372d0c353",
///         ["ada.ns.cloudflare.com".into(), "bob.ns.cloudflare.com".into()],
///     );
///     store.put_zone("example.com", &record).await?;
///
///     assert!(store.get_zone("example.com").await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileZoneStore {
    path: PathBuf,
    zones: RwLock<Zones>,
}

/// Serializable state file format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    zones: Zones,
}

impl FileZoneStore {
    /// Create or load a file zone store
    ///
    /// This will:
    /// 1. Try to load existing state file
    /// 2. If corruption detected, try to load from backup
    /// 3. If both fail, start with empty state
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let zones = Self::load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            zones: RwLock::new(zones),
        })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state from file with automatic recovery
    ///
    /// Only a corrupted document triggers recovery; an unreadable file is an
    /// error, since starting empty would make add-zones recreate zones.
    async fn load_state_with_recovery(path: &Path) -> Result<Zones, Error> {
        match Self::load_state(path).await {
            Ok(zones) => {
                tracing::debug!("Loaded state from file: {} zones", zones.len());
                Ok(zones)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "State file {} appears corrupted: {}. Attempting recovery from backup.",
                    path.display(),
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty state.");
                    return Ok(Zones::new());
                }

                match Self::load_state(&backup_path).await {
                    Ok(zones) => {
                        tracing::info!("Recovered state from backup: {} zones", zones.len());
                        if let Err(restore_err) = Self::restore_from_backup(path, &backup_path).await
                        {
                            tracing::error!(
                                "Failed to restore state file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(zones)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also corrupted: {}. Starting with empty state.",
                            backup_err
                        );
                        Ok(Zones::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Load state from file
    async fn load_state(path: &Path) -> Result<Zones, Error> {
        if !path.exists() {
            tracing::debug!("State file does not exist: {}", path.display());
            return Ok(Zones::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to read state file {}: {}",
                path.display(),
                e
            ))
        })?;

        let state_file: StateFileFormat = serde_json::from_str(&content)?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.zones)
    }

    /// Write state to file atomically
    ///
    /// Callers hold the write lock and pass the zones they just modified.
    async fn write_state(&self, zones: &Zones) -> Result<(), Error> {
        let state_file = StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            zones: zones.clone(),
        };

        let json = serde_json::to_string_pretty(&state_file)
            .map_err(|e| Error::state_store(format!("Failed to serialize state: {e}")))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    /// Restore state file from backup
    async fn restore_from_backup(path: &Path, backup_path: &Path) -> Result<(), Error> {
        fs::copy(backup_path, path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to restore from backup {} to {}: {}",
                backup_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!("Restored state file from backup");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl ZoneStore for FileZoneStore {
    async fn get_zone(&self, domain: &str) -> Result<Option<ZoneRecord>, Error> {
        Ok(self.zones.read().await.get(domain).cloned())
    }

    async fn put_zone(&self, domain: &str, record: &ZoneRecord) -> Result<(), Error> {
        let mut zones = self.zones.write().await;
        zones.insert(domain.to_string(), record.clone());
        self.write_state(&zones).await
    }

    async fn add_pending_redirect(
        &self,
        domain: &str,
        redirect: &PendingRedirect,
    ) -> Result<(), Error> {
        let mut zones = self.zones.write().await;
        let record = zones
            .get_mut(domain)
            .ok_or_else(|| Error::missing_zone(domain))?;
        match record
            .pending_redirects
            .iter_mut()
            .find(|r| r.host == redirect.host)
        {
            Some(existing) if existing == redirect => return Ok(()),
            Some(existing) => *existing = redirect.clone(),
            None => record.pending_redirects.push(redirect.clone()),
        }
        self.write_state(&zones).await
    }

    async fn list_domains(&self) -> Result<Vec<String>, Error> {
        Ok(self.zones.read().await.keys().cloned().collect())
    }
}
