//! add-zones

use tracing::{debug, error, info, warn};

use super::{Migrator, Step, StepReport};
use crate::error::{Error, Result};
use crate::traits::{Zone, ZoneRecord};

impl Migrator {
    /// Create a target zone for every domain the store does not know yet
    ///
    /// Domains already in the store cause no provider call at all. When the
    /// target reports the zone as existing, the zone is adopted by name.
    pub async fn add_zones(&self) -> Result<StepReport> {
        let mut report = StepReport::new(Step::AddZones);

        for domain in &self.config.domains {
            if let Some(existing) = self.store.get_zone(domain).await? {
                debug!(
                    "{} already recorded as zone {}, skipping",
                    domain, existing.zone_id
                );
                report.existing += 1;
                continue;
            }

            let Some((zone, created)) = self.create_or_adopt_zone(domain).await else {
                report.failed += 1;
                continue;
            };

            let record = match ZoneRecord::from_zone(&zone) {
                Ok(record) => record,
                Err(e) => {
                    error!("{}: {}", domain, e);
                    report.failed += 1;
                    continue;
                }
            };

            self.store.put_zone(domain, &record).await?;
            if created {
                report.created += 1;
            } else {
                report.existing += 1;
            }

            info!(
                "{}: zone {} ({}), nameservers {} / {}",
                domain, record.zone_id, zone.status, record.nameservers[0], record.nameservers[1]
            );
        }

        Ok(report)
    }

    /// Returns the zone and whether it was newly created
    async fn create_or_adopt_zone(&self, domain: &str) -> Option<(Zone, bool)> {
        match self.target.create_zone(domain).await {
            Ok(zone) => {
                info!("{}: created zone on {}", domain, self.target.provider_name());
                Some((zone, true))
            }
            Err(Error::ZoneExists(_)) => {
                warn!("{}: zone already exists, fetching it", domain);
                match self.target.find_zone(domain).await {
                    Ok(zone) => Some((zone, false)),
                    Err(e) => {
                        error!("{}: failed to fetch existing zone: {}", domain, e);
                        None
                    }
                }
            }
            Err(e) => {
                error!("{}: failed to create zone: {}", domain, e);
                None
            }
        }
    }
}
