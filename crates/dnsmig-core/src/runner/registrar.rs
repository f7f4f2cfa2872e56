//! switch-ns and unlock
//!
//! Both steps act on the registrar of record and cannot be undone from here,
//! so every domain goes through the confirmation port first.

use tracing::{error, info, warn};

use super::{Migrator, Step, StepReport};
use crate::error::Result;

impl Migrator {
    /// Delegate each domain to its recorded target nameservers
    pub async fn switch_ns(&self) -> Result<StepReport> {
        let mut report = StepReport::new(Step::SwitchNs);

        for domain in &self.config.domains {
            let Some(zone) = self.store.get_zone(domain).await? else {
                error!("{}: no nameservers recorded; run add-zones first", domain);
                report.missing_zone += 1;
                continue;
            };
            let [first, second] = &zone.nameservers;

            let prompt = format!(
                "Switch {domain} to nameservers {first} and {second}? This is the live DNS cutover."
            );
            if !self.confirm.confirm(&prompt)? {
                warn!("{}: nameserver switch declined", domain);
                report.declined += 1;
                continue;
            }

            match self.source.delegate(domain, &zone.nameservers).await {
                Ok(()) => {
                    info!("{}: delegated to {} / {}", domain, first, second);
                    report.updated += 1;
                }
                Err(e) => {
                    error!("{}: failed to switch nameservers: {}", domain, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Unlock each domain for transfer and request its auth code
    ///
    /// Covers the migrated domains and the unlock-only ones.
    pub async fn unlock(&self) -> Result<StepReport> {
        let mut report = StepReport::new(Step::Unlock);

        for domain in self.config.unlock_domains() {
            let prompt = format!(
                "Unlock {domain} for transfer and email its authorization code?"
            );
            if !self.confirm.confirm(&prompt)? {
                warn!("{}: unlock declined", domain);
                report.declined += 1;
                continue;
            }

            if let Err(e) = self.source.unlock_transfer(domain).await {
                error!("{}: failed to remove transfer lock: {}", domain, e);
                report.failed += 1;
                continue;
            }

            match self.source.authorize_transfer_out(domain).await {
                Ok(()) => {
                    info!(
                        "{}: unlocked, authorization code sent to the registrant",
                        domain
                    );
                    report.updated += 1;
                }
                Err(e) => {
                    error!(
                        "{}: unlocked, but requesting the authorization code failed: {}",
                        domain, e
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}
