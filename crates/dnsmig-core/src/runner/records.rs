//! create-records

use tracing::{debug, error, info, warn};

use super::{Migrator, Step, StepReport};
use crate::error::Result;
use crate::records::{self, RecordPlan, RecordSpec};
use crate::traits::ZoneRecord;

impl Migrator {
    /// Copy every domain's record set from the source to its target zone
    ///
    /// Per domain: clear the target zone (NS/SOA excepted), then recreate
    /// each source record through [`records::plan`]. A domain with no zone
    /// record gets no provider calls.
    pub async fn create_records(&self) -> Result<StepReport> {
        let mut report = StepReport::new(Step::CreateRecords);

        for domain in &self.config.domains {
            let Some(zone) = self.store.get_zone(domain).await? else {
                error!("{}: no zone ID recorded; run add-zones first", domain);
                report.missing_zone += 1;
                continue;
            };

            if !self.clear_zone(domain, &zone, &mut report).await {
                continue;
            }

            let source_records = match self.source.list_records(domain).await {
                Ok(records) => records,
                Err(e) => {
                    error!(
                        "{}: failed to list {} records: {}",
                        domain,
                        self.source.provider_name(),
                        e
                    );
                    report.failed += 1;
                    continue;
                }
            };
            info!("{}: {} source records", domain, source_records.len());

            for record in &source_records {
                match records::plan(domain, record) {
                    RecordPlan::Create(spec) => {
                        self.create_one(domain, &zone, &spec, &mut report).await;
                    }
                    RecordPlan::Placeholder { record: spec, redirect } => {
                        if self.create_one(domain, &zone, &spec, &mut report).await {
                            self.store.add_pending_redirect(domain, &redirect).await?;
                            report.pending_redirects += 1;
                            warn!(
                                "{}: {} is a URL record; placeholder created, run create-redirects for -> {}",
                                domain, redirect.host, redirect.target
                            );
                        }
                    }
                    RecordPlan::Skip { record_type } => {
                        warn!(
                            "{}: skipping unsupported {} record {:?}",
                            domain, record_type, record.name
                        );
                        report.skipped += 1;
                    }
                    RecordPlan::Invalid { reason } => {
                        warn!("{}: {}", domain, reason);
                        report.failed += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    /// Remove auto-imported records; returns false if the zone could not be listed
    async fn clear_zone(&self, domain: &str, zone: &ZoneRecord, report: &mut StepReport) -> bool {
        let existing = match self.target.list_records(&zone.zone_id).await {
            Ok(records) => records,
            Err(e) => {
                error!("{}: failed to list target records: {}", domain, e);
                report.failed += 1;
                return false;
            }
        };

        for record in existing.iter().filter(|r| !r.is_protected()) {
            match self.target.delete_record(&zone.zone_id, &record.id).await {
                Ok(()) => {
                    debug!(
                        "{}: deleted {} {}",
                        domain, record.record_type, record.name
                    );
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!(
                        "{}: failed to delete {} {}: {}",
                        domain, record.record_type, record.name, e
                    );
                    report.failed += 1;
                }
            }
        }

        true
    }

    async fn create_one(
        &self,
        domain: &str,
        zone: &ZoneRecord,
        spec: &RecordSpec,
        report: &mut StepReport,
    ) -> bool {
        match self.target.create_record(&zone.zone_id, spec).await {
            Ok(id) => {
                debug!(
                    "{}: created {} {} ({})",
                    domain,
                    spec.record_type(),
                    spec.name(),
                    id
                );
                report.created += 1;
                true
            }
            Err(e) => {
                warn!(
                    "{}: failed to create {} {}: {}",
                    domain,
                    spec.record_type(),
                    spec.name(),
                    e
                );
                report.failed += 1;
                false
            }
        }
    }
}
