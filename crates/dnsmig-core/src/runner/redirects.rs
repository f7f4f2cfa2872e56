//! create-redirects

use std::collections::BTreeMap;
use tracing::{error, info};

use super::{Migrator, Step, StepReport};
use crate::error::Result;
use crate::traits::RedirectRule;

impl Migrator {
    /// Create edge redirect rules
    ///
    /// Rules come from the configured redirects plus every pending redirect
    /// recorded by create-records. All rules of a zone are written in one
    /// call, which replaces the zone's previous rule set, so pending
    /// redirects stay recorded and are sent again on every run.
    pub async fn create_redirects(&self) -> Result<StepReport> {
        let mut report = StepReport::new(Step::CreateRedirects);
        let mut rules: BTreeMap<&str, Vec<RedirectRule>> = BTreeMap::new();

        for redirect in &self.config.redirects {
            push_unique(
                rules.entry(redirect.domain.as_str()).or_default(),
                RedirectRule::permanent(&redirect.source_host, &redirect.destination),
            );
        }

        for domain in &self.config.domains {
            if let Some(zone) = self.store.get_zone(domain).await? {
                for pending in &zone.pending_redirects {
                    push_unique(
                        rules.entry(domain.as_str()).or_default(),
                        RedirectRule::permanent(&pending.host, &pending.target),
                    );
                }
            }
        }

        if rules.is_empty() {
            info!("No redirects to create");
            return Ok(report);
        }

        for (domain, domain_rules) in rules {
            let Some(zone) = self.store.get_zone(domain).await? else {
                error!("{}: no zone ID recorded; run add-zones first", domain);
                report.missing_zone += 1;
                continue;
            };

            match self
                .target
                .put_redirect_rules(&zone.zone_id, &domain_rules)
                .await
            {
                Ok(()) => {
                    for rule in &domain_rules {
                        info!(
                            "{}: redirect {} -> {} ({})",
                            domain, rule.host, rule.destination, rule.status_code
                        );
                    }
                    report.created += domain_rules.len();
                }
                Err(e) => {
                    error!("{}: failed to create redirect rules: {}", domain, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

/// First rule for a host wins
fn push_unique(rules: &mut Vec<RedirectRule>, rule: RedirectRule) {
    if !rules.iter().any(|r| r.host == rule.host) {
        rules.push(rule);
    }
}
