//! verify
//!
//! Read-only diagnostics. Only read methods of the target provider and the
//! prober are called; nothing is created, changed or deleted.

use std::net::IpAddr;
use tracing::{info, warn};

use super::{Migrator, Step, StepReport};
use crate::error::Result;
use crate::traits::{MailExchanger, ProbeOutcome};

/// Everything the verify step observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub domains: Vec<DomainCheck>,
    pub endpoints: Vec<EndpointCheck>,
    pub redirects: Vec<RedirectCheck>,
}

impl VerifyReport {
    /// Number of findings that need a look
    pub fn warning_count(&self) -> usize {
        let domain_problems: usize = self.domains.iter().map(|d| d.problems.len()).sum();
        let endpoint_problems = self
            .endpoints
            .iter()
            .filter(|e| !e.outcome.is_healthy())
            .count();
        let redirect_problems = self.redirects.iter().filter(|r| !r.matches).count();

        domain_problems + endpoint_problems + redirect_problems
    }
}

/// Per-domain observations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainCheck {
    pub domain: String,
    /// Whether the state store holds a zone for the domain
    pub zone_recorded: bool,
    /// Target zone status, when a zone is recorded and could be fetched
    pub zone_status: Option<String>,
    pub addresses: Vec<IpAddr>,
    pub nameservers: Vec<String>,
    pub mail_exchangers: Vec<MailExchanger>,
    /// Whether public DNS already lists both recorded nameservers
    pub delegated: bool,
    pub problems: Vec<String>,
}

/// One HTTPS endpoint probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCheck {
    pub url: String,
    pub outcome: ProbeOutcome,
}

/// One configured redirect, checked by its `Location` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectCheck {
    pub source_url: String,
    pub destination: String,
    pub outcome: ProbeOutcome,
    pub matches: bool,
}

impl Migrator {
    /// Run the verify step and summarize it as a [`StepReport`]
    pub async fn verify(&self) -> Result<StepReport> {
        let verify_report = self.verify_report().await?;
        let mut report = StepReport::new(Step::Verify);
        report.warnings = verify_report.warning_count();
        report.missing_zone = verify_report
            .domains
            .iter()
            .filter(|d| !d.zone_recorded)
            .count();
        Ok(report)
    }

    /// Collect zone status, DNS, endpoint and redirect observations
    pub async fn verify_report(&self) -> Result<VerifyReport> {
        let mut report = VerifyReport::default();

        for domain in &self.config.domains {
            report.domains.push(self.check_domain(domain).await?);
        }

        for url in &self.config.verify_endpoints {
            let outcome = self.prober.probe(url).await;
            match &outcome {
                ProbeOutcome::Status { code, .. } if outcome.is_healthy() => {
                    info!("{} -> {}", url, code);
                }
                ProbeOutcome::Status { code, .. } => warn!("{} -> {}", url, code),
                ProbeOutcome::Timeout => warn!("{} -> timed out", url),
                ProbeOutcome::Failed(e) => warn!("{} -> failed: {}", url, e),
            }
            report.endpoints.push(EndpointCheck {
                url: url.clone(),
                outcome,
            });
        }

        for redirect in &self.config.redirects {
            let source_url = redirect.source_url();
            let outcome = self.prober.probe(&source_url).await;
            let matches = redirect_matches(&outcome, &redirect.destination);
            if matches {
                info!("{} redirects to {}", source_url, redirect.destination);
            } else {
                warn!(
                    "{} does not redirect to {}: {:?}",
                    source_url, redirect.destination, outcome
                );
            }
            report.redirects.push(RedirectCheck {
                source_url,
                destination: redirect.destination.clone(),
                outcome,
                matches,
            });
        }

        Ok(report)
    }

    async fn check_domain(&self, domain: &str) -> Result<DomainCheck> {
        let mut check = DomainCheck {
            domain: domain.to_string(),
            zone_recorded: false,
            zone_status: None,
            addresses: Vec::new(),
            nameservers: Vec::new(),
            mail_exchangers: Vec::new(),
            delegated: false,
            problems: Vec::new(),
        };

        let zone = self.store.get_zone(domain).await?;
        match &zone {
            Some(zone) => match self.target.get_zone(&zone.zone_id).await {
                Ok(remote) => {
                    check.zone_recorded = true;
                    info!("{}: zone status {}", domain, remote.status);
                    if remote.status != "active" {
                        check
                            .problems
                            .push(format!("zone status is {}", remote.status));
                    }
                    check.zone_status = Some(remote.status);
                }
                Err(e) => {
                    check.zone_recorded = true;
                    check
                        .problems
                        .push(format!("zone status unavailable: {e}"));
                }
            },
            None => check.problems.push("no zone recorded".to_string()),
        }

        match self.prober.resolve(domain).await {
            Ok(addresses) if addresses.is_empty() => {
                check.problems.push("does not resolve".to_string());
            }
            Ok(addresses) => {
                info!("{}: resolves to {:?}", domain, addresses);
                check.addresses = addresses;
            }
            Err(e) => check.problems.push(format!("resolution failed: {e}")),
        }

        match self.prober.nameservers(domain).await {
            Ok(nameservers) => {
                info!("{}: NS {}", domain, nameservers.join(", "));
                check.nameservers = nameservers;
            }
            Err(e) => check.problems.push(format!("NS lookup failed: {e}")),
        }

        if let Some(zone) = &zone {
            check.delegated = zone.nameservers.iter().all(|expected| {
                check
                    .nameservers
                    .iter()
                    .any(|ns| ns.eq_ignore_ascii_case(expected))
            });
            if !check.delegated {
                info!(
                    "{}: not yet delegated to {} / {}",
                    domain, zone.nameservers[0], zone.nameservers[1]
                );
            }
        }

        match self.prober.mail_exchangers(domain).await {
            Ok(mx) => {
                for exchanger in &mx {
                    info!(
                        "{}: MX {} {}",
                        domain, exchanger.preference, exchanger.exchange
                    );
                }
                check.mail_exchangers = mx;
            }
            Err(e) => check.problems.push(format!("MX lookup failed: {e}")),
        }

        for problem in &check.problems {
            warn!("{}: {}", domain, problem);
        }

        Ok(check)
    }
}

fn redirect_matches(outcome: &ProbeOutcome, destination: &str) -> bool {
    match outcome {
        ProbeOutcome::Status {
            code,
            location: Some(location),
        } if (300..400).contains(code) => {
            location.trim_end_matches('/') == destination.trim_end_matches('/')
                || location.starts_with(destination)
        }
        _ => false,
    }
}
