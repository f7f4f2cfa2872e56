//! Migration runner
//!
//! The [`Migrator`] executes one named step at a time against the source and
//! target providers, reading and writing the zone store between steps.
//!
//! ## Steps
//!
//! ```text
//! add-zones ─▶ create-records ─▶ create-redirects ─▶ switch-ns ─▶ verify ─▶ unlock
//!     │               │                  ▲               │
//!     └── ZoneStore ──┴─ pending ────────┘               └─ live cutover
//!                        redirects
//! ```
//!
//! Every step is safe to re-run. Only switch-ns and unlock have effects that
//! are hard to undo, and both ask the [`Confirm`] port per domain.
//!
//! ## Failure handling
//!
//! - Credential rejection during [`Migrator::preflight`] is fatal
//! - Provider errors for one record or domain are logged and counted; the
//!   step moves on to the next one
//! - A domain without a zone record is reported and skipped
//! - Zone store and confirmation errors abort the step

mod records;
mod redirects;
mod registrar;
mod verify;
mod zones;

pub use verify::{DomainCheck, EndpointCheck, RedirectCheck, VerifyReport};

use std::fmt;
use std::str::FromStr;

use crate::config::MigrationConfig;
use crate::error::{Error, Result};
use crate::traits::{Confirm, Prober, SourceProvider, TargetProvider, ZoneStore};
use tracing::info;

/// A named migration step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    AddZones,
    CreateRecords,
    CreateRedirects,
    SwitchNs,
    Verify,
    Unlock,
    /// Every step above, in order
    All,
}

impl Step {
    /// Order in which `all` runs the steps
    pub const SEQUENCE: [Step; 6] = [
        Step::AddZones,
        Step::CreateRecords,
        Step::CreateRedirects,
        Step::SwitchNs,
        Step::Verify,
        Step::Unlock,
    ];

    /// Command-line name of the step
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::AddZones => "add-zones",
            Step::CreateRecords => "create-records",
            Step::CreateRedirects => "create-redirects",
            Step::SwitchNs => "switch-ns",
            Step::Verify => "verify",
            Step::Unlock => "unlock",
            Step::All => "all",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add-zones" => Ok(Step::AddZones),
            "create-records" => Ok(Step::CreateRecords),
            "create-redirects" => Ok(Step::CreateRedirects),
            "switch-ns" => Ok(Step::SwitchNs),
            "verify" => Ok(Step::Verify),
            "unlock" => Ok(Step::Unlock),
            "all" => Ok(Step::All),
            other => Err(Error::invalid_input(format!("Unknown step: {other}"))),
        }
    }
}

/// Counters for one executed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: Step,
    /// Resources created (zones, records, redirect rules)
    pub created: usize,
    /// Resources that were already there
    pub existing: usize,
    /// Registrar changes applied (delegations, unlocks)
    pub updated: usize,
    /// Records removed from the target
    pub deleted: usize,
    /// Records with no transformation rule
    pub skipped: usize,
    /// Per-resource failures
    pub failed: usize,
    /// Confirmations answered with no
    pub declined: usize,
    /// Domains with no zone record
    pub missing_zone: usize,
    /// Placeholders waiting for create-redirects
    pub pending_redirects: usize,
    /// Verification findings
    pub warnings: usize,
}

impl StepReport {
    /// Create an empty report
    pub fn new(step: Step) -> Self {
        Self {
            step,
            created: 0,
            existing: 0,
            updated: 0,
            deleted: 0,
            skipped: 0,
            failed: 0,
            declined: 0,
            missing_zone: 0,
            pending_redirects: 0,
            warnings: 0,
        }
    }

    /// Whether anything needs the operator's attention
    pub fn has_problems(&self) -> bool {
        self.failed > 0 || self.missing_zone > 0 || self.warnings > 0
    }
}

impl fmt::Display for StepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: created={} existing={} updated={} deleted={} skipped={} failed={} declined={} missing_zone={} pending_redirects={} warnings={}",
            self.step,
            self.created,
            self.existing,
            self.updated,
            self.deleted,
            self.skipped,
            self.failed,
            self.declined,
            self.missing_zone,
            self.pending_redirects,
            self.warnings
        )
    }
}

/// Migration runner
///
/// Owns its ports; the binary wires real providers, tests wire mocks.
pub struct Migrator {
    source: Box<dyn SourceProvider>,
    target: Box<dyn TargetProvider>,
    store: Box<dyn ZoneStore>,
    prober: Box<dyn Prober>,
    confirm: Box<dyn Confirm>,
    config: MigrationConfig,
}

impl Migrator {
    /// Create a new runner
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn new(
        source: Box<dyn SourceProvider>,
        target: Box<dyn TargetProvider>,
        store: Box<dyn ZoneStore>,
        prober: Box<dyn Prober>,
        confirm: Box<dyn Confirm>,
        config: MigrationConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            source,
            target,
            store,
            prober,
            confirm,
            config,
        })
    }

    /// Check both providers accept their credentials
    ///
    /// Any failure here is fatal: no step should run half-authorized.
    pub async fn preflight(&self) -> Result<()> {
        self.target.authenticate().await.map_err(|e| {
            Error::auth(format!(
                "{} rejected the credentials: {}",
                self.target.provider_name(),
                e
            ))
        })?;
        self.source.authenticate().await.map_err(|e| {
            Error::auth(format!(
                "{} rejected the credentials: {}",
                self.source.provider_name(),
                e
            ))
        })?;

        info!(
            "Credentials accepted by {} and {}",
            self.source.provider_name(),
            self.target.provider_name()
        );
        Ok(())
    }

    /// Run a step (or the whole sequence for [`Step::All`])
    pub async fn run(&self, step: Step) -> Result<Vec<StepReport>> {
        match step {
            Step::All => self.run_all().await,
            single => Ok(vec![self.run_step(single).await?]),
        }
    }

    /// Run every step in order, asking before each one after the first
    ///
    /// A declined confirmation ends the sequence; the reports of the steps
    /// that did run are returned.
    pub async fn run_all(&self) -> Result<Vec<StepReport>> {
        let mut reports = Vec::with_capacity(Step::SEQUENCE.len());

        for (index, step) in Step::SEQUENCE.iter().enumerate() {
            if index > 0 {
                let prompt = format!(
                    "Step {}/{}: run {}?",
                    index + 1,
                    Step::SEQUENCE.len(),
                    step
                );
                if !self.confirm.confirm(&prompt)? {
                    info!("Stopping before {} at operator request", step);
                    break;
                }
            }
            reports.push(self.run_step(*step).await?);
        }

        Ok(reports)
    }

    async fn run_step(&self, step: Step) -> Result<StepReport> {
        info!("=== {} ===", step);
        let report = match step {
            Step::AddZones => self.add_zones().await?,
            Step::CreateRecords => self.create_records().await?,
            Step::CreateRedirects => self.create_redirects().await?,
            Step::SwitchNs => self.switch_ns().await?,
            Step::Verify => self.verify().await?,
            Step::Unlock => self.unlock().await?,
            Step::All => return Err(Error::invalid_input("all is not a single step")),
        };
        info!("{}", report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_names_round_trip() {
        for step in Step::SEQUENCE.iter().chain([Step::All].iter()) {
            assert_eq!(step.as_str().parse::<Step>().unwrap(), *step);
        }
    }

    #[test]
    fn unknown_step_is_rejected() {
        assert!("migrate".parse::<Step>().is_err());
    }

    #[test]
    fn report_flags_problems() {
        let mut report = StepReport::new(Step::CreateRecords);
        assert!(!report.has_problems());
        report.skipped = 3;
        assert!(!report.has_problems());
        report.missing_zone = 1;
        assert!(report.has_problems());
    }
}
