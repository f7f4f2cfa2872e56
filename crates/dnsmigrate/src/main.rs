// # dnsmigrate - DNSimple to Cloudflare migration runner
//
// Thin integration layer: reads configuration from the environment, wires the
// providers, the state file and the probes into a `Migrator`, and runs the
// requested step. All migration logic lives in dnsmig-core.
//
// ## Usage
//
// ```bash
// dnsmigrate [add-zones|create-records|create-redirects|switch-ns|verify|unlock|all] [--yes]
// ```
//
// ## Configuration
//
// ### Required
// - `CLOUDFLARE_API_TOKEN`: Cloudflare API token
// - `DNSIMPLE_API_TOKEN`: DNSimple API token
//
// ### Optional
// - `DNSMIG_STATE_PATH`: State file (default `dns-migration-state.json`)
// - `DNSMIG_DOMAINS`: Comma-separated domains to migrate
// - `DNSMIG_CLOUDFLARE_ACCOUNT_ID`: Account to create zones in
// - `DNSMIG_DNSIMPLE_ACCOUNT_ID`: Account the domains belong to
// - `DNSMIG_PROBE_TIMEOUT_SECS`: Verify probe timeout, 1-120 (default 10)
// - `DNSMIG_LOG_LEVEL`: trace, debug, info, warn, error (default info)

mod prompt;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dnsmig_core::config::DEFAULT_PROBE_TIMEOUT_SECS;
use dnsmig_core::traits::{AlwaysConfirm, Confirm};
use dnsmig_core::{FileZoneStore, MigrationConfig, Migrator, Step, ZoneStore};
use dnsmig_probe::HttpDnsProber;
use dnsmig_provider_cloudflare::CloudflareProvider;
use dnsmig_provider_dnsimple::DnsimpleProvider;
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::prompt::StdinConfirm;

/// Default state file, relative to the working directory
const DEFAULT_STATE_PATH: &str = "dns-migration-state.json";

/// Exit codes for different termination scenarios
///
/// - 0: Step(s) ran to completion
/// - 1: Configuration error or rejected credentials
/// - 2: Runtime error (state file, terminal, unexpected failure)
#[derive(Debug, Clone, Copy)]
enum MigrateExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<MigrateExitCode> for ExitCode {
    fn from(code: MigrateExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Command-line step names
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StepArg {
    AddZones,
    CreateRecords,
    CreateRedirects,
    SwitchNs,
    Verify,
    Unlock,
    All,
}

impl From<StepArg> for Step {
    fn from(arg: StepArg) -> Self {
        match arg {
            StepArg::AddZones => Step::AddZones,
            StepArg::CreateRecords => Step::CreateRecords,
            StepArg::CreateRedirects => Step::CreateRedirects,
            StepArg::SwitchNs => Step::SwitchNs,
            StepArg::Verify => Step::Verify,
            StepArg::Unlock => Step::Unlock,
            StepArg::All => Step::All,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dnsmigrate")]
#[command(about = "Move domains from DNSimple to Cloudflare, one re-runnable step at a time")]
#[command(version)]
struct Cli {
    /// Step to run
    #[arg(value_enum, default_value_t = StepArg::All)]
    step: StepArg,

    /// Answer every confirmation with yes
    #[arg(short, long)]
    yes: bool,
}

/// Application configuration
struct Config {
    cloudflare_api_token: String,
    dnsimple_api_token: String,
    cloudflare_account_id: Option<String>,
    dnsimple_account_id: Option<String>,
    state_path: String,
    domains: Option<Vec<String>>,
    probe_timeout_secs: u64,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            cloudflare_api_token: env::var("CLOUDFLARE_API_TOKEN")
                .context("CLOUDFLARE_API_TOKEN is required")?,
            dnsimple_api_token: env::var("DNSIMPLE_API_TOKEN")
                .context("DNSIMPLE_API_TOKEN is required")?,
            cloudflare_account_id: non_empty_var("DNSMIG_CLOUDFLARE_ACCOUNT_ID"),
            dnsimple_account_id: non_empty_var("DNSMIG_DNSIMPLE_ACCOUNT_ID"),
            state_path: non_empty_var("DNSMIG_STATE_PATH")
                .unwrap_or_else(|| DEFAULT_STATE_PATH.to_string()),
            domains: non_empty_var("DNSMIG_DOMAINS").map(|s| {
                s.split(',')
                    .map(|d| d.trim().to_lowercase())
                    .filter(|d| !d.is_empty())
                    .collect()
            }),
            probe_timeout_secs: match non_empty_var("DNSMIG_PROBE_TIMEOUT_SECS") {
                Some(s) => s
                    .parse()
                    .with_context(|| format!("DNSMIG_PROBE_TIMEOUT_SECS is not a number: {s}"))?,
                None => DEFAULT_PROBE_TIMEOUT_SECS,
            },
            log_level: env::var("DNSMIG_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.cloudflare_api_token.trim().is_empty() {
            anyhow::bail!(
                "CLOUDFLARE_API_TOKEN is empty. \
                Set it via: export CLOUDFLARE_API_TOKEN=your_token"
            );
        }

        if self.dnsimple_api_token.trim().is_empty() {
            anyhow::bail!(
                "DNSIMPLE_API_TOKEN is empty. \
                Set it via: export DNSIMPLE_API_TOKEN=your_token"
            );
        }

        if let Some(domains) = &self.domains
            && domains.is_empty()
        {
            anyhow::bail!("DNSMIG_DOMAINS must contain at least one domain");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DNSMIG_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        // Domain names, redirects and the probe timeout range are checked by
        // MigrationConfig::validate
        self.migration_config().validate()?;

        Ok(())
    }

    /// Build the runner configuration
    ///
    /// An explicit domain list keeps only the default redirects whose zone is
    /// still in the list.
    fn migration_config(&self) -> MigrationConfig {
        let defaults = MigrationConfig::default();

        let mut config = match &self.domains {
            Some(domains) => {
                let mut config = MigrationConfig::for_domains(domains.iter().cloned())
                    .with_unlock_only_domains(defaults.unlock_only_domains.iter().cloned());
                for redirect in defaults.redirects {
                    if domains.contains(&redirect.domain) {
                        config = config.with_redirect(redirect);
                    }
                }
                config
            }
            None => defaults,
        };

        config.probe_timeout_secs = self.probe_timeout_secs;
        config
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return MigrateExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return MigrateExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return MigrateExitCode::ConfigError.into();
    }

    let step = Step::from(cli.step);
    info!("dnsmigrate {} ({})", env!("CARGO_PKG_VERSION"), step);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return MigrateExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let migrator = match build_migrator(&config, cli.yes).await {
            Ok(migrator) => migrator,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return MigrateExitCode::ConfigError;
            }
        };

        if let Err(e) = migrator.preflight().await {
            error!("{}", e);
            return MigrateExitCode::ConfigError;
        }

        match migrator.run(step).await {
            Ok(reports) => {
                for report in reports.iter().filter(|r| r.has_problems()) {
                    warn!("{} finished with problems: {}", report.step, report);
                }
                MigrateExitCode::Success
            }
            Err(e) => {
                error!("{} aborted: {}", step, e);
                MigrateExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Wire providers, state file, probes and the confirmation gate
async fn build_migrator(config: &Config, assume_yes: bool) -> Result<Migrator> {
    let target = CloudflareProvider::new(
        config.cloudflare_api_token.clone(),
        config.cloudflare_account_id.clone(),
    )?;
    let source = DnsimpleProvider::new(
        config.dnsimple_api_token.clone(),
        config.dnsimple_account_id.clone(),
    )?;
    let prober = HttpDnsProber::new(Duration::from_secs(config.probe_timeout_secs))?;

    let store = FileZoneStore::new(&config.state_path)
        .await
        .with_context(|| format!("Failed to open state file {}", config.state_path))?;
    let recorded = store.list_domains().await?;
    info!(
        "State file {}: {} domain(s) recorded",
        store.path().display(),
        recorded.len()
    );

    let confirm: Box<dyn Confirm> = if assume_yes {
        warn!("--yes given: every confirmation is answered with yes");
        Box::new(AlwaysConfirm)
    } else {
        Box::new(StdinConfirm)
    };

    let migration_config = config.migration_config();
    info!(
        "Migrating {} domain(s): {}",
        migration_config.domains.len(),
        migration_config.domains.join(", ")
    );

    Ok(Migrator::new(
        Box::new(source),
        Box::new(target),
        Box::new(store),
        Box::new(prober),
        confirm,
        migration_config,
    )?)
}
