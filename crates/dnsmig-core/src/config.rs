//! Configuration types for the migration runner
//!
//! The migration works against a fixed set of domains. The defaults below are
//! the constants the runner ships with; the binary may override some of them
//! from the environment before calling [`MigrationConfig::validate`].

use serde::{Deserialize, Serialize};

/// Domains moved from the source registrar to the target provider
pub const DEFAULT_DOMAINS: &[&str] = &["example.com", "example.net", "example.org"];

/// Domains registered at the source but not hosted there
///
/// These only take part in the unlock step.
pub const DEFAULT_UNLOCK_ONLY_DOMAINS: &[&str] = &["example.dev"];

/// Default per-request timeout for verification probes
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Main migration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Domains to migrate (zones, records, nameservers)
    pub domains: Vec<String>,

    /// Extra domains handled by the unlock step only
    #[serde(default)]
    pub unlock_only_domains: Vec<String>,

    /// Fixed redirects created by the create-redirects step
    #[serde(default)]
    pub redirects: Vec<RedirectConfig>,

    /// HTTPS endpoints probed by the verify step
    #[serde(default)]
    pub verify_endpoints: Vec<String>,

    /// Per-request timeout for verification probes (in seconds)
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl MigrationConfig {
    /// Build a configuration for the given domains
    ///
    /// Endpoints default to the apex and `www` host of every domain.
    pub fn for_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let domains: Vec<String> = domains.into_iter().map(Into::into).collect();
        let verify_endpoints = domains
            .iter()
            .flat_map(|d| [format!("https://{d}"), format!("https://www.{d}")])
            .collect();

        Self {
            domains,
            unlock_only_domains: Vec::new(),
            redirects: Vec::new(),
            verify_endpoints,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }

    /// Add a redirect
    pub fn with_redirect(mut self, redirect: RedirectConfig) -> Self {
        self.redirects.push(redirect);
        self
    }

    /// Set the unlock-only domains
    pub fn with_unlock_only_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unlock_only_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Every domain the unlock step touches, migrated ones first
    pub fn unlock_domains(&self) -> impl Iterator<Item = &str> {
        self.domains
            .iter()
            .chain(self.unlock_only_domains.iter())
            .map(String::as_str)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domains.is_empty() {
            return Err(crate::Error::config("No domains configured"));
        }

        for domain in self.domains.iter().chain(&self.unlock_only_domains) {
            validate_domain_name(domain)?;
        }

        for redirect in &self.redirects {
            redirect.validate()?;
            if !self.domains.contains(&redirect.domain) {
                return Err(crate::Error::config(format!(
                    "Redirect for {} targets a domain that is not being migrated",
                    redirect.source_host
                )));
            }
        }

        for endpoint in &self.verify_endpoints {
            if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "Verify endpoint must use HTTP or HTTPS scheme. Got: {endpoint}"
                )));
            }
        }

        if !(1..=120).contains(&self.probe_timeout_secs) {
            return Err(crate::Error::config(format!(
                "Probe timeout must be between 1 and 120 seconds. Got: {}",
                self.probe_timeout_secs
            )));
        }

        Ok(())
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self::for_domains(DEFAULT_DOMAINS.iter().copied())
            .with_unlock_only_domains(DEFAULT_UNLOCK_ONLY_DOMAINS.iter().copied())
            .with_redirect(RedirectConfig::new(
                "example.com",
                "blog.example.com",
                "https://example.com/blog",
            ))
    }
}

/// A host-level HTTP redirect managed at the target's edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectConfig {
    /// Zone the rule lives in
    pub domain: String,

    /// Host whose requests are redirected (e.g. "blog.example.com")
    pub source_host: String,

    /// Absolute destination URL
    pub destination: String,
}

impl RedirectConfig {
    /// Create a new redirect configuration
    pub fn new(
        domain: impl Into<String>,
        source_host: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            source_host: source_host.into(),
            destination: destination.into(),
        }
    }

    /// URL the verify step requests to check this redirect
    pub fn source_url(&self) -> String {
        format!("https://{}", self.source_host)
    }

    fn validate(&self) -> Result<(), crate::Error> {
        validate_domain_name(&self.source_host)?;
        if self.source_host != self.domain
            && !self.source_host.ends_with(&format!(".{}", self.domain))
        {
            return Err(crate::Error::config(format!(
                "Redirect host {} is not inside zone {}",
                self.source_host, self.domain
            )));
        }
        if !self.destination.starts_with("https://") && !self.destination.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "Redirect destination must be an absolute URL. Got: {}",
                self.destination
            )));
        }
        Ok(())
    }
}

fn default_probe_timeout_secs() -> u64 {
    DEFAULT_PROBE_TIMEOUT_SECS
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks; catches typos, not every invalid name.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    if domain.is_empty() {
        return Err(crate::Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(crate::Error::config(format!(
            "Domain name needs at least two labels: '{domain}'"
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Domain name has empty label: '{domain}'"
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "Domain label contains invalid characters. Label: '{label}'"
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{label}'"
            )));
        }
    }

    Ok(())
}
