//! Test doubles and common utilities for runner contract tests
//!
//! Every double is cheap to clone and clones share their counters, so a test
//! keeps one handle and hands a boxed clone to the `Migrator`.

#![allow(dead_code)]

use dnsmig_core::error::{Error, Result};
use dnsmig_core::records::RecordSpec;
use dnsmig_core::traits::{
    Confirm, MailExchanger, ProbeOutcome, Prober, RedirectRule, SourceProvider, SourceRecord,
    TargetProvider, TargetRecord, Zone, ZoneStore,
};
use dnsmig_core::{MemoryZoneStore, MigrationConfig, Migrator, RedirectConfig};
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Counts calls per method name
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(' ').next() == Some(method))
            .count()
    }

    pub fn total(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that mention `needle` anywhere (e.g. a domain or zone ID)
    pub fn mentioning(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }
}

#[derive(Debug, Default)]
struct TargetState {
    /// Zones the provider already has, by name
    existing_zones: Mutex<HashMap<String, Zone>>,
    /// Records currently listed per zone ID
    zone_records: Mutex<HashMap<String, Vec<TargetRecord>>>,
    /// Record names whose creation fails
    failing_names: Mutex<HashSet<String>>,
    created: Mutex<Vec<(String, RecordSpec)>>,
    redirect_calls: Mutex<Vec<(String, Vec<RedirectRule>)>>,
    zone_status: Mutex<String>,
    zone_lookup_fails: Mutex<bool>,
    reject_auth: Mutex<bool>,
    next_id: AtomicUsize,
    log: CallLog,
}

/// Target provider double
#[derive(Debug, Clone, Default)]
pub struct MockTargetProvider {
    state: Arc<TargetState>,
}

pub const MUTATING_TARGET_METHODS: &[&str] = &[
    "create_zone",
    "delete_record",
    "create_record",
    "put_redirect_rules",
];

impl MockTargetProvider {
    pub fn new() -> Self {
        let mock = Self::default();
        *mock.state.zone_status.lock().unwrap() = "active".to_string();
        mock
    }

    pub fn rejecting_credentials() -> Self {
        let mock = Self::new();
        *mock.state.reject_auth.lock().unwrap() = true;
        mock
    }

    /// Make `create_zone` report the zone as existing
    pub fn with_existing_zone(self, domain: &str, zone_id: &str) -> Self {
        self.state
            .existing_zones
            .lock()
            .unwrap()
            .insert(domain.to_string(), zone(domain, zone_id));
        self
    }

    /// Records the target lists for a zone before anything is created
    pub fn with_zone_records(self, zone_id: &str, records: Vec<TargetRecord>) -> Self {
        self.state
            .zone_records
            .lock()
            .unwrap()
            .insert(zone_id.to_string(), records);
        self
    }

    /// Make `get_zone` fail for every zone
    pub fn failing_zone_lookup(self) -> Self {
        *self.state.zone_lookup_fails.lock().unwrap() = true;
        self
    }

    pub fn failing_create_for(self, name: &str) -> Self {
        self.state
            .failing_names
            .lock()
            .unwrap()
            .insert(name.to_string());
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.state.log
    }

    pub fn mutating_calls(&self) -> usize {
        MUTATING_TARGET_METHODS
            .iter()
            .map(|m| self.state.log.count(m))
            .sum()
    }

    pub fn created(&self) -> Vec<(String, RecordSpec)> {
        self.state.created.lock().unwrap().clone()
    }

    pub fn redirect_calls(&self) -> Vec<(String, Vec<RedirectRule>)> {
        self.state.redirect_calls.lock().unwrap().clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

pub fn zone(domain: &str, zone_id: &str) -> Zone {
    Zone {
        id: zone_id.to_string(),
        name: domain.to_string(),
        status: "pending".to_string(),
        name_servers: vec![
            "ada.ns.cloudflare.com".to_string(),
            "bob.ns.cloudflare.com".to_string(),
        ],
    }
}

pub fn target_record(id: &str, record_type: &str, name: &str) -> TargetRecord {
    TargetRecord {
        id: id.to_string(),
        record_type: record_type.to_string(),
        name: name.to_string(),
        content: "imported".to_string(),
    }
}

#[async_trait::async_trait]
impl TargetProvider for MockTargetProvider {
    async fn authenticate(&self) -> Result<()> {
        self.state.log.record("authenticate");
        if *self.state.reject_auth.lock().unwrap() {
            return Err(Error::auth("Invalid API Token"));
        }
        Ok(())
    }

    async fn create_zone(&self, domain: &str) -> Result<Zone> {
        self.state.log.record(format!("create_zone {domain}"));
        if self.state.existing_zones.lock().unwrap().contains_key(domain) {
            return Err(Error::zone_exists(domain));
        }
        let created = zone(domain, &self.next_id("zone"));
        self.state
            .existing_zones
            .lock()
            .unwrap()
            .insert(domain.to_string(), created.clone());
        Ok(created)
    }

    async fn find_zone(&self, domain: &str) -> Result<Zone> {
        self.state.log.record(format!("find_zone {domain}"));
        self.state
            .existing_zones
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .ok_or_else(|| Error::not_found(domain))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        self.state.log.record(format!("get_zone {zone_id}"));
        if *self.state.zone_lookup_fails.lock().unwrap() {
            return Err(Error::provider("mock", "zone lookup unavailable"));
        }
        let mut zone = zone("example.com", zone_id);
        zone.status = self.state.zone_status.lock().unwrap().clone();
        Ok(zone)
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<TargetRecord>> {
        self.state.log.record(format!("list_records {zone_id}"));
        Ok(self
            .state
            .zone_records
            .lock()
            .unwrap()
            .get(zone_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        self.state
            .log
            .record(format!("delete_record {zone_id} {record_id}"));
        Ok(())
    }

    async fn create_record(&self, zone_id: &str, record: &RecordSpec) -> Result<String> {
        self.state
            .log
            .record(format!("create_record {zone_id} {}", record.name()));
        if self.state.failing_names.lock().unwrap().contains(&record.name()) {
            return Err(Error::provider("mock", "Record content is invalid"));
        }
        self.state
            .created
            .lock()
            .unwrap()
            .push((zone_id.to_string(), record.clone()));
        Ok(self.next_id("record"))
    }

    async fn put_redirect_rules(&self, zone_id: &str, rules: &[RedirectRule]) -> Result<()> {
        self.state
            .log
            .record(format!("put_redirect_rules {zone_id}"));
        self.state
            .redirect_calls
            .lock()
            .unwrap()
            .push((zone_id.to_string(), rules.to_vec()));
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock-target"
    }
}

#[derive(Debug, Default)]
struct SourceState {
    records: Mutex<HashMap<String, Vec<SourceRecord>>>,
    delegations: Mutex<Vec<(String, Vec<String>)>>,
    failing_unlocks: Mutex<HashSet<String>>,
    reject_auth: Mutex<bool>,
    log: CallLog,
}

/// Source provider double
#[derive(Debug, Clone, Default)]
pub struct MockSourceProvider {
    state: Arc<SourceState>,
}

impl MockSourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_credentials() -> Self {
        let mock = Self::new();
        *mock.state.reject_auth.lock().unwrap() = true;
        mock
    }

    pub fn with_records(self, domain: &str, records: Vec<SourceRecord>) -> Self {
        self.state
            .records
            .lock()
            .unwrap()
            .insert(domain.to_string(), records);
        self
    }

    pub fn failing_unlock_for(self, domain: &str) -> Self {
        self.state
            .failing_unlocks
            .lock()
            .unwrap()
            .insert(domain.to_string());
        self
    }

    pub fn log(&self) -> &CallLog {
        &self.state.log
    }

    pub fn delegations(&self) -> Vec<(String, Vec<String>)> {
        self.state.delegations.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SourceProvider for MockSourceProvider {
    async fn authenticate(&self) -> Result<()> {
        self.state.log.record("authenticate");
        if *self.state.reject_auth.lock().unwrap() {
            return Err(Error::auth("Authentication failed"));
        }
        Ok(())
    }

    async fn list_records(&self, domain: &str) -> Result<Vec<SourceRecord>> {
        self.state.log.record(format!("list_records {domain}"));
        Ok(self
            .state
            .records
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .unwrap_or_default())
    }

    async fn delegate(&self, domain: &str, nameservers: &[String]) -> Result<()> {
        self.state.log.record(format!("delegate {domain}"));
        self.state
            .delegations
            .lock()
            .unwrap()
            .push((domain.to_string(), nameservers.to_vec()));
        Ok(())
    }

    async fn unlock_transfer(&self, domain: &str) -> Result<()> {
        self.state.log.record(format!("unlock_transfer {domain}"));
        if self.state.failing_unlocks.lock().unwrap().contains(domain) {
            return Err(Error::provider("mock", "Domain is not registered here"));
        }
        Ok(())
    }

    async fn authorize_transfer_out(&self, domain: &str) -> Result<()> {
        self.state
            .log
            .record(format!("authorize_transfer_out {domain}"));
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock-source"
    }
}

/// Prober double answering every probe with the same outcome
#[derive(Debug, Clone)]
pub struct MockProber {
    outcome: ProbeOutcome,
    nameservers: Vec<String>,
    probes: Arc<AtomicUsize>,
}

impl MockProber {
    pub fn healthy() -> Self {
        Self {
            outcome: ProbeOutcome::Status {
                code: 301,
                location: Some("https://example.com/blog".to_string()),
            },
            nameservers: vec![
                "ada.ns.cloudflare.com".to_string(),
                "bob.ns.cloudflare.com".to_string(),
            ],
            probes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn timing_out() -> Self {
        Self {
            outcome: ProbeOutcome::Timeout,
            ..Self::healthy()
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Prober for MockProber {
    async fn resolve(&self, _host: &str) -> Result<Vec<IpAddr>> {
        Ok(vec![IpAddr::from([104, 16, 0, 1])])
    }

    async fn nameservers(&self, _domain: &str) -> Result<Vec<String>> {
        Ok(self.nameservers.clone())
    }

    async fn mail_exchangers(&self, _domain: &str) -> Result<Vec<MailExchanger>> {
        Ok(vec![MailExchanger {
            preference: 10,
            exchange: "mx.example.net".to_string(),
        }])
    }

    async fn probe(&self, _url: &str) -> ProbeOutcome {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Confirmation double answering from a script; runs out → declines
#[derive(Debug, Clone, Default)]
pub struct ScriptedConfirm {
    answers: Arc<Mutex<VecDeque<bool>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into_iter().collect())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn always_yes(times: usize) -> Self {
        Self::new(std::iter::repeat_n(true, times))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, message: &str) -> Result<bool> {
        self.prompts.lock().unwrap().push(message.to_string());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or(false))
    }
}

/// Configuration with one domain and one redirect
pub fn single_domain_config() -> MigrationConfig {
    MigrationConfig::for_domains(["example.com"]).with_redirect(RedirectConfig::new(
        "example.com",
        "blog.example.com",
        "https://example.com/blog",
    ))
}

/// Handles kept by a test after the migrator took its boxed clones
pub struct Harness {
    pub migrator: Migrator,
    pub source: MockSourceProvider,
    pub target: MockTargetProvider,
    pub store: MemoryZoneStore,
    pub prober: MockProber,
    pub confirm: ScriptedConfirm,
}

pub fn harness(
    config: MigrationConfig,
    source: MockSourceProvider,
    target: MockTargetProvider,
    store: MemoryZoneStore,
    prober: MockProber,
    confirm: ScriptedConfirm,
) -> Harness {
    let migrator = Migrator::new(
        Box::new(source.clone()),
        Box::new(target.clone()),
        Box::new(store.clone()),
        Box::new(prober.clone()),
        Box::new(confirm.clone()),
        config,
    )
    .expect("valid test configuration");

    Harness {
        migrator,
        source,
        target,
        store,
        prober,
        confirm,
    }
}

/// Store with a zone recorded for each domain (zone ID = "zone-<domain>")
pub async fn store_with_zones(domains: &[&str]) -> MemoryZoneStore {
    let store = MemoryZoneStore::new();
    for domain in domains {
        let record = dnsmig_core::traits::ZoneRecord::new(
            format!("zone-{domain}"),
            [
                "ada.ns.cloudflare.com".to_string(),
                "bob.ns.cloudflare.com".to_string(),
            ],
        );
        store.put_zone(domain, &record).await.unwrap();
    }
    store
}
