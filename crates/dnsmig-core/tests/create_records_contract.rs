//! Architectural Contract Test: Record Copy
//!
//! Constraints verified:
//! - A domain without a zone record gets no provider calls
//! - The target zone is cleared before copying, NS and SOA excepted
//! - Unsupported types are skipped without a create call
//! - One failing record does not stop the rest
//! - URL records leave a pending redirect behind
//!
//! If this test fails, create-records can corrupt or half-copy a zone.

mod common;

use common::*;
use dnsmig_core::records::{AddressFamily, RecordSpec, SrvSpec};
use dnsmig_core::traits::{PendingRedirect, SourceRecord, ZoneStore};
use dnsmig_core::{MemoryZoneStore, MigrationConfig};

fn config() -> MigrationConfig {
    MigrationConfig::for_domains(["example.com"])
}

#[tokio::test]
async fn missing_zone_means_no_provider_calls() {
    let h = harness(
        config(),
        MockSourceProvider::new()
            .with_records("example.com", vec![SourceRecord::new("A", "", "203.0.113.7")]),
        MockTargetProvider::new(),
        MemoryZoneStore::new(),
        MockProber::healthy(),
        ScriptedConfirm::default(),
    );

    let report = h.migrator.create_records().await.unwrap();

    assert_eq!(report.missing_zone, 1);
    assert_eq!(h.target.log().total(), 0);
    assert_eq!(h.source.log().total(), 0);
}

#[tokio::test]
async fn zone_is_cleared_except_ns_and_soa() {
    let h = harness(
        config(),
        MockSourceProvider::new(),
        MockTargetProvider::new().with_zone_records(
            "zone-example.com",
            vec![
                target_record("r1", "NS", "example.com"),
                target_record("r2", "SOA", "example.com"),
                target_record("r3", "A", "example.com"),
                target_record("r4", "CNAME", "www.example.com"),
            ],
        ),
        store_with_zones(&["example.com"]).await,
        MockProber::healthy(),
        ScriptedConfirm::default(),
    );

    let report = h.migrator.create_records().await.unwrap();

    assert_eq!(report.deleted, 2);
    let calls = h.target.log().calls();
    assert!(calls.contains(&"delete_record zone-example.com r3".to_string()));
    assert!(calls.contains(&"delete_record zone-example.com r4".to_string()));
    assert_eq!(h.target.log().mentioning(" r1"), 0);
    assert_eq!(h.target.log().mentioning(" r2"), 0);
}

#[tokio::test]
async fn records_are_transformed_for_the_target() {
    let h = harness(
        config(),
        MockSourceProvider::new().with_records(
            "example.com",
            vec![
                SourceRecord::new("A", "", "203.0.113.7"),
                SourceRecord::new("MX", "", "mx.example.net"),
                SourceRecord::new("SRV", "_sip._tcp", "10 5060 sip.example.com.").with_priority(20),
                SourceRecord::new("TXT", "", "v=spf1 include:_spf.example.net ~all"),
            ],
        ),
        MockTargetProvider::new(),
        store_with_zones(&["example.com"]).await,
        MockProber::healthy(),
        ScriptedConfirm::default(),
    );

    let report = h.migrator.create_records().await.unwrap();
    assert_eq!(report.created, 4);
    assert_eq!(report.failed, 0);

    let created: Vec<RecordSpec> = h.target.created().into_iter().map(|(_, r)| r).collect();
    assert!(created.contains(&RecordSpec::Address {
        family: AddressFamily::V4,
        name: "example.com".to_string(),
        content: "203.0.113.7".to_string(),
        ttl: 3600,
        proxied: false,
    }));
    assert!(created.contains(&RecordSpec::Mx {
        name: "example.com".to_string(),
        exchange: "mx.example.net".to_string(),
        priority: 10,
        ttl: 3600,
    }));
    assert!(created.contains(&RecordSpec::Srv(SrvSpec {
        service: "_sip".to_string(),
        proto: "_tcp".to_string(),
        host: "example.com".to_string(),
        priority: 20,
        weight: 10,
        port: 5060,
        target: "sip.example.com".to_string(),
        ttl: 3600,
    })));
    assert!(created.contains(&RecordSpec::Txt {
        name: "example.com".to_string(),
        content: "v=spf1 include:_spf.example.net ~all".to_string(),
        ttl: 3600,
    }));
}

#[tokio::test]
async fn unsupported_types_are_skipped() {
    let h = harness(
        config(),
        MockSourceProvider::new().with_records(
            "example.com",
            vec![
                SourceRecord::new("CAA", "", "0 issue \"letsencrypt.org\""),
                SourceRecord::new("NS", "", "ns1.dnsimple.com"),
                SourceRecord::new("A", "www", "203.0.113.7"),
            ],
        ),
        MockTargetProvider::new(),
        store_with_zones(&["example.com"]).await,
        MockProber::healthy(),
        ScriptedConfirm::default(),
    );

    let report = h.migrator.create_records().await.unwrap();

    assert_eq!(report.skipped, 2);
    assert_eq!(report.created, 1);
    assert_eq!(h.target.log().count("create_record"), 1);
}

#[tokio::test]
async fn failures_do_not_abort_the_domain() {
    let h = harness(
        config(),
        MockSourceProvider::new().with_records(
            "example.com",
            vec![
                SourceRecord::new("A", "bad", "203.0.113.7"),
                SourceRecord::new("SRV", "_sip._tcp", "not-a-srv"),
                SourceRecord::new("A", "good", "203.0.113.8"),
            ],
        ),
        MockTargetProvider::new().failing_create_for("bad.example.com"),
        store_with_zones(&["example.com"]).await,
        MockProber::healthy(),
        ScriptedConfirm::default(),
    );

    let report = h.migrator.create_records().await.unwrap();

    assert_eq!(report.failed, 2);
    assert_eq!(report.created, 1);
    assert_eq!(h.target.created()[0].1.name(), "good.example.com");
}

#[tokio::test]
async fn url_record_leaves_pending_redirect() {
    let h = harness(
        config(),
        MockSourceProvider::new().with_records(
            "example.com",
            vec![SourceRecord::new("URL", "go", "https://example.org/landing")],
        ),
        MockTargetProvider::new(),
        store_with_zones(&["example.com"]).await,
        MockProber::healthy(),
        ScriptedConfirm::default(),
    );

    let report = h.migrator.create_records().await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.pending_redirects, 1);

    let (_, placeholder) = &h.target.created()[0];
    assert!(matches!(
        placeholder,
        RecordSpec::Address { proxied: true, .. }
    ));

    let zone = h.store.get_zone("example.com").await.unwrap().unwrap();
    assert_eq!(
        zone.pending_redirects,
        vec![PendingRedirect {
            host: "go.example.com".to_string(),
            target: "https://example.org/landing".to_string(),
        }]
    );
}

#[tokio::test]
async fn failed_placeholder_leaves_nothing_pending() {
    let h = harness(
        config(),
        MockSourceProvider::new().with_records(
            "example.com",
            vec![SourceRecord::new("URL", "go", "https://example.org/landing")],
        ),
        MockTargetProvider::new().failing_create_for("go.example.com"),
        store_with_zones(&["example.com"]).await,
        MockProber::healthy(),
        ScriptedConfirm::default(),
    );

    let report = h.migrator.create_records().await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.pending_redirects, 0);
    let zone = h.store.get_zone("example.com").await.unwrap().unwrap();
    assert!(zone.pending_redirects.is_empty());
}
