//! Record transformation
//!
//! Maps each source record onto what the target should receive. Dispatch is
//! a plain match on [`SourceKind`]; every kind has exactly one rule and
//! anything unrecognized is skipped.
//!
//! | Source | Target |
//! |--------|--------|
//! | A / AAAA | verbatim, DNS-only |
//! | CNAME | verbatim, DNS-only |
//! | ALIAS | CNAME (target flattens at the apex) |
//! | MX | priority from source, default 10 |
//! | TXT | content carried verbatim as a JSON string |
//! | SRV | structured service/proto/weight/port/target |
//! | URL | proxied placeholder A + pending redirect |
//! | other | skipped |

use crate::traits::{PendingRedirect, SourceRecord};

/// Documentation-only address (TEST-NET-1) used for URL placeholders
pub const PLACEHOLDER_IPV4: &str = "192.0.2.1";

/// MX priority when the source has none
pub const DEFAULT_MX_PRIORITY: u16 = 10;

/// SRV priority when the source has none
pub const DEFAULT_SRV_PRIORITY: u16 = 0;

/// Lowest explicit TTL the target accepts
const MIN_TTL: u32 = 60;

/// Highest explicit TTL the target accepts
const MAX_TTL: u32 = 86_400;

/// TTL value meaning "automatic" at the target
pub const AUTO_TTL: u32 = 1;

/// Source record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    A,
    Aaaa,
    Cname,
    /// Apex alias (provider extension)
    Alias,
    Mx,
    Txt,
    Srv,
    /// HTTP redirect shorthand (provider extension)
    Url,
    /// Anything else (NS, SOA, CAA, POOL, ...)
    Other(String),
}

impl SourceKind {
    /// Parse a provider record type, case-insensitively
    pub fn parse(record_type: &str) -> Self {
        match record_type.to_ascii_uppercase().as_str() {
            "A" => Self::A,
            "AAAA" => Self::Aaaa,
            "CNAME" => Self::Cname,
            "ALIAS" => Self::Alias,
            "MX" => Self::Mx,
            "TXT" => Self::Txt,
            "SRV" => Self::Srv,
            "URL" => Self::Url,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Address family of an address record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

/// A record to create at the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSpec {
    /// A or AAAA
    Address {
        family: AddressFamily,
        name: String,
        content: String,
        ttl: u32,
        proxied: bool,
    },
    Cname {
        name: String,
        target: String,
        ttl: u32,
    },
    Mx {
        name: String,
        exchange: String,
        priority: u16,
        ttl: u32,
    },
    Txt {
        name: String,
        content: String,
        ttl: u32,
    },
    Srv(SrvSpec),
}

/// Structured SRV record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvSpec {
    /// Service label, with leading underscore (e.g. "_sip")
    pub service: String,
    /// Protocol label, with leading underscore (e.g. "_tcp")
    pub proto: String,
    /// Fully-qualified owner host below the service/proto labels
    pub host: String,
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    /// Target host, without trailing dot
    pub target: String,
    pub ttl: u32,
}

impl RecordSpec {
    /// Record type as the target names it
    pub fn record_type(&self) -> &'static str {
        match self {
            Self::Address {
                family: AddressFamily::V4,
                ..
            } => "A",
            Self::Address {
                family: AddressFamily::V6,
                ..
            } => "AAAA",
            Self::Cname { .. } => "CNAME",
            Self::Mx { .. } => "MX",
            Self::Txt { .. } => "TXT",
            Self::Srv(_) => "SRV",
        }
    }

    /// Fully-qualified record name
    pub fn name(&self) -> String {
        match self {
            Self::Address { name, .. }
            | Self::Cname { name, .. }
            | Self::Mx { name, .. }
            | Self::Txt { name, .. } => name.clone(),
            Self::Srv(srv) => format!("{}.{}.{}", srv.service, srv.proto, srv.host),
        }
    }

    pub fn ttl(&self) -> u32 {
        match self {
            Self::Address { ttl, .. }
            | Self::Cname { ttl, .. }
            | Self::Mx { ttl, .. }
            | Self::Txt { ttl, .. } => *ttl,
            Self::Srv(srv) => srv.ttl,
        }
    }
}

/// What to do with one source record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPlan {
    /// Create this record
    Create(RecordSpec),
    /// Create a placeholder; the redirect must be created separately
    Placeholder {
        record: RecordSpec,
        redirect: PendingRedirect,
    },
    /// Type has no rule
    Skip { record_type: String },
    /// Type is known but the record cannot be converted
    Invalid { reason: String },
}

/// Decide what the target gets for `record` in zone `domain`
pub fn plan(domain: &str, record: &SourceRecord) -> RecordPlan {
    let name = qualify(domain, &record.name);
    let ttl = target_ttl(record.ttl);

    match SourceKind::parse(&record.record_type) {
        SourceKind::A => RecordPlan::Create(RecordSpec::Address {
            family: AddressFamily::V4,
            name,
            content: record.content.clone(),
            ttl,
            proxied: false,
        }),
        SourceKind::Aaaa => RecordPlan::Create(RecordSpec::Address {
            family: AddressFamily::V6,
            name,
            content: record.content.clone(),
            ttl,
            proxied: false,
        }),
        SourceKind::Cname | SourceKind::Alias => RecordPlan::Create(RecordSpec::Cname {
            name,
            target: record.content.clone(),
            ttl,
        }),
        SourceKind::Mx => RecordPlan::Create(RecordSpec::Mx {
            name,
            exchange: record.content.clone(),
            priority: record.priority.unwrap_or(DEFAULT_MX_PRIORITY),
            ttl,
        }),
        SourceKind::Txt => RecordPlan::Create(RecordSpec::Txt {
            name,
            content: record.content.clone(),
            ttl,
        }),
        SourceKind::Srv => match parse_srv(domain, record, ttl) {
            Ok(srv) => RecordPlan::Create(RecordSpec::Srv(srv)),
            Err(reason) => RecordPlan::Invalid { reason },
        },
        SourceKind::Url => RecordPlan::Placeholder {
            record: RecordSpec::Address {
                family: AddressFamily::V4,
                name: name.clone(),
                content: PLACEHOLDER_IPV4.to_string(),
                ttl: AUTO_TTL,
                proxied: true,
            },
            redirect: PendingRedirect {
                host: name,
                target: record.content.clone(),
            },
        },
        SourceKind::Other(record_type) => RecordPlan::Skip { record_type },
    }
}

/// Fully-qualify a zone-relative name
fn qualify(domain: &str, name: &str) -> String {
    let name = name.trim_end_matches('.');
    if name.is_empty() || name == "@" || name == domain {
        domain.to_string()
    } else if name.ends_with(&format!(".{domain}")) {
        name.to_string()
    } else {
        format!("{name}.{domain}")
    }
}

fn target_ttl(ttl: u32) -> u32 {
    if ttl < MIN_TTL {
        AUTO_TTL
    } else {
        ttl.min(MAX_TTL)
    }
}

/// Parse `_service._proto[.rest]` plus "weight port target"
fn parse_srv(domain: &str, record: &SourceRecord, ttl: u32) -> Result<SrvSpec, String> {
    let mut labels = record.name.splitn(3, '.');
    let (Some(service), Some(proto)) = (labels.next(), labels.next()) else {
        return Err(format!(
            "SRV name '{}' lacks service and protocol labels",
            record.name
        ));
    };
    if service.is_empty() || proto.is_empty() {
        return Err(format!(
            "SRV name '{}' lacks service and protocol labels",
            record.name
        ));
    }
    let host = qualify(domain, labels.next().unwrap_or_default());

    let fields: Vec<&str> = record.content.split_whitespace().collect();
    let [weight, port, target] = fields.as_slice() else {
        return Err(format!(
            "SRV content '{}' is not 'weight port target'",
            record.content
        ));
    };
    let weight = weight
        .parse::<u16>()
        .map_err(|e| format!("SRV weight '{weight}': {e}"))?;
    let port = port
        .parse::<u16>()
        .map_err(|e| format!("SRV port '{port}': {e}"))?;

    Ok(SrvSpec {
        service: service.to_string(),
        proto: proto.to_string(),
        host,
        priority: record.priority.unwrap_or(DEFAULT_SRV_PRIORITY),
        weight,
        port,
        target: target.trim_end_matches('.').to_string(),
        ttl,
    })
}
