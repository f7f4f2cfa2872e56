// # Cloudflare Target Provider
//
// Implements `TargetProvider` over the Cloudflare API v4: zones, DNS records
// and the dynamic-redirect ruleset of a zone.
//
// ## Behaviour
//
// - One logical API operation per trait call (pagination aside)
// - Full error propagation; the runner decides what is fatal
// - HTTP timeout configured (30 seconds)
// - Status codes mapped onto the core error taxonomy (401/403, 404, 429, 5xx)
// - Cloudflare error code 1061 on zone creation maps to `ZoneExists`
// - No retries; the operator re-runs the step
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Construction fails if the token is empty
//
// ## API Reference
//
// - Verify token: GET `/user/tokens/verify`
// - Accounts: GET `/accounts`
// - Zones: POST `/zones`, GET `/zones?name=...`, GET `/zones/:zone_id`
// - DNS records: GET/POST `/zones/:zone_id/dns_records`,
//   DELETE `/zones/:zone_id/dns_records/:record_id`
// - Redirects: PUT `/zones/:zone_id/rulesets/phases/http_request_dynamic_redirect/entrypoint`

use async_trait::async_trait;
use dnsmig_core::records::{AddressFamily, RecordSpec};
use dnsmig_core::traits::{RedirectRule, TargetProvider, TargetRecord, Zone};
use dnsmig_core::{Error, Result};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records per page when listing a zone
const RECORDS_PER_PAGE: u32 = 100;

/// Cloudflare error code for "zone already exists"
const ZONE_EXISTS_CODE: i64 = 1061;

/// Ruleset phase holding host-level redirects
const REDIRECT_PHASE: &str = "http_request_dynamic_redirect";

const PROVIDER: &str = "cloudflare";

/// Response envelope shared by every v4 endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct ZoneResult {
    id: String,
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    name_servers: Vec<String>,
}

impl From<ZoneResult> for Zone {
    fn from(zone: ZoneResult) -> Self {
        Zone {
            id: zone.id,
            name: zone.name,
            status: zone.status,
            name_servers: zone.name_servers,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecordResult {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct IdResult {
    id: String,
}

/// Cloudflare target provider
///
/// The account ID used for zone creation is either configured or looked up
/// once through `GET /accounts` and cached for the provider's lifetime.
pub struct CloudflareProvider {
    /// ⚠️ NEVER log this value
    api_token: String,
    account_id: OnceCell<String>,
    base_url: String,
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("account_id", &self.account_id.get())
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: API token with Zone:Edit, DNS:Edit and Dynamic Redirect permissions
    /// - `account_id`: Account to create zones in; discovered when `None`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the token is empty or the HTTP client
    /// cannot be built.
    pub fn new(api_token: impl Into<String>, account_id: Option<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        let cell = OnceCell::new();
        if let Some(id) = account_id.filter(|id| !id.is_empty()) {
            // A fresh cell cannot already be set
            let _ = cell.set(id);
        }

        Ok(Self {
            api_token,
            account_id: cell,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Point the provider at another API root (mock servers in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send one request and decode the envelope
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Envelope<T>> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, path);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("Cloudflare request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response".to_string());

        let envelope: Option<Envelope<T>> = serde_json::from_str(&text).ok();

        match envelope {
            Some(envelope) if status.is_success() && envelope.success => Ok(envelope),
            Some(envelope) => Err(map_failure(status, &envelope.errors, path)),
            None if status.is_success() => Err(Error::provider(
                PROVIDER,
                format!("Invalid response format from {path}"),
            )),
            None => Err(map_failure(
                status,
                &[ApiMessage {
                    code: 0,
                    message: text,
                }],
                path,
            )),
        }
    }

    /// Send a request whose envelope must carry a result
    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        self.request(method, path, body)
            .await?
            .result
            .ok_or_else(|| Error::provider(PROVIDER, format!("Response from {path} has no result")))
    }

    /// Account to create zones in
    async fn account_id(&self) -> Result<&str> {
        let id = self
            .account_id
            .get_or_try_init(|| async {
                let accounts: Vec<IdResult> = self.fetch(Method::GET, "/accounts", None).await?;
                let account = accounts.into_iter().next().ok_or_else(|| {
                    Error::config("Cloudflare token has access to no account")
                })?;
                tracing::info!("Using Cloudflare account {}", account.id);
                Ok::<_, Error>(account.id)
            })
            .await?;
        Ok(id.as_str())
    }
}

/// Map a failed response onto the core error taxonomy
fn map_failure(status: StatusCode, errors: &[ApiMessage], context: &str) -> Error {
    let message = if errors.is_empty() {
        status.to_string()
    } else {
        errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ")
    };

    if errors.iter().any(|e| {
        e.code == ZONE_EXISTS_CODE || e.message.to_ascii_lowercase().contains("already exists")
    }) {
        return Error::zone_exists(message);
    }

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {status}: {message}"
        )),
        404 => Error::not_found(format!("{context}: {message}")),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded. Please retry later. Status: {status}"
        )),
        500..=599 => Error::provider(
            PROVIDER,
            format!("Cloudflare server error (transient): {status} - {message}"),
        ),
        _ => Error::provider(PROVIDER, format!("{context} failed: {status} - {message}")),
    }
}

/// JSON body for a record creation call
fn record_payload(record: &RecordSpec) -> Value {
    match record {
        RecordSpec::Address {
            family,
            name,
            content,
            ttl,
            proxied,
        } => json!({
            "type": match family {
                AddressFamily::V4 => "A",
                AddressFamily::V6 => "AAAA",
            },
            "name": name,
            "content": content,
            "ttl": ttl,
            "proxied": proxied,
        }),
        RecordSpec::Cname { name, target, ttl } => json!({
            "type": "CNAME",
            "name": name,
            "content": target,
            "ttl": ttl,
            "proxied": false,
        }),
        RecordSpec::Mx {
            name,
            exchange,
            priority,
            ttl,
        } => json!({
            "type": "MX",
            "name": name,
            "content": exchange,
            "priority": priority,
            "ttl": ttl,
        }),
        RecordSpec::Txt { name, content, ttl } => json!({
            "type": "TXT",
            "name": name,
            "content": content,
            "ttl": ttl,
        }),
        RecordSpec::Srv(srv) => json!({
            "type": "SRV",
            "name": record.name(),
            "ttl": srv.ttl,
            "data": {
                "service": srv.service,
                "proto": srv.proto,
                "name": srv.host,
                "priority": srv.priority,
                "weight": srv.weight,
                "port": srv.port,
                "target": srv.target,
            },
        }),
    }
}

/// JSON body for the redirect ruleset entrypoint
fn ruleset_payload(rules: &[RedirectRule]) -> Value {
    let rules: Vec<Value> = rules
        .iter()
        .map(|rule| {
            json!({
                "description": format!("Redirect {} to {}", rule.host, rule.destination),
                "expression": format!("(http.host eq \"{}\")", rule.host),
                "action": "redirect",
                "action_parameters": {
                    "from_value": {
                        "target_url": { "value": rule.destination },
                        "status_code": rule.status_code,
                        "preserve_query_string": true,
                    },
                },
                "enabled": true,
            })
        })
        .collect();

    json!({ "rules": rules })
}

#[async_trait]
impl TargetProvider for CloudflareProvider {
    async fn authenticate(&self) -> Result<()> {
        #[derive(Deserialize)]
        struct TokenStatus {
            status: String,
        }

        let token: TokenStatus = self
            .fetch(Method::GET, "/user/tokens/verify", None)
            .await
            .map_err(|e| match e {
                Error::Authentication(_) => e,
                other => Error::auth(other.to_string()),
            })?;

        if token.status != "active" {
            return Err(Error::auth(format!("Cloudflare token is {}", token.status)));
        }
        tracing::debug!("Cloudflare token verified");
        Ok(())
    }

    async fn create_zone(&self, domain: &str) -> Result<Zone> {
        let account_id = self.account_id().await?;
        let body = json!({
            "name": domain,
            "account": { "id": account_id },
            "type": "full",
        });

        let zone: ZoneResult = self.fetch(Method::POST, "/zones", Some(&body)).await?;
        tracing::info!("Created Cloudflare zone {} ({})", zone.name, zone.id);
        Ok(zone.into())
    }

    async fn find_zone(&self, domain: &str) -> Result<Zone> {
        let zones: Vec<ZoneResult> = self
            .fetch(Method::GET, &format!("/zones?name={domain}"), None)
            .await?;

        zones
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(domain))
            .map(Zone::from)
            .ok_or_else(|| Error::not_found(format!("Zone not found: {domain}")))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let zone: ZoneResult = self
            .fetch(Method::GET, &format!("/zones/{zone_id}"), None)
            .await?;
        Ok(zone.into())
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<TargetRecord>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let envelope: Envelope<Vec<RecordResult>> = self
                .request(
                    Method::GET,
                    &format!(
                        "/zones/{zone_id}/dns_records?per_page={RECORDS_PER_PAGE}&page={page}"
                    ),
                    None,
                )
                .await?;

            records.extend(envelope.result.unwrap_or_default().into_iter().map(|r| {
                TargetRecord {
                    id: r.id,
                    record_type: r.record_type,
                    name: r.name,
                    content: r.content,
                }
            }));

            let total_pages = envelope.result_info.map_or(1, |info| info.total_pages);
            if page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!("Zone {} has {} records", zone_id, records.len());
        Ok(records)
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let _: Envelope<Value> = self
            .request(
                Method::DELETE,
                &format!("/zones/{zone_id}/dns_records/{record_id}"),
                None,
            )
            .await?;
        Ok(())
    }

    async fn create_record(&self, zone_id: &str, record: &RecordSpec) -> Result<String> {
        let body = record_payload(record);
        let created: IdResult = self
            .fetch(
                Method::POST,
                &format!("/zones/{zone_id}/dns_records"),
                Some(&body),
            )
            .await?;
        Ok(created.id)
    }

    async fn put_redirect_rules(&self, zone_id: &str, rules: &[RedirectRule]) -> Result<()> {
        let body = ruleset_payload(rules);
        let _: Envelope<Value> = self
            .request(
                Method::PUT,
                &format!("/zones/{zone_id}/rulesets/phases/{REDIRECT_PHASE}/entrypoint"),
                Some(&body),
            )
            .await?;
        tracing::info!("Zone {}: {} redirect rules in place", zone_id, rules.len());
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
