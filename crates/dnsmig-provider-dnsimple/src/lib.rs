// # DNSimple Source Provider
//
// Implements `SourceProvider` over the DNSimple API v2. DNSimple is both the
// source of the record set and the registrar of record, so this crate also
// performs the nameserver delegation and the transfer unlock.
//
// ## Behaviour
//
// - `GET /whoami` doubles as the credential check and the account lookup
// - Zone records are read across every page
// - Error bodies (`{"message": ...}`) are surfaced verbatim
// - No retries; the operator re-runs the step
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
//
// ## API Reference
//
// - Whoami: GET `/whoami`
// - Records: GET `/:account/zones/:zone/records`
// - Delegation: PUT `/:account/registrar/domains/:domain/delegation`
// - Transfer lock: DELETE `/:account/registrar/domains/:domain/transfer_lock`
// - Auth code: POST `/:account/registrar/domains/:domain/authorize_transfer_out`

use async_trait::async_trait;
use dnsmig_core::traits::{SourceProvider, SourceRecord};
use dnsmig_core::{Error, Result};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::OnceCell;

/// DNSimple API base URL
const DNSIMPLE_API_BASE: &str = "https://api.dnsimple.com/v2";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records per page when listing a zone
const RECORDS_PER_PAGE: u32 = 100;

const PROVIDER: &str = "dnsimple";

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct Whoami {
    account: Option<AccountRef>,
}

#[derive(Debug, Deserialize)]
struct AccountRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ZoneRecordResult {
    id: u64,
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    ttl: u32,
    priority: Option<u16>,
}

impl From<ZoneRecordResult> for SourceRecord {
    fn from(record: ZoneRecordResult) -> Self {
        SourceRecord {
            id: record.id.to_string(),
            record_type: record.record_type,
            name: record.name,
            content: record.content,
            ttl: record.ttl,
            priority: record.priority,
        }
    }
}

/// DNSimple source provider
pub struct DnsimpleProvider {
    /// ⚠️ NEVER log this value
    api_token: String,
    account_id: OnceCell<String>,
    base_url: String,
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for DnsimpleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsimpleProvider")
            .field("api_token", &"<REDACTED>")
            .field("account_id", &self.account_id.get())
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl DnsimpleProvider {
    /// Create a new DNSimple provider
    ///
    /// `account_id` is looked up through `/whoami` when `None`; that only
    /// works for account tokens, user tokens must configure it.
    pub fn new(api_token: impl Into<String>, account_id: Option<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("DNSimple API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        let cell = OnceCell::new();
        if let Some(id) = account_id.filter(|id| !id.is_empty()) {
            let _ = cell.set(id);
        }

        Ok(Self {
            api_token,
            account_id: cell,
            base_url: DNSIMPLE_API_BASE.to_string(),
            client,
        })
    }

    /// Point the provider at another API root (mock servers in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send one request; returns the body text of a successful response
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, path);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_token)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("DNSimple request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response".to_string());

        if status.is_success() {
            Ok(text)
        } else {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or(text);
            Err(map_failure(status, &message, path))
        }
    }

    /// Send one request and decode its `data` envelope
    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<DataEnvelope<T>> {
        let text = self.send(method, path, body).await?;
        serde_json::from_str(&text).map_err(|e| {
            Error::provider(PROVIDER, format!("Invalid response format from {path}: {e}"))
        })
    }

    async fn whoami(&self) -> Result<Whoami> {
        Ok(self.fetch::<Whoami>(Method::GET, "/whoami", None).await?.data)
    }

    /// Account the domains belong to
    async fn account_id(&self) -> Result<&str> {
        let id = self
            .account_id
            .get_or_try_init(|| async {
                let account = self.whoami().await?.account.ok_or_else(|| {
                    Error::config(
                        "DNSimple token is not an account token; set DNSMIG_DNSIMPLE_ACCOUNT_ID",
                    )
                })?;
                tracing::info!("Using DNSimple account {}", account.id);
                Ok::<_, Error>(account.id.to_string())
            })
            .await?;
        Ok(id.as_str())
    }

    async fn registrar_path(&self, domain: &str, action: &str) -> Result<String> {
        let account = self.account_id().await?;
        Ok(format!("/{account}/registrar/domains/{domain}/{action}"))
    }
}

/// Map a failed response onto the core error taxonomy
fn map_failure(status: StatusCode, message: &str, context: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!("{message}. Status: {status}")),
        404 => Error::not_found(format!("{context}: {message}")),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded. Please retry later. Status: {status}"
        )),
        500..=599 => Error::provider(
            PROVIDER,
            format!("DNSimple server error (transient): {status} - {message}"),
        ),
        _ => Error::provider(PROVIDER, format!("{status} - {message}")),
    }
}

#[async_trait]
impl SourceProvider for DnsimpleProvider {
    async fn authenticate(&self) -> Result<()> {
        let whoami = self.whoami().await.map_err(|e| match e {
            Error::Authentication(_) => e,
            other => Error::auth(other.to_string()),
        })?;

        if let Some(account) = whoami.account {
            if self.account_id.get().is_none() {
                let _ = self.account_id.set(account.id.to_string());
            }
        }
        tracing::debug!("DNSimple credentials accepted");
        Ok(())
    }

    async fn list_records(&self, domain: &str) -> Result<Vec<SourceRecord>> {
        let account = self.account_id().await?;
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let envelope: DataEnvelope<Vec<ZoneRecordResult>> = self
                .fetch(
                    Method::GET,
                    &format!(
                        "/{account}/zones/{domain}/records?per_page={RECORDS_PER_PAGE}&page={page}"
                    ),
                    None,
                )
                .await?;

            records.extend(envelope.data.into_iter().map(SourceRecord::from));

            let total_pages = envelope.pagination.map_or(1, |p| p.total_pages);
            if page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!("{}: {} records at DNSimple", domain, records.len());
        Ok(records)
    }

    async fn delegate(&self, domain: &str, nameservers: &[String]) -> Result<()> {
        let path = self.registrar_path(domain, "delegation").await?;
        let body = Value::from(nameservers.to_vec());
        self.send(Method::PUT, &path, Some(&body)).await?;
        Ok(())
    }

    async fn unlock_transfer(&self, domain: &str) -> Result<()> {
        let path = self.registrar_path(domain, "transfer_lock").await?;
        self.send(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn authorize_transfer_out(&self, domain: &str) -> Result<()> {
        let path = self.registrar_path(domain, "authorize_transfer_out").await?;
        self.send(Method::POST, &path, None).await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
