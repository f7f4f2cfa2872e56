// # Verification Probes
//
// Implements `Prober` with a hickory resolver for DNS and a reqwest client
// for HTTPS. The HTTP client never follows redirects: a redirect is the thing
// being checked, so its status and `Location` are reported as-is.
//
// Lookups go to the resolver's default upstreams rather than the local stub,
// so a nameserver switch shows up as soon as the parent zone publishes it.

use async_trait::async_trait;
use dnsmig_core::traits::{MailExchanger, ProbeOutcome, Prober};
use dnsmig_core::{Error, Result};
use hickory_resolver::TokioResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use std::net::IpAddr;
use std::time::Duration;

/// Default probe timeout (10 seconds)
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// DNS and HTTPS prober
pub struct HttpDnsProber {
    client: reqwest::Client,
    resolver: TokioResolver,
    timeout: Duration,
}

impl std::fmt::Debug for HttpDnsProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDnsProber")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpDnsProber {
    /// Create a prober whose HTTP requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        let resolver = TokioResolver::builder_with_config(
            ResolverConfig::default(),
            TokioConnectionProvider::default(),
        )
        .with_options(ResolverOpts::default())
        .build();

        Ok(Self {
            client,
            resolver,
            timeout,
        })
    }
}

fn dns_error(what: &str, name: &str, e: impl std::fmt::Display) -> Error {
    Error::provider("dns", format!("{what} lookup for {name} failed: {e}"))
}

fn strip_root(name: impl ToString) -> String {
    name.to_string().trim_end_matches('.').to_string()
}

#[async_trait]
impl Prober for HttpDnsProber {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>> {
        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| dns_error("address", host, e))?;
        Ok(lookup.iter().collect())
    }

    async fn nameservers(&self, domain: &str) -> Result<Vec<String>> {
        let lookup = self
            .resolver
            .ns_lookup(domain)
            .await
            .map_err(|e| dns_error("NS", domain, e))?;
        Ok(lookup.iter().map(strip_root).collect())
    }

    async fn mail_exchangers(&self, domain: &str) -> Result<Vec<MailExchanger>> {
        let lookup = self
            .resolver
            .mx_lookup(domain)
            .await
            .map_err(|e| dns_error("MX", domain, e))?;

        let mut exchangers: Vec<MailExchanger> = lookup
            .iter()
            .map(|mx| MailExchanger {
                preference: mx.preference(),
                exchange: strip_root(mx.exchange()),
            })
            .collect();
        exchangers.sort_by_key(|mx| mx.preference);
        Ok(exchangers)
    }

    async fn probe(&self, url: &str) -> ProbeOutcome {
        tracing::debug!("Probing {}", url);

        match self.client.get(url).send().await {
            Ok(response) => ProbeOutcome::Status {
                code: response.status().as_u16(),
                location: response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(ToString::to_string),
            },
            Err(e) if e.is_timeout() => ProbeOutcome::Timeout,
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn trailing_dot_is_stripped() {
        assert_eq!(strip_root("ns1.example.com."), "ns1.example.com");
        assert_eq!(strip_root("ns1.example.com"), "ns1.example.com");
    }

    #[tokio::test]
    async fn probe_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = HttpDnsProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();
        let outcome = prober.probe(&server.uri()).await;

        assert_eq!(
            outcome,
            ProbeOutcome::Status {
                code: 200,
                location: None
            }
        );
    }

    #[tokio::test]
    async fn probe_does_not_follow_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", "https://example.com/blog"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let prober = HttpDnsProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();
        let outcome = prober.probe(&format!("{}/", server.uri())).await;

        assert_eq!(
            outcome,
            ProbeOutcome::Status {
                code: 301,
                location: Some("https://example.com/blog".to_string())
            }
        );
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let prober = HttpDnsProber::new(Duration::from_millis(200)).unwrap();
        assert_eq!(prober.probe(&server.uri()).await, ProbeOutcome::Timeout);
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails() {
        let prober = HttpDnsProber::new(Duration::from_secs(2)).unwrap();
        let outcome = prober.probe("http://127.0.0.1:9/").await;
        assert!(matches!(outcome, ProbeOutcome::Failed(_)));
    }
}
