//! HTTP transport
//!
//! The controller only sees the `Transport` trait. `HttpTransport` is the
//! default implementation and owns everything about the wire:
//! - Browser-like navigation headers
//! - Round-robin user-agent rotation
//! - Round-robin proxy rotation, one client per proxy
//! - Per-attempt timeout with exponential backoff between retries

use crate::config::TransportConfig;
use crate::listing::{PageRequest, RawPage};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fetches results pages
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches one page, retrying internally
    ///
    /// An `Err` means the transport has given up on this request.
    async fn fetch(&self, request: &PageRequest) -> Result<RawPage, FetchError>;
}

/// Headers a desktop Chrome sends on a top-level navigation
fn navigation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert(
        "sec-ch-ua",
        HeaderValue::from_static(
            r#""Chromium";v="122", "Not(A:Brand";v="24", "Google Chrome";v="122""#,
        ),
    );
    headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
    headers.insert("sec-ch-ua-platform", HeaderValue::from_static(r#""Windows""#));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers
}

/// Builds one HTTP client, optionally routed through `proxy`
pub fn build_http_client(
    config: &TransportConfig,
    proxy: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .default_headers(navigation_headers())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// reqwest-backed transport with retry and rotation
pub struct HttpTransport {
    /// One client per proxy, or a single direct client
    clients: Vec<Client>,
    user_agents: Vec<String>,
    max_retries: u32,
    retry_delay: Duration,
    next_client: AtomicUsize,
    next_agent: AtomicUsize,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, reqwest::Error> {
        let clients = if config.proxy_urls.is_empty() {
            vec![build_http_client(config, None)?]
        } else {
            config
                .proxy_urls
                .iter()
                .map(|proxy| build_http_client(config, Some(proxy)))
                .collect::<Result<Vec<_>, _>>()?
        };

        tracing::debug!(
            "HTTP transport ready: {} client(s), {} user agent(s), {} retries",
            clients.len(),
            config.user_agents.len(),
            config.max_retries
        );

        Ok(Self {
            clients,
            user_agents: config.user_agents.clone(),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            next_client: AtomicUsize::new(0),
            next_agent: AtomicUsize::new(0),
        })
    }

    fn next_client(&self) -> &Client {
        let index = self.next_client.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[index]
    }

    fn next_user_agent(&self) -> Option<&str> {
        if self.user_agents.is_empty() {
            return None;
        }
        let index = self.next_agent.fetch_add(1, Ordering::Relaxed) % self.user_agents.len();
        Some(&self.user_agents[index])
    }

    /// Delay before retry number `retry` (1-based)
    fn backoff(&self, retry: u32) -> Duration {
        self.retry_delay.saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }

    async fn attempt(&self, url: &str) -> Result<RawPage, FetchError> {
        let mut request = self.next_client().get(url);
        if let Some(agent) = self.next_user_agent() {
            request = request.header(header::USER_AGENT, agent);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let source_url = response.url().to_string();
        let content = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        Ok(RawPage::new(content, status.as_u16(), source_url))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &PageRequest) -> Result<RawPage, FetchError> {
        let attempts = self.max_retries.saturating_sub(request.retry_count) + 1;
        let mut attempt = 1;

        loop {
            match self.attempt(&request.url).await {
                Ok(page) => {
                    tracing::debug!(
                        "Fetched page {} ({} bytes) on attempt {}",
                        request.page_number,
                        page.content.len(),
                        attempt
                    );
                    return Ok(page);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt,
                        attempts,
                        request.url,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(FetchError::RetriesExhausted {
                        url: request.url.clone(),
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
            }
        }
    }
}
