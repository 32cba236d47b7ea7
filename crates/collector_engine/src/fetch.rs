use std::time::Duration;

use collector_core::RetryPolicy;
use collector_logging::collector_trace;
use futures_util::StreamExt;
use reqwest::{StatusCode, Url};
use serde_json::Value;

use crate::pacing::Pacer;
use crate::retry::with_retry;
use crate::{FailureKind, FetchError};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub user_agent: String,
    /// Skip TLS certificate verification (some statistics mirrors need it).
    pub accept_invalid_certs: bool,
    pub retry: RetryPolicy,
    /// Minimum spacing between request starts, for upstreams with a
    /// documented per-second quota.
    pub min_interval: Option<Duration>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            // The full app list is tens of megabytes.
            max_bytes: 64 * 1024 * 1024,
            user_agent: concat!("storefront-collector/", env!("CARGO_PKG_VERSION")).to_string(),
            accept_invalid_certs: false,
            retry: RetryPolicy::default(),
            min_interval: None,
        }
    }
}

#[async_trait::async_trait]
pub trait JsonFetcher: Send + Sync {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError>;
}

/// JSON-over-HTTP GET client with rate-limit retry and request pacing.
///
/// Holds one connection pool for the whole run.
#[derive(Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
    pacer: Pacer,
}

impl HttpFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            pacer: Pacer::new(settings.min_interval),
            settings,
        })
    }

    async fn send_once(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.pacer.wait_turn().await;
        collector_trace!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::new(
                FailureKind::RateLimited { attempts: 1 },
                status.to_string(),
            ));
        }
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl JsonFetcher for HttpFetcher {
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FetchError> {
        let parsed = if query.is_empty() {
            Url::parse(url)
        } else {
            Url::parse_with_params(url, query.iter().map(|(k, v)| (*k, v.as_str())))
        }
        .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let bytes = with_retry(&self.settings.retry, parsed.as_str(), || {
            self.send_once(&parsed)
        })
        .await?;

        serde_json::from_slice(&bytes)
            .map_err(|err| FetchError::new(FailureKind::MalformedBody, err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
