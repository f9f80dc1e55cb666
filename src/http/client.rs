//! HTTP client wrapper with rate limiting and request tracking

use crate::error::{ReconError, Result};
use crate::models::ScanConfig;
use reqwest::{Client, Response};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::debug;

/// HTTP client wrapper with rate limiting and request counting
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    request_count: Arc<AtomicU64>,
    rate_limiter: Option<Arc<Semaphore>>,
    rate_limit_delay: Option<Duration>,
}

impl HttpClient {
    /// Creates a new HttpClient from scan configuration
    ///
    /// Certificate errors are ignored: targets routinely run self-signed or
    /// expired certificates.
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .danger_accept_invalid_certs(true);

        if let Some(ref proxy_url) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| ReconError::ConfigError(format!("Invalid proxy URL: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        let (rate_limiter, rate_limit_delay) = match config.rate_limit {
            Some(rps) if rps > 0 => (
                Some(Arc::new(Semaphore::new(1))),
                Some(Duration::from_millis(1000 / u64::from(rps))),
            ),
            _ => (None, None),
        };

        Ok(Self {
            client,
            request_count: Arc::new(AtomicU64::new(0)),
            rate_limiter,
            rate_limit_delay,
        })
    }

    /// Sends a GET request with custom headers
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Response> {
        self.throttle().await?;
        self.request_count.fetch_add(1, Ordering::Relaxed);

        let mut req = self.client.get(url);
        for (key, value) in headers {
            req = req.header(key.as_str(), value.as_str());
        }
        let response = req.send().await?;
        debug!("Response: {} for {}", response.status(), response.url());
        Ok(response)
    }

    /// Returns the total number of requests made
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Spaces requests out to the configured rate
    async fn throttle(&self) -> Result<()> {
        if let (Some(limiter), Some(delay)) = (&self.rate_limiter, self.rate_limit_delay) {
            let _permit = limiter
                .acquire()
                .await
                .map_err(|_| ReconError::RateLimitExceeded)?;
            sleep(delay).await;
        }
        Ok(())
    }
}
