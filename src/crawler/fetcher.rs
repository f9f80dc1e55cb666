//! Page loading seam
//!
//! The orchestrator only sees [`PageFetcher`]; the plain HTTP implementation
//! lives here and the headless-browser one in `browser`.

use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{FetchResult, DEFAULT_MAX_FETCH_BYTES};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

/// Loads one URL and returns its content
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches a URL with the given request headers
    ///
    /// Error statuses are returned as results; only transport failures,
    /// navigation failures and timeouts are errors.
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<FetchResult>;
}

/// Fetcher issuing plain GET requests, without script execution
///
/// Bodies are read chunk by chunk and cut off at the byte cap.
#[derive(Clone)]
pub struct HttpFetcher {
    client: HttpClient,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            max_body_bytes: DEFAULT_MAX_FETCH_BYTES,
        }
    }

    /// Sets the body cap in bytes
    pub fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes.max(1);
        self
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<FetchResult> {
        let mut response = self.client.get_with_headers(url, headers).await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = self.max_body_bytes - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                debug!("Truncated {url} at {} bytes", self.max_body_bytes);
                break;
            }
            body.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&body).into_owned();
        debug!("Fetched {url}: {status}, {} bytes", body.len());
        Ok(FetchResult::new(url, status, body, &content_type))
    }
}
