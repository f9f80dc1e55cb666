//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use reconnoiter::crawler::fetcher::PageFetcher;
use reconnoiter::error::{ReconError, Result};
use reconnoiter::models::{FetchResult, PageRecord, ScanConfig};
use reconnoiter::report::PageSink;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Creates a test ScanConfig with small limits and no length filter
pub fn test_config(max_depth: u32) -> ScanConfig {
    ScanConfig {
        threads: 2,
        timeout_secs: 10,
        max_depth,
        batch_size: 10,
        user_agent: Some("Reconnoiter-Test/0.1.0".to_string()),
        min_content_length: 0,
        ..ScanConfig::default()
    }
}

/// Wraps a body in a minimal HTML document
pub fn html_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head><body>{body}</body></html>"
    )
}

/// In-memory fetcher serving canned pages and counting requests
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, (u16, String)>,
    panics: HashSet<String>,
    hits: Mutex<HashMap<String, usize>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, status: u16, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), (status, body.into()));
        self
    }

    /// Makes the fetch task for `url` panic
    pub fn panicking(mut self, url: &str) -> Self {
        self.panics.insert(url.to_string());
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().expect("hits lock").values().sum()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, _headers: &[(String, String)]) -> Result<FetchResult> {
        *self
            .hits
            .lock()
            .expect("hits lock")
            .entry(url.to_string())
            .or_insert(0) += 1;
        if self.panics.contains(url) {
            panic!("fetcher crashed on {url}");
        }
        match self.pages.get(url) {
            Some((status, body)) => Ok(FetchResult::new(url, *status, body.clone(), "text/html")),
            None => Err(ReconError::NavigationError(url.to_string())),
        }
    }
}

/// Sink collecting every accepted record
#[derive(Default)]
pub struct CollectingSink {
    pub records: Mutex<Vec<PageRecord>>,
}

impl PageSink for CollectingSink {
    fn on_page(&self, record: &PageRecord, _content: &str) -> Result<()> {
        self.records.lock().expect("records lock").push(record.clone());
        Ok(())
    }
}
