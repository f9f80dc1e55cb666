//! Core data models for the reconnaissance engine

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use url::Url;

/// A URL scheduled for a given crawl depth
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrontierEntry {
    /// Absolute URL to fetch
    pub url: String,
    /// Crawl depth at which the URL is fetched (seeds are depth 0)
    pub depth: u32,
    /// Page the URL was discovered on, `None` for seeds
    pub source_url: Option<String>,
}

impl FrontierEntry {
    /// Creates a depth-0 entry for a seed URL
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            source_url: None,
        }
    }

    /// Creates an entry discovered on `source_url`
    pub fn discovered(url: impl Into<String>, depth: u32, source_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth,
            source_url: Some(source_url.into()),
        }
    }
}

/// Outcome of a single successful page load
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL that was requested
    pub url: String,
    /// HTTP status of the main document (0 when unknown)
    pub status: u16,
    /// Raw content, with captured script URLs appended for browser loads
    pub content: String,
    /// Contents of the `<title>` element, empty if absent
    pub title: String,
    /// Size of the content in bytes
    pub content_length: usize,
    /// Whether the resource is a JavaScript asset
    pub is_javascript: bool,
}

impl FetchResult {
    /// Builds a result, deriving title, length and script flag from the content
    pub fn new(url: impl Into<String>, status: u16, content: String, content_type: &str) -> Self {
        let url = url.into();
        let is_javascript = is_javascript_asset(&url, content_type);
        let title = if is_javascript {
            String::new()
        } else {
            page_title(&content)
        };
        Self {
            status,
            title,
            content_length: content.len(),
            is_javascript,
            content,
            url,
        }
    }
}

/// Returns the trimmed text of the first `<title>` element
pub fn page_title(html: &str) -> String {
    let selector = match Selector::parse("title") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Whether a URL or content type denotes a JavaScript file (`.json` excluded)
pub fn is_javascript_asset(url: &str, content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("javascript") || ct.contains("ecmascript") {
        return true;
    }
    let path = Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_else(|_| url.to_ascii_lowercase());
    path.ends_with(".js") || path.ends_with(".mjs")
}

/// Normalized record emitted for every accepted, non-duplicate page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Host of the page
    pub domain: String,
    /// Full URL
    pub url: String,
    /// URL path
    pub path: String,
    /// Explicit or scheme-default port
    pub port: u16,
    /// HTTP status code
    pub status: u16,
    /// Page title
    pub title: String,
    /// Content size in bytes
    pub content_length: usize,
    /// Whether the page is a JavaScript asset
    pub is_javascript: bool,
    /// Interest markers detected on the page
    #[serde(default)]
    pub markers: Vec<String>,
    /// When the page was accepted
    pub fetched_at: DateTime<Utc>,
}

impl PageRecord {
    /// Builds a record from a fetch result
    pub fn from_fetch(result: &FetchResult, markers: Vec<String>) -> Self {
        let parsed = Url::parse(&result.url).ok();
        let domain = parsed
            .as_ref()
            .and_then(|u| u.host_str())
            .unwrap_or_default()
            .to_string();
        let path = parsed
            .as_ref()
            .map(|u| u.path().to_string())
            .unwrap_or_else(|| "/".to_string());
        let port = parsed
            .as_ref()
            .and_then(|u| u.port_or_known_default())
            .unwrap_or(80);
        Self {
            domain,
            url: result.url.clone(),
            path,
            port,
            status: result.status,
            title: result.title.clone(),
            content_length: result.content_length,
            is_javascript: result.is_javascript,
            markers,
            fetched_at: Utc::now(),
        }
    }
}

/// Summary of one crawl run
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Accepted, non-duplicate pages in processing order
    pub pages: Vec<PageRecord>,
    /// URLs whose fetch failed (best effort)
    pub failed: BTreeSet<String>,
    /// Next-depth frontiers, `frontiers[d]` holds the entries scheduled for depth `d + 1`
    pub frontiers: Vec<Vec<FrontierEntry>>,
    /// Pages rejected by the duplicate checker
    pub duplicates: usize,
    /// Pages dropped by status or length filters
    pub filtered: usize,
}

/// Duplicate-detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Enable the per-domain title test
    pub title_enabled: bool,
    /// Titles shorter than this (in characters) never count as duplicates
    pub min_title_len: usize,
    /// Enable the per-domain exact content-length test
    pub length_enabled: bool,
    /// Content similarity threshold (0-100), `None` disables the test
    pub content_threshold: Option<u8>,
    /// DOM skeleton similarity threshold (0-100), `None` disables the test
    pub dom_threshold: Option<u8>,
    /// Target false-positive rate of the visited-URL filter
    pub bloom_fp_rate: f64,
    /// Initial capacity of the visited-URL filter
    pub bloom_initial_capacity: usize,
    /// Pages larger than this bypass duplicate detection
    pub max_page_bytes: usize,
    /// Maximum titles kept per domain
    pub max_titles_per_domain: usize,
    /// Maximum fingerprints kept per bucket
    pub max_fingerprints_per_bucket: usize,
    /// Maximum tracked domains per index
    pub max_domains: usize,
    /// Width in bits of each fingerprint band (8, 16 or 32)
    pub band_bits: u32,
    /// Fraction of a full collection evicted at once
    pub eviction_ratio: f64,
    /// Maximum element depth visited when building a DOM skeleton
    pub max_dom_depth: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            title_enabled: true,
            min_title_len: 8,
            length_enabled: false,
            content_threshold: None,
            dom_threshold: None,
            bloom_fp_rate: 0.001,
            bloom_initial_capacity: 10_000,
            max_page_bytes: 712_000,
            max_titles_per_domain: 3000,
            max_fingerprints_per_bucket: 1000,
            max_domains: 200,
            band_bits: 16,
            eviction_ratio: 0.2,
            max_dom_depth: 512,
        }
    }
}

/// Configuration for a crawl session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Seed URLs
    pub targets: Vec<String>,
    /// Extra root domains considered in scope
    pub whitelist: Vec<String>,
    /// Number of concurrent fetches
    pub threads: usize,
    /// Per-navigation timeout in seconds
    pub timeout_secs: u64,
    /// Maximum crawl depth (seeds are depth 0)
    pub max_depth: u32,
    /// URLs fetched per batch within a depth
    pub batch_size: usize,
    /// Fixed User-Agent; a random browser agent is used per request when unset
    pub user_agent: Option<String>,
    /// Header overrides sent with every request
    pub headers: HashMap<String, String>,
    /// HTTP/HTTPS/SOCKS proxy URL
    pub proxy: Option<String>,
    /// Maximum requests per second (HTTP fetcher only)
    pub rate_limit: Option<u32>,
    /// Load pages through headless Chromium
    pub render: bool,
    /// Show the browser window instead of running headless
    pub visible: bool,
    /// Pages with a status at or above this are dropped
    pub skip_status_from: u16,
    /// Pages shorter than this many bytes are dropped
    pub min_content_length: usize,
    /// Response bodies are truncated at this many bytes
    pub max_fetch_bytes: usize,
    /// Path extensions never scheduled
    pub blocked_extensions: Vec<String>,
    /// JSONL output path for page records
    pub output: Option<String>,
    /// Duplicate-detection settings
    pub dedup: DedupConfig,
}

/// Default body cap: 8 MiB, well above the dedup size ceiling
pub const DEFAULT_MAX_FETCH_BYTES: usize = 8 * 1024 * 1024;

/// Static asset extensions excluded from the frontier by default
pub fn default_blocked_extensions() -> Vec<String> {
    [
        "png", "jpg", "jpeg", "gif", "ico", "svg", "webp", "css", "ttf", "otf", "eot", "woff",
        "woff2", "mp3", "mp4", "m4v", "aac", "swf", "apk", "exe", "vue", "ts", "tsx", "map",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            whitelist: Vec::new(),
            threads: 10,
            timeout_secs: 15,
            max_depth: 2,
            batch_size: 100,
            user_agent: None,
            headers: HashMap::new(),
            proxy: None,
            rate_limit: None,
            render: false,
            visible: false,
            skip_status_from: 404,
            min_content_length: 300,
            max_fetch_bytes: DEFAULT_MAX_FETCH_BYTES,
            blocked_extensions: default_blocked_extensions(),
            output: None,
            dedup: DedupConfig::default(),
        }
    }
}
