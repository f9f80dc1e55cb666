//! Duplicate detection gate
//!
//! `DuplicateChecker` owns every piece of dedup state for a run: the visited
//! URL filter, the per-domain title and length indices and the content and DOM fingerprint
//! indices. Each collection sits behind its own mutex and every
//! check-then-insert happens inside a single critical section, so the checker
//! can be shared by `Arc` across fetch tasks.

pub mod bloom;
pub mod index;
pub mod simhash;
pub mod skeleton;

use crate::models::DedupConfig;
use crate::scope::Scope;
use bloom::ScalableBloomFilter;
use index::{FingerprintIndex, FingerprintMatch, LengthIndex, TitleIndex};
use simhash::Fingerprint;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use url::Url;

/// Run-wide accept/reject gate for URLs and fetched pages
#[derive(Debug)]
pub struct DuplicateChecker {
    config: DedupConfig,
    scope: Scope,
    visited: Mutex<ScalableBloomFilter>,
    titles: Mutex<TitleIndex>,
    lengths: Mutex<LengthIndex>,
    content: Mutex<FingerprintIndex>,
    dom: Mutex<FingerprintIndex>,
    content_threshold: Option<f64>,
    dom_threshold: Option<f64>,
}

impl DuplicateChecker {
    pub fn new(config: DedupConfig, scope: Scope) -> Self {
        let content_threshold = validate_threshold("content", config.content_threshold);
        let dom_threshold = validate_threshold("DOM", config.dom_threshold);
        let fingerprint_index = || {
            FingerprintIndex::new(
                config.max_domains,
                config.max_fingerprints_per_bucket,
                config.eviction_ratio,
                config.band_bits,
            )
        };
        Self {
            visited: Mutex::new(ScalableBloomFilter::new(
                config.bloom_initial_capacity,
                config.bloom_fp_rate,
            )),
            titles: Mutex::new(TitleIndex::new(
                config.max_domains,
                config.max_titles_per_domain,
                config.eviction_ratio,
            )),
            lengths: Mutex::new(LengthIndex::new(
                config.max_domains,
                config.max_titles_per_domain,
                config.eviction_ratio,
            )),
            content: Mutex::new(fingerprint_index()),
            dom: Mutex::new(fingerprint_index()),
            content_threshold,
            dom_threshold,
            scope,
            config,
        }
    }

    /// Whether a URL may still be scheduled: parseable, not yet visited and in scope
    pub fn is_valid_url(&self, url: &str) -> bool {
        let url = url.trim();
        if url.is_empty() {
            return false;
        }
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if lock(&self.visited).contains(parsed.as_str()) {
            return false;
        }
        self.scope.allows(&parsed)
    }

    /// Records a URL as processed
    pub fn mark_visited(&self, url: &str) {
        let key = Url::parse(url.trim())
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.trim().to_string());
        lock(&self.visited).insert(&key);
    }

    /// Number of URLs recorded as visited
    pub fn visited_count(&self) -> usize {
        lock(&self.visited).len()
    }

    /// Decides whether a fetched page repeats something already seen
    ///
    /// Pages larger than the size ceiling are never treated as duplicates and
    /// are not indexed. The content and DOM tests only run for HTML documents.
    pub fn is_duplicate(&self, url: &str, content: &str, title: &str) -> bool {
        if content.len() > self.config.max_page_bytes {
            debug!("Skipping dedup for oversized page {url} ({} bytes)", content.len());
            return false;
        }
        let domain = domain_key(url);

        let is_javascript = crate::models::is_javascript_asset(url, "");
        if self.config.title_enabled && !is_javascript && self.check_title(&domain, title) {
            debug!("Duplicate title on {url}");
            return true;
        }
        if self.config.length_enabled && self.check_length(&domain, content.len()) {
            debug!("Duplicate content length on {url}");
            return true;
        }

        if !is_html_document(content) {
            return false;
        }
        if self.check_content(&domain, content) {
            debug!("Duplicate content on {url}");
            return true;
        }
        if self.check_dom(&domain, content) {
            debug!("Duplicate DOM structure on {url}");
            return true;
        }
        false
    }

    /// Title test: true if the normalized title was already recorded for the domain
    pub fn check_title(&self, domain: &str, title: &str) -> bool {
        let normalized = title.trim().to_lowercase();
        if normalized.chars().count() < self.config.min_title_len {
            return false;
        }
        lock(&self.titles).check_and_insert(domain, &normalized)
    }

    /// Length test: true if a page of exactly this size was already seen on the domain
    pub fn check_length(&self, domain: &str, length: usize) -> bool {
        lock(&self.lengths).check_and_insert(domain, length)
    }

    /// Content test on visible text; false when the test is disabled
    pub fn check_content(&self, domain: &str, html: &str) -> bool {
        let Some(threshold) = self.content_threshold else {
            return false;
        };
        let fingerprint = Fingerprint::from_text(&skeleton::visible_text(html));
        matches!(
            lock(&self.content).check_and_insert(domain, fingerprint, threshold),
            FingerprintMatch::Duplicate { .. }
        )
    }

    /// DOM test on the tag skeleton; false when disabled or the document has no usable body
    pub fn check_dom(&self, domain: &str, html: &str) -> bool {
        let Some(threshold) = self.dom_threshold else {
            return false;
        };
        let Some(tags) = skeleton::dom_skeleton(html, self.config.max_dom_depth) else {
            debug!("No usable DOM skeleton for {domain}, skipping structure test");
            return false;
        };
        let fingerprint = Fingerprint::from_skeleton(&tags);
        matches!(
            lock(&self.dom).check_and_insert(domain, fingerprint, threshold),
            FingerprintMatch::Duplicate { .. }
        )
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Maps a 0-100 threshold onto 0.0-1.0; out-of-range values disable the test
fn validate_threshold(name: &str, threshold: Option<u8>) -> Option<f64> {
    match threshold {
        Some(t) if t <= 100 => Some(f64::from(t) / 100.0),
        Some(t) => {
            warn!("{name} similarity threshold {t} is outside 0-100, disabling {name} dedup");
            None
        }
        None => None,
    }
}

/// Host plus explicit port, the key all per-domain indices use
fn domain_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(u) => match (u.host_str(), u.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            _ => String::new(),
        },
        Err(_) => String::new(),
    }
}

/// Whether the document declares itself HTML (leading whitespace and case ignored)
fn is_html_document(content: &str) -> bool {
    content
        .trim_start()
        .get(..14)
        .is_some_and(|head| head.eq_ignore_ascii_case("<!doctype html"))
}
