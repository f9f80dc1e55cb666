//! Depth-bounded crawl orchestration
//!
//! Breadth-first: every URL of depth N is fetched and processed before depth
//! N+1 starts. Within a depth the URL set is drained in fixed-size batches;
//! fetches inside a batch run concurrently, bounded by a semaphore sized to the
//! worker count. Each fetched page goes through the pre-gate filters and the
//! duplicate checker, and novel pages below the depth limit feed the next
//! frontier.

pub mod browser;
pub mod extractor;
pub mod fetcher;
pub mod resolver;
pub mod signals;

use crate::dedup::DuplicateChecker;
use crate::http::request_headers;
use crate::models::{CrawlReport, FetchResult, FrontierEntry, PageRecord, ScanConfig};
use crate::report::PageSink;
use crate::scope::{with_scheme, Scope};
use fetcher::PageFetcher;
use indicatif::{ProgressBar, ProgressStyle};
use resolver::UrlResolver;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{debug, error, info, warn};
use url::Url;

/// Where the orchestrator currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    FetchingBatch { depth: u32, batch: usize },
    Processing { depth: u32 },
    Recursing { depth: u32 },
    Done,
}

/// What became of one scheduled URL
enum PageOutcome {
    Failed(String),
    Filtered,
    Duplicate,
    Accepted {
        record: PageRecord,
        content: String,
        discovered: Vec<FrontierEntry>,
    },
}

/// Shared, read-only state handed to every fetch task
struct TaskContext {
    config: ScanConfig,
    fetcher: Arc<dyn PageFetcher>,
    checker: Arc<DuplicateChecker>,
    resolver: UrlResolver,
}

/// Breadth-first crawler driving a [`PageFetcher`]
pub struct Crawler {
    config: ScanConfig,
    fetcher: Arc<dyn PageFetcher>,
    checker: Arc<DuplicateChecker>,
    sinks: Vec<Arc<dyn PageSink>>,
    progress: bool,
    phase: CrawlPhase,
}

impl Crawler {
    pub fn new(config: ScanConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        let scope = Scope::new(&config.targets, &config.whitelist);
        let checker = Arc::new(DuplicateChecker::new(config.dedup.clone(), scope));
        Self {
            config,
            fetcher,
            checker,
            sinks: Vec::new(),
            progress: false,
            phase: CrawlPhase::Idle,
        }
    }

    /// Registers a sink receiving every accepted page
    pub fn with_sink(mut self, sink: Arc<dyn PageSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Shows a per-depth progress bar
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    /// Duplicate checker of the current (or last) run
    pub fn checker(&self) -> Arc<DuplicateChecker> {
        Arc::clone(&self.checker)
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Crawls from the given seeds until the frontier empties or the depth limit is reached
    ///
    /// Seeds without a scheme are fetched over https. Each call is a separate
    /// run with fresh duplicate-detection state scoped to its seeds.
    pub async fn crawl(&mut self, seeds: &[String]) -> CrawlReport {
        let seeds: Vec<String> = seeds
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(with_scheme)
            .collect();
        let scope = Scope::new(&seeds, &self.config.whitelist);
        self.checker = Arc::new(DuplicateChecker::new(self.config.dedup.clone(), scope));

        let ctx = Arc::new(TaskContext {
            config: self.config.clone(),
            fetcher: Arc::clone(&self.fetcher),
            checker: Arc::clone(&self.checker),
            resolver: UrlResolver::new(&self.config.whitelist, &self.config.blocked_extensions),
        });
        let semaphore = Arc::new(Semaphore::new(self.config.threads.max(1)));
        let batch_size = self.config.batch_size.max(1);
        let max_depth = self.config.max_depth;

        let mut report = CrawlReport::default();
        let mut scheduled: HashSet<String> = HashSet::new();
        let mut current: Vec<FrontierEntry> = seeds
            .iter()
            .filter(|s| scheduled.insert((*s).clone()))
            .map(FrontierEntry::seed)
            .collect();
        let mut depth = 0u32;

        info!("Starting crawl of {} seed(s), max depth {max_depth}", current.len());

        while !current.is_empty() {
            let pb = self.progress_bar(current.len(), depth);
            let mut next = Vec::new();

            for (batch_index, batch) in current.chunks(batch_size).enumerate() {
                self.phase = CrawlPhase::FetchingBatch {
                    depth,
                    batch: batch_index,
                };
                debug!("Depth {depth}: fetching batch {batch_index} ({} URLs)", batch.len());

                let mut set = JoinSet::new();
                let mut in_flight: HashMap<Id, String> = HashMap::new();
                for entry in batch {
                    let ctx = Arc::clone(&ctx);
                    let semaphore = Arc::clone(&semaphore);
                    let entry = entry.clone();
                    let url = entry.url.clone();
                    let handle = set.spawn(async move {
                        let _permit = match semaphore.acquire_owned().await {
                            Ok(p) => p,
                            Err(_) => return PageOutcome::Failed(entry.url),
                        };
                        process_entry(&ctx, entry).await
                    });
                    in_flight.insert(handle.id(), url);
                }

                self.phase = CrawlPhase::Processing { depth };
                while let Some(joined) = set.join_next_with_id().await {
                    pb.inc(1);
                    let outcome = match joined {
                        Ok((_, outcome)) => outcome,
                        Err(e) => match in_flight.remove(&e.id()) {
                            Some(url) => {
                                error!("Fetch task for {url} failed: {e}");
                                self.checker.mark_visited(&url);
                                PageOutcome::Failed(url)
                            }
                            None => {
                                error!("Fetch task failed: {e}");
                                continue;
                            }
                        },
                    };
                    match outcome {
                        PageOutcome::Failed(url) => {
                            report.failed.insert(url);
                        }
                        PageOutcome::Filtered => report.filtered += 1,
                        PageOutcome::Duplicate => report.duplicates += 1,
                        PageOutcome::Accepted {
                            record,
                            content,
                            discovered,
                        } => {
                            pb.set_message(record.url.clone());
                            for sink in &self.sinks {
                                if let Err(e) = sink.on_page(&record, &content) {
                                    warn!("Page sink failed for {}: {e}", record.url);
                                }
                            }
                            for entry in discovered {
                                if self.checker.is_valid_url(&entry.url)
                                    && scheduled.insert(entry.url.clone())
                                {
                                    next.push(entry);
                                }
                            }
                            report.pages.push(record);
                        }
                    }
                }
            }
            pb.finish_and_clear();

            self.phase = CrawlPhase::Recursing { depth };
            info!(
                "Depth {depth} complete: {} pages so far, {} new URLs scheduled",
                report.pages.len(),
                next.len()
            );
            if depth >= max_depth {
                break;
            }
            report.frontiers.push(next.clone());
            current = next;
            depth += 1;
        }

        self.phase = CrawlPhase::Done;
        info!(
            "Crawl finished: {} pages, {} duplicates, {} filtered, {} failed",
            report.pages.len(),
            report.duplicates,
            report.filtered,
            report.failed.len()
        );
        report
    }

    fn progress_bar(&self, len: usize, depth: u32) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(format!("depth {depth}"));
        pb
    }
}

/// Fetches one URL and runs it through the filters, the dedup gate and discovery
async fn process_entry(ctx: &TaskContext, entry: FrontierEntry) -> PageOutcome {
    let headers = request_headers(&ctx.config.headers, ctx.config.user_agent.as_deref());
    let fetched = ctx.fetcher.fetch(&entry.url, &headers).await;
    ctx.checker.mark_visited(&entry.url);

    let page = match fetched {
        Ok(page) => page,
        Err(e) => {
            debug!("Failed to fetch {}: {e}", entry.url);
            return PageOutcome::Failed(entry.url);
        }
    };

    if page.status >= ctx.config.skip_status_from
        || page.content_length < ctx.config.min_content_length
    {
        debug!(
            "Filtered {} (status {}, {} bytes)",
            page.url, page.status, page.content_length
        );
        return PageOutcome::Filtered;
    }

    if ctx.checker.is_duplicate(&page.url, &page.content, &page.title) {
        return PageOutcome::Duplicate;
    }

    let record = PageRecord::from_fetch(&page, signals::detect_markers(&page.content));
    let discovered = if entry.depth < ctx.config.max_depth {
        discover(ctx, &entry, &page)
    } else {
        Vec::new()
    };
    PageOutcome::Accepted {
        record,
        content: page.content,
        discovered,
    }
}

/// Extracts and resolves candidate URLs found on a page
fn discover(ctx: &TaskContext, entry: &FrontierEntry, page: &FetchResult) -> Vec<FrontierEntry> {
    let Ok(base) = Url::parse(&page.url) else {
        return Vec::new();
    };
    let candidates = extractor::extract_candidates(&page.content);
    let mut seen = HashSet::new();
    ctx.resolver
        .resolve_all(&base, &candidates)
        .map(String::from)
        .filter(|url| seen.insert(url.clone()))
        .map(|url| FrontierEntry::discovered(url, entry.depth + 1, entry.url.clone()))
        .collect()
}
