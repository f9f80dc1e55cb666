//! Outputs for accepted pages

pub mod console;
pub mod jsonl;

use crate::error::Result;
use crate::models::PageRecord;

pub use console::ConsoleSink;
pub use jsonl::JsonlSink;

/// Receives every page the crawler accepts
///
/// `content` is the raw page body (with captured script URLs for rendered
/// pages), for consumers that analyse it further.
pub trait PageSink: Send + Sync {
    fn on_page(&self, record: &PageRecord, content: &str) -> Result<()>;
}
