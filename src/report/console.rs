//! Colored one-line summaries of accepted pages

use super::PageSink;
use crate::error::Result;
use crate::models::PageRecord;
use colored::Colorize;

/// Prints each accepted page to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl PageSink for ConsoleSink {
    fn on_page(&self, record: &PageRecord, _content: &str) -> Result<()> {
        println!("{}", format_record(record));
        Ok(())
    }
}

/// Renders a record as `[status] url  title  (bytes) markers`
pub fn format_record(record: &PageRecord) -> String {
    let status = format!("[{}]", record.status);
    let status = match record.status {
        200..=299 => status.green(),
        300..=399 => status.yellow(),
        _ => status.red(),
    };
    let mut line = format!(
        "  {} {}  {}  ({} bytes)",
        status,
        record.url,
        record.title.bold(),
        record.content_length
    );
    if record.is_javascript {
        line.push_str(&format!(" {}", "js".cyan()));
    }
    if !record.markers.is_empty() {
        line.push_str(&format!(" {}", record.markers.join(",").magenta().bold()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FetchResult;

    #[test]
    fn test_format_record_includes_markers() {
        colored::control::set_override(false);
        let page = FetchResult::new(
            "https://example.com/login",
            200,
            "<title>Sign in</title>".to_string(),
            "text/html",
        );
        let record = PageRecord::from_fetch(&page, vec!["login".to_string()]);
        let line = format_record(&record);
        assert!(line.contains("[200] https://example.com/login"));
        assert!(line.contains("Sign in"));
        assert!(line.contains("login"));
    }
}
