//! JSONL (JSON Lines) page records, one JSON object per line

use super::PageSink;
use crate::error::Result;
use crate::models::PageRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// Appends each accepted page record to a JSONL file as it arrives
pub struct JsonlSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlSink {
    /// Creates (or truncates) the output file
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        info!("Writing page records to {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageSink for JsonlSink {
    fn on_page(&self, record: &PageRecord, _content: &str) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{line}")?;
        // Flushed per record so partial runs leave a readable file
        writer.flush()?;
        Ok(())
    }
}

/// Reads back a JSONL record file
pub fn read_records(path: &Path) -> Result<Vec<PageRecord>> {
    let text = std::fs::read_to_string(path)?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FetchResult;

    #[test]
    fn test_records_written_one_per_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out").join("pages.jsonl");
        let sink = JsonlSink::create(&path).expect("create sink");

        for i in 0..3 {
            let page = FetchResult::new(
                format!("https://example.com/page/{i}"),
                200,
                format!("<title>Page {i}</title>"),
                "text/html",
            );
            sink.on_page(&PageRecord::from_fetch(&page, vec!["login".to_string()]), &page.content)
                .expect("write record");
        }

        let records = read_records(sink.path()).expect("read back");
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].url, "https://example.com/page/1");
        assert_eq!(records[2].title, "Page 2");
        assert_eq!(records[0].markers, vec!["login".to_string()]);
    }
}
