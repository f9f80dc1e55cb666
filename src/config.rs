//! Configuration management: TOML files, CLI overrides and list files

use crate::error::{ReconError, Result};
use crate::models::{DedupConfig, ScanConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// File-based configuration structure matching config/default.toml
#[derive(Debug, Default, Deserialize, Serialize)]
struct FileConfig {
    scan: Option<ScanSection>,
    dedup: Option<DedupConfig>,
    scope: Option<ScopeSection>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct ScanSection {
    threads: Option<usize>,
    timeout_secs: Option<u64>,
    max_depth: Option<u32>,
    batch_size: Option<usize>,
    user_agent: Option<String>,
    proxy: Option<String>,
    rate_limit: Option<u32>,
    render: Option<bool>,
    visible: Option<bool>,
    skip_status_from: Option<u16>,
    min_content_length: Option<usize>,
    max_fetch_bytes: Option<usize>,
    blocked_extensions: Option<Vec<String>>,
    output: Option<String>,
    headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct ScopeSection {
    targets: Option<Vec<String>>,
    whitelist: Option<Vec<String>>,
}

/// Loads configuration from a TOML file and merges with defaults
pub fn load_config(path: &Path) -> Result<ScanConfig> {
    let content = std::fs::read_to_string(path).map_err(ReconError::IoError)?;
    parse_config(&content)
}

/// Parses TOML configuration text over the defaults
pub fn parse_config(content: &str) -> Result<ScanConfig> {
    let file_config: FileConfig = toml::from_str(content)?;
    let mut config = ScanConfig::default();

    if let Some(scan) = file_config.scan {
        if let Some(threads) = scan.threads {
            config.threads = threads;
        }
        if let Some(timeout) = scan.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(depth) = scan.max_depth {
            config.max_depth = depth;
        }
        if let Some(batch) = scan.batch_size {
            config.batch_size = batch;
        }
        if scan.user_agent.is_some() {
            config.user_agent = scan.user_agent;
        }
        if scan.proxy.is_some() {
            config.proxy = scan.proxy;
        }
        if scan.rate_limit.is_some() {
            config.rate_limit = scan.rate_limit;
        }
        if let Some(render) = scan.render {
            config.render = render;
        }
        if let Some(visible) = scan.visible {
            config.visible = visible;
        }
        if let Some(status) = scan.skip_status_from {
            config.skip_status_from = status;
        }
        if let Some(len) = scan.min_content_length {
            config.min_content_length = len;
        }
        if let Some(cap) = scan.max_fetch_bytes {
            config.max_fetch_bytes = cap;
        }
        if let Some(exts) = scan.blocked_extensions {
            config.blocked_extensions = exts;
        }
        if scan.output.is_some() {
            config.output = scan.output;
        }
        if let Some(headers) = scan.headers {
            config.headers.extend(headers);
        }
    }

    if let Some(dedup) = file_config.dedup {
        config.dedup = dedup;
    }

    if let Some(scope) = file_config.scope {
        if let Some(targets) = scope.targets {
            config.targets = targets;
        }
        if let Some(whitelist) = scope.whitelist {
            config.whitelist = whitelist;
        }
    }

    Ok(config)
}

/// Renders a configuration as TOML in the file layout `load_config` reads
pub fn to_toml(config: &ScanConfig) -> Result<String> {
    let file_config = FileConfig {
        scan: Some(ScanSection {
            threads: Some(config.threads),
            timeout_secs: Some(config.timeout_secs),
            max_depth: Some(config.max_depth),
            batch_size: Some(config.batch_size),
            user_agent: config.user_agent.clone(),
            proxy: config.proxy.clone(),
            rate_limit: config.rate_limit,
            render: Some(config.render),
            visible: Some(config.visible),
            skip_status_from: Some(config.skip_status_from),
            min_content_length: Some(config.min_content_length),
            max_fetch_bytes: Some(config.max_fetch_bytes),
            blocked_extensions: Some(config.blocked_extensions.clone()),
            output: config.output.clone(),
            headers: Some(config.headers.clone()),
        }),
        dedup: Some(config.dedup.clone()),
        scope: Some(ScopeSection {
            targets: Some(config.targets.clone()),
            whitelist: Some(config.whitelist.clone()),
        }),
    };
    Ok(toml::to_string_pretty(&file_config)?)
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub targets: Vec<String>,
    pub whitelist: Vec<String>,
    pub threads: Option<usize>,
    pub timeout: Option<u64>,
    pub max_depth: Option<u32>,
    pub batch_size: Option<usize>,
    pub proxy: Option<String>,
    pub rate_limit: Option<u32>,
    /// Headers in `"Key: Value"` form
    pub headers: Vec<String>,
    pub title_dedup: Option<bool>,
    pub length_dedup: bool,
    pub content_threshold: Option<u8>,
    pub dom_threshold: Option<u8>,
    pub output: Option<String>,
    pub render: bool,
    pub visible: bool,
}

/// Merges CLI arguments into an existing ScanConfig
///
/// Targets and whitelist entries from the CLI are added to those of the file.
pub fn merge_cli_args(config: &mut ScanConfig, cli: CliOverrides) {
    config.targets.extend(cli.targets);
    config.whitelist.extend(cli.whitelist);

    if let Some(t) = cli.threads {
        config.threads = t;
    }
    if let Some(t) = cli.timeout {
        config.timeout_secs = t;
    }
    if let Some(d) = cli.max_depth {
        config.max_depth = d;
    }
    if let Some(b) = cli.batch_size {
        config.batch_size = b;
    }
    if let Some(p) = cli.proxy {
        config.proxy = Some(p);
    }
    if let Some(r) = cli.rate_limit {
        config.rate_limit = Some(r);
    }
    for header in cli.headers {
        if let Some((key, value)) = header.split_once(':') {
            config
                .headers
                .insert(key.trim().to_string(), value.trim().to_string());
        } else {
            tracing::warn!("Ignoring malformed header (expected \"Key: Value\"): {header}");
        }
    }
    if let Some(enabled) = cli.title_dedup {
        config.dedup.title_enabled = enabled;
    }
    if cli.length_dedup {
        config.dedup.length_enabled = true;
    }
    if cli.content_threshold.is_some() {
        config.dedup.content_threshold = cli.content_threshold;
    }
    if cli.dom_threshold.is_some() {
        config.dedup.dom_threshold = cli.dom_threshold;
    }
    if cli.output.is_some() {
        config.output = cli.output;
    }
    if cli.render {
        config.render = true;
    }
    if cli.visible {
        config.visible = true;
    }
}

/// Reads a list file: one entry per line, blank lines and `#` comments skipped
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ReconError::ConfigError(format!("Cannot read {}: {e}", path.display()))
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
