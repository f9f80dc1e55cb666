//! Crawl scope: registrable-domain roots of the seeds plus a whitelist

use std::collections::HashSet;
use std::net::IpAddr;
use url::Url;

/// Returns the registrable domain of a host
///
/// IP addresses and single-label hosts are their own root. Hosts the public
/// suffix list cannot place fall back to the host itself.
pub fn root_domain(host: &str) -> String {
    let host = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();
    if host.parse::<IpAddr>().is_ok() || !host.contains('.') {
        return host;
    }
    psl::domain_str(&host)
        .map(str::to_string)
        .unwrap_or(host)
}

/// Set of root domains a crawl may visit
#[derive(Debug, Clone, Default)]
pub struct Scope {
    roots: HashSet<String>,
}

impl Scope {
    /// Builds the scope from seed URLs and whitelisted domains
    ///
    /// Seeds without a scheme are read as https. Whitelist entries may be
    /// bare domains or URLs.
    pub fn new(seeds: &[String], whitelist: &[String]) -> Self {
        let mut scope = Self::default();
        for entry in seeds.iter().chain(whitelist) {
            scope.add(entry);
        }
        scope
    }

    /// Adds the root domain of a URL or bare domain
    pub fn add(&mut self, entry: &str) {
        let entry = entry.trim();
        if entry.is_empty() {
            return;
        }
        let host = Url::parse(&with_scheme(entry))
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        match host {
            Some(host) => {
                self.roots.insert(root_domain(&host));
            }
            None => tracing::warn!("Ignoring unusable scope entry: {entry}"),
        }
    }

    /// Whether the host's root domain is in scope
    pub fn allows_host(&self, host: &str) -> bool {
        self.roots.contains(&root_domain(host))
    }

    /// Whether the URL's host is in scope
    pub fn allows(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|h| self.allows_host(h))
    }
}

/// Prefixes `https://` when the input carries no scheme
pub fn with_scheme(url: &str) -> String {
    let url = url.trim();
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}
