//! Candidate URL canonicalization and scope filtering
//!
//! Turns raw strings pulled out of a page into absolute, in-scope URLs. The
//! candidate's lexical form decides how it is combined with the page it was
//! found on.

use crate::scope::{root_domain, Scope};
use thiserror::Error;
use url::Url;

/// Schemes that never lead to a fetchable page
const UNFETCHABLE_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "about:"];

const MIME_TOP_LEVEL: &[&str] = &[
    "application", "audio", "font", "image", "message", "model", "multipart", "text", "video",
];

/// Extensions that look like TLDs but are far more likely file names
const FILE_EXTENSIONS: &[&str] = &[
    "php", "asp", "aspx", "jsp", "json", "action", "html", "htm", "js", "txt", "xml", "zip",
    "mov", "pdf", "do", "cgi", "map", "css",
];

/// Why a candidate was not turned into a frontier URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("empty candidate")]
    Empty,
    #[error("unsupported scheme")]
    UnsupportedScheme,
    #[error("not a usable URL")]
    Malformed,
    #[error("blocked extension .{0}")]
    BlockedExtension(String),
    #[error("host {0} is out of scope")]
    OutOfScope(String),
}

/// Resolves extracted candidates against the page they were found on
#[derive(Debug, Clone)]
pub struct UrlResolver {
    whitelist: Scope,
    blocked_extensions: Vec<String>,
}

impl UrlResolver {
    pub fn new(whitelist: &[String], blocked_extensions: &[String]) -> Self {
        Self {
            whitelist: Scope::new(&[], whitelist),
            blocked_extensions: blocked_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Resolves one candidate into an absolute in-scope URL
    pub fn resolve(&self, base: &Url, candidate: &str) -> Result<Url, Rejection> {
        let candidate = candidate.trim().replace('\\', "/");
        if candidate.is_empty() {
            return Err(Rejection::Empty);
        }
        if candidate.chars().any(char::is_whitespace) || is_mime_type(&candidate) {
            return Err(Rejection::Malformed);
        }
        let lower = candidate.to_ascii_lowercase();
        if UNFETCHABLE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return Err(Rejection::UnsupportedScheme);
        }

        let mut url = compose(base, &candidate, &lower)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Rejection::UnsupportedScheme);
        }
        let collapsed = collapse_slashes(url.path());
        url.set_path(&collapsed);
        url.set_fragment(None);

        if let Some(ext) = path_extension(&url) {
            if self.blocked_extensions.contains(&ext) {
                return Err(Rejection::BlockedExtension(ext));
            }
        }

        let host = url.host_str().ok_or(Rejection::Malformed)?;
        let same_root = base
            .host_str()
            .is_some_and(|base_host| root_domain(base_host) == root_domain(host));
        if !same_root && !self.whitelist.allows_host(host) {
            return Err(Rejection::OutOfScope(host.to_string()));
        }
        Ok(url)
    }

    /// Resolves every candidate, keeping the accepted ones in input order
    pub fn resolve_all<'a>(
        &'a self,
        base: &'a Url,
        candidates: &'a [String],
    ) -> impl Iterator<Item = Url> + 'a {
        candidates.iter().filter_map(move |c| match self.resolve(base, c) {
            Ok(url) => Some(url),
            Err(reason) => {
                tracing::trace!("Rejected candidate {c}: {reason}");
                None
            }
        })
    }
}

/// Combines a candidate with the base according to its lexical form
fn compose(base: &Url, candidate: &str, lower: &str) -> Result<Url, Rejection> {
    if candidate.starts_with("//") {
        return Url::parse(&format!("{}:{candidate}", base.scheme()))
            .map_err(|_| Rejection::Malformed);
    }
    if candidate.starts_with('/') || candidate.starts_with("./") || candidate.starts_with("../") {
        return base.join(candidate).map_err(|_| Rejection::Malformed);
    }
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Url::parse(candidate).map_err(|_| Rejection::Malformed);
    }
    if candidate.contains("://") {
        return Err(Rejection::UnsupportedScheme);
    }
    if is_potential_domain(candidate) {
        return Url::parse(&format!("{}://{candidate}", base.scheme()))
            .map_err(|_| Rejection::Malformed);
    }
    base.join(candidate).map_err(|_| Rejection::Malformed)
}

/// Whether a scheme-less candidate starts with something that reads as a host
///
/// The first segment must be dotted and end in a known public suffix that
/// is not also a common file extension.
pub fn is_potential_domain(candidate: &str) -> bool {
    let head = candidate
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = head.split(':').next().unwrap_or_default().to_ascii_lowercase();
    if !host.contains('.') || host.starts_with('.') || host.ends_with('.') {
        return false;
    }
    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return false;
    }
    let Some(tld) = host.rsplit('.').next() else {
        return false;
    };
    if FILE_EXTENSIONS.contains(&tld) {
        return false;
    }
    psl::suffix(host.as_bytes()).is_some_and(|s| s.is_known())
}

fn is_mime_type(candidate: &str) -> bool {
    let mut parts = candidate.splitn(2, '/');
    let (Some(top), Some(sub)) = (parts.next(), parts.next()) else {
        return false;
    };
    MIME_TOP_LEVEL.contains(&top.to_ascii_lowercase().as_str())
        && !sub.is_empty()
        && sub
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' && previous_slash {
            continue;
        }
        previous_slash = c == '/';
        out.push(c);
    }
    out
}

/// Lowercased extension of the last path segment, if any
fn path_extension(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_blocked_extensions;

    fn resolver() -> UrlResolver {
        UrlResolver::new(&["partner.io".to_string()], &default_blocked_extensions())
    }

    fn base() -> Url {
        Url::parse("https://x.com/p/q").expect("base url")
    }

    fn resolved(candidate: &str) -> String {
        resolver()
            .resolve(&base(), candidate)
            .map(|u| u.to_string())
            .unwrap_or_else(|e| panic!("{candidate} rejected: {e}"))
    }

    #[test]
    fn test_lexical_forms() {
        assert_eq!(resolved("/a/b"), "https://x.com/a/b");
        assert_eq!(resolved("./c"), "https://x.com/p/c");
        assert_eq!(resolved("../up"), "https://x.com/up");
        assert_eq!(resolved("api/user.json"), "https://x.com/p/api/user.json");
        assert_eq!(resolved("http://www.x.com/login"), "http://www.x.com/login");
        let cdn = resolver()
            .resolve(&Url::parse("https://x.com/p").expect("base"), "//cdn.x.com/f.js")
            .expect("protocol relative");
        assert_eq!(cdn.as_str(), "https://cdn.x.com/f.js");
    }

    #[test]
    fn test_bare_domain_becomes_host() {
        assert_eq!(resolved("static.x.com/app/main.js"), "https://static.x.com/app/main.js");
        // looks dotted but the suffix is a file extension
        assert_eq!(resolved("index.php"), "https://x.com/p/index.php");
    }

    #[test]
    fn test_collapses_slashes_and_strips_fragment() {
        assert_eq!(resolved("/a//b///c#top"), "https://x.com/a/b/c");
    }

    #[test]
    fn test_out_of_scope_hosts_rejected() {
        let r = resolver();
        assert!(matches!(
            r.resolve(&base(), "https://evil.test/x"),
            Err(Rejection::OutOfScope(_))
        ));
        assert!(r.resolve(&base(), "https://api.partner.io/v1").is_ok());
        let evil = Url::parse("https://evil.test/").expect("base");
        assert!(r.resolve(&evil, "/x").is_ok());
    }

    #[test]
    fn test_blocked_extensions_rejected() {
        let r = resolver();
        for candidate in ["/logo.png", "/fonts/a.woff2", "/media/intro.MP4", "//x.com/s.css"] {
            assert!(
                matches!(r.resolve(&base(), candidate), Err(Rejection::BlockedExtension(_))),
                "{candidate} should be blocked"
            );
        }
        assert!(r.resolve(&base(), "/page.html").is_ok());
    }

    #[test]
    fn test_unfetchable_and_malformed() {
        let r = resolver();
        assert_eq!(r.resolve(&base(), "  "), Err(Rejection::Empty));
        assert_eq!(
            r.resolve(&base(), "javascript:void(0)"),
            Err(Rejection::UnsupportedScheme)
        );
        assert_eq!(
            r.resolve(&base(), "mailto:admin@x.com"),
            Err(Rejection::UnsupportedScheme)
        );
        assert_eq!(
            r.resolve(&base(), "ftp://x.com/file"),
            Err(Rejection::UnsupportedScheme)
        );
        assert_eq!(r.resolve(&base(), "application/json"), Err(Rejection::Malformed));
        assert_eq!(r.resolve(&base(), "/a b"), Err(Rejection::Malformed));
    }

    #[test]
    fn test_backslashes_normalized() {
        assert_eq!(resolved("\\admin\\users"), "https://x.com/admin/users");
    }

    #[test]
    fn test_is_potential_domain() {
        assert!(is_potential_domain("cdn.example.com/lib.js"));
        assert!(is_potential_domain("example.co.uk"));
        assert!(!is_potential_domain("main.js"));
        assert!(!is_potential_domain("api/v1"));
        assert!(!is_potential_domain("config.json"));
    }
}
