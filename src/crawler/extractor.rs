//! Endpoint discovery from page and script content
//!
//! Scans any text (HTML, inline or external JavaScript, JSON) for quoted
//! literals that look like URLs or paths. Matching favors recall: scope and
//! extension filtering happen later in the resolver.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Quoted URL-like literal, four alternatives:
/// 1. scheme-qualified or protocol-relative URL with a dotted host
/// 2. root or dot relative path (`/x`, `./x`, `../x`)
/// 3. relative path with a directory and an extension (`api/v1/user.json`)
/// 4. bare filename with a known server-side or data extension
static CANDIDATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"["']("#,
        r#"(?:[a-zA-Z]{1,10}://|//)[^"'/]+\.[a-zA-Z]{2,}[^"']*"#,
        r#"|(?:/|\.\./|\./)[^"'><,;| *()%$^/\\\[\]][^"'><,;|()]+"#,
        r#"|[a-zA-Z0-9_\-/]+/[a-zA-Z0-9_\-/]+\.(?:[a-zA-Z]{1,4}|action)(?:[?/][^"']*)?"#,
        r#"|[a-zA-Z0-9_\-]+\.(?:php|aspx|asp|jsp|json|action|html|js|txt|xml)(?:\?[^"']*)?"#,
        r#")["']"#,
    ))
    .expect("candidate pattern is valid")
});

/// Extracts candidate endpoint strings, deduplicated in first-seen order
pub fn extract_candidates(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    CANDIDATE_RE
        .captures_iter(content)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str())
        .filter(|candidate| seen.insert(*candidate))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_html() {
        let html = r#"
            <html><body>
                <a href="/about">About</a>
                <a href="https://example.com/contact">Contact</a>
                <form action='./login.php' method="post"></form>
                <script src="//cdn.example.com/app.js"></script>
            </body></html>
        "#;
        let found = extract_candidates(html);
        assert!(found.contains(&"/about".to_string()));
        assert!(found.contains(&"https://example.com/contact".to_string()));
        assert!(found.contains(&"./login.php".to_string()));
        assert!(found.contains(&"//cdn.example.com/app.js".to_string()));
    }

    #[test]
    fn test_extract_from_js() {
        let js = r#"
            fetch("/api/v1/users");
            axios.get('api/v2/orders.json?page=1');
            const cfg = { report: "export.action", help: "readme.txt" };
            var label = "hello world";
        "#;
        let found = extract_candidates(js);
        assert!(found.contains(&"/api/v1/users".to_string()));
        assert!(found.contains(&"api/v2/orders.json?page=1".to_string()));
        assert!(found.contains(&"export.action".to_string()));
        assert!(found.contains(&"readme.txt".to_string()));
        assert!(!found.iter().any(|f| f.contains("hello")));
    }

    #[test]
    fn test_deduplicates_in_first_seen_order() {
        let js = r#"a("/beta"); c("/alpha"); d("/beta"); e('/alpha');"#;
        assert_eq!(
            extract_candidates(js),
            vec!["/beta".to_string(), "/alpha".to_string()]
        );
    }

    #[test]
    fn test_ignores_plain_words_and_operators() {
        let js = r#"x = "/"; y = "a / b"; z = "word";"#;
        assert!(extract_candidates(js).is_empty());
    }
}
