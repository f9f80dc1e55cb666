//! Integration tests for the duplicate gate, the resolver and scope

use reconnoiter::crawler::extractor::extract_candidates;
use reconnoiter::crawler::resolver::{Rejection, UrlResolver};
use reconnoiter::dedup::DuplicateChecker;
use reconnoiter::models::{default_blocked_extensions, DedupConfig};
use reconnoiter::scope::Scope;
use std::sync::Arc;
use url::Url;

fn checker(config: DedupConfig) -> DuplicateChecker {
    DuplicateChecker::new(config, Scope::new(&["https://example.com".to_string()], &[]))
}

fn article(title: &str, paragraphs: &[&str]) -> String {
    let body: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
    format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head>\
         <body><div class=\"post\">{body}</div></body></html>"
    )
}

const NEWS: &[&str] = &[
    "The city council approved the new budget after a long debate on Tuesday evening",
    "Funding for public parks and libraries will increase by twelve percent next year",
    "Several members raised concerns about the cost of the transit expansion project",
    "A final vote on the transit plan is expected before the end of the summer session",
];

#[test]
fn test_title_capacity_evicts_oldest_titles() {
    let checker = checker(DedupConfig {
        max_titles_per_domain: 10,
        eviction_ratio: 0.5,
        ..DedupConfig::default()
    });
    for i in 0..10 {
        assert!(!checker.check_title("example.com", &format!("Product number {i:02}")));
    }
    // the eleventh title triggers eviction of the oldest half
    assert!(!checker.check_title("example.com", "Product number 10"));
    assert!(!checker.check_title("example.com", "Product number 00"));
    assert!(checker.check_title("example.com", "Product number 09"));
}

#[test]
fn test_near_duplicate_articles() {
    let checker = checker(DedupConfig {
        title_enabled: false,
        content_threshold: Some(80),
        ..DedupConfig::default()
    });
    let original = article("Council news", NEWS);
    // same text under a different layout with an inline tracker
    let restyled = format!(
        "<!DOCTYPE html><html><body><main><article>{}</article></main>\
         <script>var tracking = {{ id: 42 }};</script></body></html>",
        NEWS.iter().map(|p| format!("<section>{p}</section>")).collect::<String>()
    );
    let unrelated = article(
        "Recipes",
        &[
            "Whisk the eggs with sugar until pale and fold in the sifted flour gently",
            "Bake in a preheated oven for twenty five minutes until golden brown on top",
        ],
    );

    assert!(!checker.is_duplicate("https://example.com/news/1", &original, ""));
    assert!(checker.is_duplicate("https://example.com/news/1?ref=home", &restyled, ""));
    assert!(!checker.is_duplicate("https://example.com/recipes", &unrelated, ""));
}

#[test]
fn test_fingerprints_are_kept_per_domain() {
    let checker = checker(DedupConfig {
        title_enabled: false,
        content_threshold: Some(90),
        ..DedupConfig::default()
    });
    let page = article("Council news", NEWS);
    assert!(!checker.is_duplicate("https://example.com/a", &page, ""));
    assert!(!checker.is_duplicate("https://blog.example.com/a", &page, ""));
    assert!(!checker.is_duplicate("https://example.com:8443/a", &page, ""));
    assert!(checker.is_duplicate("https://example.com/b", &page, ""));
}

#[test]
fn test_same_template_pages_share_dom_fingerprint() {
    let checker = checker(DedupConfig {
        title_enabled: false,
        dom_threshold: Some(95),
        ..DedupConfig::default()
    });
    let first = article("Item one", &["red shoes", "size 42"]);
    let second = article("Item two", &["blue hat", "one size fits all"]);
    let different = "<!DOCTYPE html><html><body><table><tr><td>1</td></tr></table>\
                     <form><input><button>go</button></form></body></html>";

    assert!(!checker.is_duplicate("https://example.com/item/1", &first, ""));
    assert!(checker.is_duplicate("https://example.com/item/2", &second, ""));
    assert!(!checker.is_duplicate("https://example.com/search", different, ""));
}

#[test]
fn test_shared_checker_across_tasks() {
    let checker = Arc::new(checker(DedupConfig::default()));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let checker = Arc::clone(&checker);
            std::thread::spawn(move || {
                let url = format!("https://example.com/page/{i}");
                assert!(checker.is_valid_url(&url));
                checker.mark_visited(&url);
                checker.is_duplicate(&url, "<html></html>", "Shared landing title")
            })
        })
        .collect();
    let duplicates = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .filter(|dup| *dup)
        .count();
    assert_eq!(duplicates, 3);
    assert_eq!(checker.visited_count(), 4);
    assert!(!checker.is_valid_url("https://example.com/page/2"));
    assert!(checker.is_valid_url("https://example.com/page/9"));
}

#[test]
fn test_script_endpoints_resolve_into_scope() {
    let base = Url::parse("https://app.example.com/static/js/main.js").expect("base");
    let resolver = UrlResolver::new(&[], &default_blocked_extensions());
    let script = r#"
        const api = "/api/v2/users";
        fetch('api/orders.json');
        const cdn = "//cdn.example.com/lib/app.js";
        const logo = "/img/logo.png";
        const tracker = "https://tracker.other.net/pixel";
        window.location = "javascript:void(0)";
    "#;
    let candidates = extract_candidates(script);
    let resolved: Vec<String> = resolver
        .resolve_all(&base, &candidates)
        .map(String::from)
        .collect();

    assert_eq!(
        resolved,
        vec![
            "https://app.example.com/api/v2/users".to_string(),
            "https://app.example.com/static/js/api/orders.json".to_string(),
            "https://cdn.example.com/lib/app.js".to_string(),
        ]
    );
    assert_eq!(
        resolver.resolve(&base, "/img/logo.png"),
        Err(Rejection::BlockedExtension("png".to_string()))
    );
    assert_eq!(
        resolver.resolve(&base, "https://tracker.other.net/pixel"),
        Err(Rejection::OutOfScope("tracker.other.net".to_string()))
    );
}
