//! Browser User-Agent rotation and per-request header assembly

use rand::seq::SliceRandom;
use std::collections::HashMap;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.80",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
];

/// Picks a desktop or mobile browser User-Agent at random
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Builds the header list for one request
///
/// Starts from a User-Agent (the fixed one if given, otherwise random) and
/// applies the overrides on top, matching names case-insensitively.
pub fn request_headers(
    overrides: &HashMap<String, String>,
    fixed_user_agent: Option<&str>,
) -> Vec<(String, String)> {
    let user_agent = fixed_user_agent.unwrap_or_else(|| random_user_agent());
    let mut headers = vec![("User-Agent".to_string(), user_agent.to_string())];

    let mut names: Vec<&String> = overrides.keys().collect();
    names.sort();
    for name in names {
        let value = &overrides[name];
        match headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value.clone(),
            None => headers.push((name.clone(), value.clone())),
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_user_agent_is_known() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn test_overrides_replace_user_agent_case_insensitively() {
        let mut overrides = HashMap::new();
        overrides.insert("user-agent".to_string(), "custom/1.0".to_string());
        overrides.insert("Cookie".to_string(), "sid=abc".to_string());
        let headers = request_headers(&overrides, None);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0], ("User-Agent".to_string(), "custom/1.0".to_string()));
        assert!(headers.contains(&("Cookie".to_string(), "sid=abc".to_string())));
    }

    #[test]
    fn test_fixed_user_agent() {
        let headers = request_headers(&HashMap::new(), Some("scanner/2"));
        assert_eq!(headers, vec![("User-Agent".to_string(), "scanner/2".to_string())]);
    }
}
