//! SimHash fingerprints for near-duplicate detection
//!
//! Text is reduced to weighted tokens, every token is hashed to 64 bits and
//! the hashes vote per bit position. Similar inputs end up with fingerprints a
//! small Hamming distance apart.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use xxhash_rust::xxh3::xxh3_64;

/// CJK ideograph runs or runs of letters/digits
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\p{Han}+|[\p{L}\p{N}&&\P{Han}]+").expect("token pattern is valid")
});

static SKELETON_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[^<>]+>").expect("tag pattern is valid"));

const SHINGLE_WIDTH: usize = 4;

const STOP_WORDS: &[&str] = &[
    // Chinese function words
    "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "一个", "上", "也",
    "很", "到", "说", "要", "去", "你", "会", "着", "没有", "看", "好", "自己", "这",
    // English function words
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "his", "how", "its", "of", "to", "in", "is", "it", "on", "or",
    "as", "at", "be", "by", "an", "we", "with", "this", "that", "from", "your",
];

/// A 64-bit locality-sensitive fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Fingerprints natural-language text
    pub fn from_text(text: &str) -> Self {
        Self::from_tokens(text_features(text))
    }

    /// Fingerprints a DOM skeleton string using overlapping tag shingles
    pub fn from_skeleton(skeleton: &str) -> Self {
        Self::from_tokens(skeleton_features(skeleton))
    }

    /// Combines tokens by bit voting, weighting each distinct token by its frequency
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut weights: HashMap<u64, i64> = HashMap::new();
        for token in tokens {
            *weights.entry(xxh3_64(token.as_ref().as_bytes())).or_insert(0) += 1;
        }

        let mut votes = [0i64; 64];
        for (hash, weight) in weights {
            for (bit, vote) in votes.iter_mut().enumerate() {
                if hash & (1u64 << bit) != 0 {
                    *vote += weight;
                } else {
                    *vote -= weight;
                }
            }
        }

        let value = votes
            .iter()
            .enumerate()
            .filter(|(_, vote)| **vote > 0)
            .fold(0u64, |acc, (bit, _)| acc | (1u64 << bit));
        Fingerprint(value)
    }

    /// Number of differing bits
    pub fn hamming_distance(&self, other: &Fingerprint) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Similarity in [0, 1]: 1 - hamming / 64
    pub fn similarity(&self, other: &Fingerprint) -> f64 {
        1.0 - f64::from(self.hamming_distance(other)) / 64.0
    }
}

/// Fingerprints text; see [`Fingerprint::from_text`]
pub fn fingerprint(text: &str) -> u64 {
    Fingerprint::from_text(text).0
}

/// Fingerprints a DOM skeleton; see [`Fingerprint::from_skeleton`]
pub fn skeleton_fingerprint(skeleton: &str) -> u64 {
    Fingerprint::from_skeleton(skeleton).0
}

/// Similarity of two raw fingerprints in [0, 1]
pub fn similarity(a: u64, b: u64) -> f64 {
    Fingerprint(a).similarity(&Fingerprint(b))
}

/// Splits mixed-script text into features
///
/// CJK runs become overlapping character bigrams, other runs are lowercased.
/// Single-character tokens and stop words are dropped.
pub fn text_features(text: &str) -> Vec<String> {
    let mut features = Vec::new();
    for m in TOKEN_RE.find_iter(text) {
        let word = m.as_str();
        if word.chars().next().is_some_and(is_han) {
            let chars: Vec<char> = word.chars().collect();
            features.extend(chars.windows(2).map(|pair| pair.iter().collect::<String>()));
        } else {
            features.push(word.to_lowercase());
        }
    }
    features.retain(|w| w.chars().count() > 1 && !STOP_WORDS.contains(&w.as_str()));
    features
}

/// Splits a skeleton into overlapping windows of consecutive tags
pub fn skeleton_features(skeleton: &str) -> Vec<String> {
    let tags: Vec<&str> = SKELETON_TAG_RE
        .find_iter(skeleton)
        .map(|m| m.as_str())
        .collect();
    if tags.len() < SHINGLE_WIDTH {
        return vec![tags.concat()];
    }
    tags.windows(SHINGLE_WIDTH).map(|w| w.concat()).collect()
}

fn is_han(c: char) -> bool {
    matches!(c,
        '\u{4e00}'..='\u{9fff}'
        | '\u{3400}'..='\u{4dbf}'
        | '\u{f900}'..='\u{faff}'
        | '\u{20000}'..='\u{2a6df}')
}
