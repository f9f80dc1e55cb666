//! Bounded per-domain indices used by the duplicate checker
//!
//! Every collection here is capacity-bounded: a full set drops its oldest
//! entries in one batch, and the number of tracked domains is capped with
//! least-recently-touched eviction of a whole domain.

use super::simhash::Fingerprint;
use lru::LruCache;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Insertion-ordered set that evicts its oldest entries in batches
#[derive(Debug, Clone)]
pub struct BoundedSet<T> {
    members: HashSet<T>,
    order: VecDeque<T>,
    capacity: usize,
    eviction_batch: usize,
}

impl<T: Eq + Hash + Clone> BoundedSet<T> {
    /// Creates a set holding at most `capacity` entries, dropping
    /// `capacity * eviction_ratio` entries (at least one) when it overflows
    pub fn new(capacity: usize, eviction_ratio: f64) -> Self {
        let capacity = capacity.max(1);
        let ratio = if eviction_ratio > 0.0 && eviction_ratio <= 1.0 {
            eviction_ratio
        } else {
            0.2
        };
        let eviction_batch = ((capacity as f64 * ratio).ceil() as usize).max(1);
        Self {
            members: HashSet::new(),
            order: VecDeque::new(),
            capacity,
            eviction_batch,
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.members.contains(value)
    }

    /// Inserts a value, returning false if it was already present
    pub fn insert(&mut self, value: T) -> bool {
        if !self.members.insert(value.clone()) {
            return false;
        }
        self.order.push_back(value);
        if self.order.len() > self.capacity {
            let excess = self.order.len() - self.capacity;
            for _ in 0..self.eviction_batch.max(excess) {
                if let Some(old) = self.order.pop_front() {
                    self.members.remove(&old);
                }
            }
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Domain-keyed map with least-recently-touched eviction of whole domains
#[derive(Debug)]
pub struct DomainIndex<V> {
    domains: LruCache<String, V>,
}

impl<V> DomainIndex<V> {
    pub fn new(max_domains: usize) -> Self {
        let cap = NonZeroUsize::new(max_domains.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            domains: LruCache::new(cap),
        }
    }

    /// Returns the domain's entry, creating it (and possibly evicting the
    /// least recently touched domain) if missing
    pub fn entry(&mut self, domain: &str, create: impl FnOnce() -> V) -> &mut V {
        if !self.domains.contains(domain) && self.domains.len() == self.domains.cap().get() {
            if let Some((evicted, _)) = self.domains.peek_lru() {
                tracing::debug!("Evicting dedup state for domain {evicted}");
            }
        }
        self.domains.get_or_insert_mut(domain.to_string(), create)
    }

    pub fn get(&self, domain: &str) -> Option<&V> {
        self.domains.peek(domain)
    }

    /// Number of tracked domains
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Per-domain bounded sets of exact values (titles, content lengths)
#[derive(Debug)]
pub struct SeenIndex<T> {
    domains: DomainIndex<BoundedSet<T>>,
    capacity: usize,
    eviction_ratio: f64,
}

/// Normalized page titles per domain
pub type TitleIndex = SeenIndex<String>;

/// Content lengths per domain
pub type LengthIndex = SeenIndex<usize>;

impl<T: Eq + Hash + Clone> SeenIndex<T> {
    pub fn new(max_domains: usize, capacity: usize, eviction_ratio: f64) -> Self {
        Self {
            domains: DomainIndex::new(max_domains),
            capacity,
            eviction_ratio,
        }
    }

    /// Records the value for the domain, returning true if it was already known
    pub fn check_and_insert(&mut self, domain: &str, value: impl Into<T>) -> bool {
        let (capacity, ratio) = (self.capacity, self.eviction_ratio);
        let seen = self
            .domains
            .entry(domain, || BoundedSet::new(capacity, ratio));
        !seen.insert(value.into())
    }

    /// Number of values stored for a domain
    pub fn count_for(&self, domain: &str) -> usize {
        self.domains.get(domain).map_or(0, BoundedSet::len)
    }

    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }
}

/// Splits a fingerprint into fixed-width bands used as bucket keys
///
/// The band index is folded into the key so equal values in different
/// positions do not collide.
#[derive(Debug, Clone, Copy)]
pub struct BandSplitter {
    band_bits: u32,
}

impl BandSplitter {
    /// Accepts 8, 16 or 32-bit bands; anything else falls back to 16
    pub fn new(band_bits: u32) -> Self {
        let band_bits = match band_bits {
            8 | 16 | 32 => band_bits,
            other => {
                tracing::warn!("Unsupported fingerprint band width {other}, using 16 bits");
                16
            }
        };
        Self { band_bits }
    }

    pub fn band_count(&self) -> u32 {
        64 / self.band_bits
    }

    pub fn keys(&self, fingerprint: Fingerprint) -> impl Iterator<Item = u64> {
        let bits = self.band_bits;
        let mask = (1u64 << bits) - 1;
        (0..self.band_count()).map(move |band| {
            let value = (fingerprint.0 >> (band * bits)) & mask;
            (u64::from(band) << 32) | value
        })
    }
}

/// Result of a near-duplicate lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FingerprintMatch {
    /// An indexed fingerprint is at least this similar
    Duplicate { similarity: f64 },
    /// No close fingerprint found; the query was indexed
    Inserted,
}

/// Per-domain banded fingerprint index
#[derive(Debug)]
pub struct FingerprintIndex {
    domains: DomainIndex<HashMap<u64, BoundedSet<u64>>>,
    splitter: BandSplitter,
    bucket_capacity: usize,
    eviction_ratio: f64,
}

impl FingerprintIndex {
    pub fn new(
        max_domains: usize,
        bucket_capacity: usize,
        eviction_ratio: f64,
        band_bits: u32,
    ) -> Self {
        Self {
            domains: DomainIndex::new(max_domains),
            splitter: BandSplitter::new(band_bits),
            bucket_capacity,
            eviction_ratio,
        }
    }

    /// Looks for a fingerprint with similarity strictly above `threshold`
    /// (0.0-1.0) among those sharing a band; inserts the query if none matches
    pub fn check_and_insert(
        &mut self,
        domain: &str,
        fingerprint: Fingerprint,
        threshold: f64,
    ) -> FingerprintMatch {
        let (capacity, ratio) = (self.bucket_capacity, self.eviction_ratio);
        let keys: Vec<u64> = self.splitter.keys(fingerprint).collect();
        let buckets = self.domains.entry(domain, HashMap::new);

        let best = keys
            .iter()
            .filter_map(|key| buckets.get(key))
            .flat_map(BoundedSet::iter)
            .map(|stored| fingerprint.similarity(&Fingerprint(*stored)))
            .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))));

        if let Some(similarity) = best.filter(|s| *s > threshold) {
            return FingerprintMatch::Duplicate { similarity };
        }

        for key in keys {
            buckets
                .entry(key)
                .or_insert_with(|| BoundedSet::new(capacity, ratio))
                .insert(fingerprint.0);
        }
        FingerprintMatch::Inserted
    }

    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    /// Largest bucket size across a domain
    pub fn largest_bucket(&self, domain: &str) -> usize {
        self.domains
            .get(domain)
            .and_then(|buckets| buckets.values().map(BoundedSet::len).max())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_set_evicts_oldest_batch() {
        let mut set = BoundedSet::new(10, 0.2);
        for i in 0..10 {
            assert!(set.insert(i));
        }
        assert_eq!(set.len(), 10);
        set.insert(10);
        // 11 entries over capacity 10: oldest 2 dropped
        assert_eq!(set.len(), 9);
        assert!(!set.contains(&0));
        assert!(!set.contains(&1));
        assert!(set.contains(&2));
        assert!(set.contains(&10));
    }

    #[test]
    fn test_bounded_set_rejects_duplicates() {
        let mut set = BoundedSet::new(5, 0.2);
        assert!(set.insert("a"));
        assert!(!set.insert("a"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_title_index_capacity() {
        let mut index = TitleIndex::new(10, 50, 0.2);
        for i in 0..500 {
            index.check_and_insert("example.com", &format!("title number {i}"));
            assert!(index.count_for("example.com") <= 50);
        }
    }

    #[test]
    fn test_title_index_domain_eviction() {
        let mut index = TitleIndex::new(2, 10, 0.2);
        index.check_and_insert("a.com", "some title");
        index.check_and_insert("b.com", "some title");
        // touch a.com so b.com is least recently used
        assert!(index.check_and_insert("a.com", "some title"));
        index.check_and_insert("c.com", "some title");
        assert_eq!(index.domain_count(), 2);
        assert_eq!(index.count_for("b.com"), 0);
        assert_eq!(index.count_for("a.com"), 1);
    }

    #[test]
    fn test_title_index_is_per_domain() {
        let mut index = TitleIndex::new(10, 10, 0.2);
        assert!(!index.check_and_insert("a.com", "dashboard home"));
        assert!(index.check_and_insert("a.com", "dashboard home"));
        assert!(!index.check_and_insert("b.com", "dashboard home"));
    }

    #[test]
    fn test_length_index_matches_exact_lengths() {
        let mut index = LengthIndex::new(10, 10, 0.2);
        assert!(!index.check_and_insert("a.com", 4096usize));
        assert!(index.check_and_insert("a.com", 4096usize));
        assert!(!index.check_and_insert("a.com", 4097usize));
        assert!(!index.check_and_insert("b.com", 4096usize));
    }

    #[test]
    fn test_band_keys() {
        let splitter = BandSplitter::new(16);
        let keys: Vec<u64> = splitter.keys(Fingerprint(0x0004_0003_0002_0001)).collect();
        assert_eq!(keys, vec![1, (1 << 32) | 2, (2 << 32) | 3, (3 << 32) | 4]);
        assert_eq!(BandSplitter::new(12).band_count(), 4);
        assert_eq!(BandSplitter::new(8).band_count(), 8);
    }

    #[test]
    fn test_fingerprint_index_near_duplicate() {
        let mut index = FingerprintIndex::new(10, 100, 0.2, 16);
        let original = Fingerprint(0xdead_beef_cafe_f00d);
        let close = Fingerprint(original.0 ^ 0b101);
        let far = Fingerprint(!original.0);

        assert_eq!(
            index.check_and_insert("x.com", original, 0.9),
            FingerprintMatch::Inserted
        );
        assert!(matches!(
            index.check_and_insert("x.com", close, 0.9),
            FingerprintMatch::Duplicate { .. }
        ));
        assert_eq!(
            index.check_and_insert("x.com", far, 0.9),
            FingerprintMatch::Inserted
        );
        // other domains are independent
        assert_eq!(
            index.check_and_insert("y.com", original, 0.9),
            FingerprintMatch::Inserted
        );
    }

    #[test]
    fn test_fingerprint_bucket_bound() {
        let mut index = FingerprintIndex::new(10, 20, 0.2, 16);
        // same low band, distinct elsewhere
        for i in 0..200u64 {
            index.check_and_insert("x.com", Fingerprint((i << 16) | 0xabcd), 1.0);
        }
        assert!(index.largest_bucket("x.com") <= 20);
    }
}
