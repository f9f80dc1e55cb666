//! Scalable Bloom filter for visited-URL membership
//!
//! A chain of fixed-size filters: when the newest stage reaches its capacity a
//! larger stage with a tighter error rate is appended, so the compound
//! false-positive rate stays under the configured target no matter how many
//! URLs a run visits. Lookups never produce false negatives.

use xxhash_rust::xxh3::xxh3_64_with_seed;

const GROWTH_FACTOR: usize = 4;
const TIGHTENING_RATIO: f64 = 0.9;
const SECOND_HASH_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// One fixed-size filter of the chain
#[derive(Debug, Clone)]
struct BloomStage {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
    capacity: usize,
    count: usize,
}

impl BloomStage {
    fn new(capacity: usize, fp_rate: f64) -> Self {
        let capacity = capacity.max(1);
        // m = -n * ln(p) / (ln(2)^2)
        let m = (-(capacity as f64) * fp_rate.ln() / 2.0_f64.ln().powi(2)).ceil() as u64;
        let num_bits = m.max(64);
        // k = m/n * ln(2)
        let k = ((num_bits as f64 / capacity as f64) * 2.0_f64.ln()).round() as u32;
        Self {
            bits: vec![0u64; num_bits.div_ceil(64) as usize],
            num_bits,
            num_hashes: k.clamp(1, 16),
            capacity,
            count: 0,
        }
    }

    /// Double hashing: index_i = h1 + i * h2 (mod m)
    fn indexes(&self, item: &[u8]) -> impl Iterator<Item = u64> + '_ {
        let h1 = xxh3_64_with_seed(item, 0);
        let h2 = xxh3_64_with_seed(item, SECOND_HASH_SEED) | 1;
        (0..u64::from(self.num_hashes))
            .map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % self.num_bits)
    }

    fn contains(&self, item: &[u8]) -> bool {
        self.indexes(item)
            .all(|idx| self.bits[(idx / 64) as usize] & (1u64 << (idx % 64)) != 0)
    }

    fn insert(&mut self, item: &[u8]) {
        let indexes: Vec<u64> = self.indexes(item).collect();
        for idx in indexes {
            self.bits[(idx / 64) as usize] |= 1u64 << (idx % 64);
        }
        self.count += 1;
    }

    fn is_full(&self) -> bool {
        self.count >= self.capacity
    }
}

/// Growable Bloom filter with a bounded compound false-positive rate
#[derive(Debug, Clone)]
pub struct ScalableBloomFilter {
    stages: Vec<BloomStage>,
    initial_capacity: usize,
    fp_rate: f64,
}

impl ScalableBloomFilter {
    /// Creates a filter sized for `initial_capacity` items at `fp_rate`
    ///
    /// Out-of-range rates fall back to 0.001.
    pub fn new(initial_capacity: usize, fp_rate: f64) -> Self {
        let fp_rate = if fp_rate > 0.0 && fp_rate < 1.0 {
            fp_rate
        } else {
            tracing::warn!("Invalid bloom filter false-positive rate {fp_rate}, using 0.001");
            0.001
        };
        let initial_capacity = initial_capacity.max(1);
        // The stage rates form a geometric series summing to fp_rate
        let first = BloomStage::new(initial_capacity, fp_rate * (1.0 - TIGHTENING_RATIO));
        Self {
            stages: vec![first],
            initial_capacity,
            fp_rate,
        }
    }

    /// Returns true if the item may have been inserted, false if it definitely was not
    pub fn contains(&self, item: &str) -> bool {
        let bytes = item.as_bytes();
        self.stages.iter().any(|stage| stage.contains(bytes))
    }

    /// Inserts an item, returning false if it was (probably) already present
    pub fn insert(&mut self, item: &str) -> bool {
        if self.contains(item) {
            return false;
        }
        if self.stages.last().is_some_and(BloomStage::is_full) {
            let n = self.stages.len();
            let capacity = self.initial_capacity * GROWTH_FACTOR.pow(n as u32);
            let rate = self.fp_rate * (1.0 - TIGHTENING_RATIO) * TIGHTENING_RATIO.powi(n as i32);
            tracing::debug!("Bloom filter growing to stage {} (capacity {capacity})", n + 1);
            self.stages.push(BloomStage::new(capacity, rate));
        }
        if let Some(stage) = self.stages.last_mut() {
            stage.insert(item.as_bytes());
        }
        true
    }

    /// Number of items inserted
    pub fn len(&self) -> usize {
        self.stages.iter().map(|s| s.count).sum()
    }

    /// Whether nothing has been inserted
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of chained stages
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl Default for ScalableBloomFilter {
    fn default() -> Self {
        Self::new(10_000, 0.001)
    }
}
