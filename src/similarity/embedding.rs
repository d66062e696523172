//! Token vectors: the external vocabulary seam, a bounded LRU cache in front of
//! it, and the pooling/cosine helpers used by the semantic signal.

use linked_hash_map::LinkedHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ConfigError;

pub type Vector = Arc<[f32]>;

/// Pretrained static word-vector lookup, loaded once per process.
pub trait Vocabulary: Send + Sync {
    fn has_token(&self, token: &str) -> bool;
    fn vector(&self, token: &str) -> Option<Vector>;

    /// Cosine of two tokens' vectors; 0 when either is unknown.
    fn similarity(&self, a: &str, b: &str) -> f64 {
        match (self.vector(a), self.vector(b)) {
            (Some(va), Some(vb)) => cosine(&to_f64(&va), &to_f64(&vb)),
            _ => 0.0,
        }
    }
}

/// Bounded token -> vector map with least-recently-used eviction.
///
/// Shared by every comparison in a run (and across parallel runs), so the
/// recency bookkeeping sits behind a mutex.
pub struct EmbeddingCache {
    entries: Mutex<LinkedHashMap<String, Vector>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::OutOfRange { field: "cache_capacity", value: 0.0, expected: ">= 1" });
        }
        Ok(Self {
            entries: Mutex::new(LinkedHashMap::new()),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LinkedHashMap<String, Vector>> {
        // Entries are plain values; a panic mid-update cannot leave them inconsistent.
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Lookup that refreshes the entry's recency.
    pub fn get(&self, token: &str) -> Option<Vector> {
        let found = self.lock().get_refresh(token).map(|v| v.clone());
        match found {
            Some(v) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(v)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, token: &str, vector: Vector) {
        let mut entries = self.lock();
        entries.insert(token.to_string(), vector);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Cache first, then the vocabulary; found vectors are cached.
    pub fn resolve(&self, token: &str, vocab: &dyn Vocabulary) -> Option<Vector> {
        if let Some(v) = self.get(token) {
            return Some(v);
        }
        let v = vocab.vector(token)?;
        self.put(token, v.clone());
        Some(v)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

fn to_f64(v: &[f32]) -> Vec<f64> {
    v.iter().map(|x| *x as f64).collect()
}

/// Component-wise mean of `vectors`; vectors whose length differs from the first are skipped.
pub fn mean_pool(vectors: &[Vector]) -> Option<Vec<f64>> {
    let dim = vectors.first()?.len();
    let mut sum = vec![0.0f64; dim];
    let mut n = 0usize;
    for v in vectors.iter().filter(|v| v.len() == dim) {
        for (acc, x) in sum.iter_mut().zip(v.iter()) {
            *acc += *x as f64;
        }
        n += 1;
    }
    if n == 0 || dim == 0 {
        return None;
    }
    for acc in sum.iter_mut() {
        *acc /= n as f64;
    }
    Some(sum)
}

pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut n1, mut n2) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        n1 += x * x;
        n2 += y * y;
    }
    if n1 == 0.0 || n2 == 0.0 {
        return 0.0;
    }
    dot / (n1.sqrt() * n2.sqrt())
}
