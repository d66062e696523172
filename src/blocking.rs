//! Blocking keys: a MinHash signature of the surname joined with the postal code.
//!
//! Surnames that share most of their character shingles tend to land under the
//! same key; the grouping is approximate on purpose.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::error::ConfigError;
use crate::normalize::normalize_letters;

pub const KEY_SEPARATOR: char = '_';

/// Stable 64-bit FNV-1a, independent of `std`'s hasher.
struct Fnv1a64 {
    state: u64,
}

impl Fnv1a64 {
    fn new() -> Self {
        Self { state: 0xcbf29ce484222325 }
    }
}

impl Hasher for Fnv1a64 {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        const PRIME: u64 = 0x00000100000001B3;
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(PRIME);
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BlockingConfig {
    /// Signature length.
    pub num_hashes: usize,
    /// Character n-gram size used for shingling.
    pub shingle_size: usize,
    pub seed: u64,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self { num_hashes: 4, shingle_size: 2, seed: 42 }
    }
}

impl BlockingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_hashes == 0 {
            return Err(ConfigError::OutOfRange { field: "blocking.num_hashes", value: 0.0, expected: ">= 1" });
        }
        if self.shingle_size == 0 {
            return Err(ConfigError::OutOfRange { field: "blocking.shingle_size", value: 0.0, expected: ">= 1" });
        }
        Ok(())
    }
}

/// Seeded MinHash over character shingles.
#[derive(Debug, Clone)]
pub struct MinHasher {
    seeds: Vec<u64>,
    shingle_size: usize,
}

impl MinHasher {
    pub fn new(cfg: &BlockingConfig) -> Self {
        let mut seeds = Vec::with_capacity(cfg.num_hashes);
        let mut state = cfg.seed;
        for _ in 0..cfg.num_hashes {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            seeds.push(state);
        }
        Self { seeds, shingle_size: cfg.shingle_size.max(1) }
    }

    /// Character n-grams of `text`. Strings shorter than the shingle size form a single shingle.
    pub fn shingles(&self, text: &str) -> HashSet<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return HashSet::new();
        }
        if chars.len() <= self.shingle_size {
            return std::iter::once(text.to_string()).collect();
        }
        chars.windows(self.shingle_size).map(|w| w.iter().collect()).collect()
    }

    pub fn signature(&self, text: &str) -> Vec<u64> {
        let shingles = self.shingles(text);
        self.seeds
            .iter()
            .map(|&seed| {
                shingles
                    .iter()
                    .map(|s| {
                        let mut h = Fnv1a64::new();
                        seed.to_le_bytes().hash(&mut h);
                        s.hash(&mut h);
                        h.finish()
                    })
                    .min()
                    .unwrap_or(u64::MAX)
            })
            .collect()
    }
}

/// Maps `(surname, postal code)` to a block key. Pure and deterministic for a given config.
#[derive(Debug, Clone)]
pub struct BlockingKeyGenerator {
    hasher: MinHasher,
}

impl BlockingKeyGenerator {
    pub fn new(cfg: &BlockingConfig) -> Self {
        Self { hasher: MinHasher::new(cfg) }
    }

    pub fn key(&self, surname: &str, postal_code: &str) -> String {
        let normalized = normalize_letters(surname);
        let signature = self
            .hasher
            .signature(&normalized)
            .iter()
            .map(|v| format!("{:016x}", v))
            .collect::<Vec<_>>()
            .join(".");
        format!("{}{}{}", signature, KEY_SEPARATOR, postal_code)
    }
}

impl Default for BlockingKeyGenerator {
    fn default() -> Self {
        Self::new(&BlockingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_across_generators() {
        let g1 = BlockingKeyGenerator::default();
        let g2 = BlockingKeyGenerator::default();
        assert_eq!(g1.key("Papadopoulos", "54636"), g2.key("Papadopoulos", "54636"));
    }

    #[test]
    fn key_ignores_case_and_diacritics() {
        let g = BlockingKeyGenerator::default();
        assert_eq!(g.key("Müller", "1000"), g.key("MULLER", "1000"));
        assert_eq!(g.key("de la Cruz", "1000"), g.key("DeLaCruz", "1000"));
    }

    #[test]
    fn postal_code_separates_keys() {
        let g = BlockingKeyGenerator::default();
        assert_ne!(g.key("Smith", "1000"), g.key("Smith", "1001"));
        assert!(g.key("Smith", "1000").ends_with("_1000"));
    }

    #[test]
    fn different_surnames_usually_separate() {
        let g = BlockingKeyGenerator::default();
        assert_ne!(g.key("Smith", "1000"), g.key("Georgiou", "1000"));
    }

    #[test]
    fn shingles_of_short_and_empty_text() {
        let h = MinHasher::new(&BlockingConfig::default());
        assert!(h.shingles("").is_empty());
        assert_eq!(h.shingles("a").len(), 1);
        assert_eq!(h.shingles("abcab").len(), 3); // ab, bc, ca
        assert_eq!(h.signature("").len(), 4);
    }

    #[test]
    fn zero_hashes_rejected() {
        let cfg = BlockingConfig { num_hashes: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
