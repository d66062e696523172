//! Fixed-capacity table of blocks with cold-block reclamation.
//!
//! `BlockIndex` owns every block and is driven by a single writer through
//! `insert`. When the table is full, a sweep walks a pre-drawn pool of random
//! slots, purging blocks whose degree has dropped to zero and decaying the rest,
//! until `floor(xi * capacity)` blocks are gone.

pub mod block;
pub mod sampling;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::blocking::{BlockingConfig, BlockingKeyGenerator};
use crate::error::{ConfigError, IndexError};
use crate::models::{PutResult, Record};
use crate::similarity::{SimilarityConfig, SimilarityEngine};
use crate::sink::MatchSink;

pub use block::Block;
pub use sampling::SlotSampler;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IndexConfig {
    /// Window error tolerance.
    pub epsilon: f64,
    /// Probability of losing a true match to eviction.
    pub delta: f64,
    /// Estimated probability that a compared pair is a true match.
    pub q: f64,
    /// Number of block slots.
    pub capacity: usize,
    /// Fraction of slots purged per sweep.
    pub xi: f64,
    pub no_randoms: usize,
    pub seed: u64,
    pub blocking: BlockingConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.1,
            delta: 0.1,
            q: 2.0 / 3.0,
            capacity: 1000,
            xi: 0.08,
            no_randoms: 5000,
            seed: 42,
            blocking: BlockingConfig::default(),
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let open_unit = [("epsilon", self.epsilon), ("delta", self.delta), ("q", self.q), ("xi", self.xi)];
        for (field, value) in open_unit {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { field, value });
            }
            if value <= 0.0 || value > 1.0 {
                return Err(ConfigError::OutOfRange { field, value, expected: "(0, 1]" });
            }
        }
        if self.capacity == 0 {
            return Err(ConfigError::Missing("capacity"));
        }
        if self.sweep_quota() == 0 {
            return Err(ConfigError::Invalid(format!(
                "xi * capacity must be at least 1 (xi={}, capacity={})", self.xi, self.capacity
            )));
        }
        if self.no_randoms < 10 {
            return Err(ConfigError::OutOfRange { field: "no_randoms", value: self.no_randoms as f64, expected: ">= 10" });
        }
        self.blocking.validate()
    }

    pub fn window(&self) -> Result<usize, IndexError> {
        window_capacity(self.epsilon, self.delta, self.q)
    }

    pub fn sweep_quota(&self) -> usize {
        (self.xi * self.capacity as f64).floor() as usize
    }
}

/// `ceil(3 * ln(2 / delta) / (q * epsilon^2))`.
pub fn window_capacity(epsilon: f64, delta: f64, q: f64) -> Result<usize, IndexError> {
    let w = (3.0 * (2.0 / delta).ln() / (q * epsilon * epsilon)).ceil();
    if !w.is_finite() || w < 1.0 {
        return Err(IndexError::ZeroWindow(w));
    }
    Ok(w as usize)
}

#[derive(Debug, Clone, Default)]
pub enum Slot {
    #[default]
    Empty,
    Occupied(Block),
}

impl Slot {
    pub fn block(&self) -> Option<&Block> {
        match self {
            Slot::Occupied(b) => Some(b),
            Slot::Empty => None,
        }
    }
}

/// Plain counters for an external reporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub processed: u64,
    pub true_positives: u64,
    pub false_positives: u64,
    pub occupied: usize,
    pub round: u64,
    pub sweeps: u64,
    pub purged: u64,
}

pub struct BlockIndex {
    slots: Vec<Slot>,
    occupied: usize,
    window: usize,
    global_records: u64,
    round: u64,
    sweeps: u64,
    purged: u64,
    matches: PutResult,
    xi: f64,
    sampler: SlotSampler,
    rng: StdRng,
    keys: BlockingKeyGenerator,
    engine: SimilarityEngine,
    similarity: Arc<SimilarityConfig>,
}

impl BlockIndex {
    pub fn new(cfg: &IndexConfig, similarity: SimilarityConfig, engine: SimilarityEngine) -> Result<Self, IndexError> {
        if cfg.capacity == 0 {
            return Err(IndexError::ZeroCapacity);
        }
        if cfg.sweep_quota() == 0 {
            return Err(IndexError::EmptySweepQuota { xi: cfg.xi, capacity: cfg.capacity });
        }
        let window = cfg.window()?;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let sampler = SlotSampler::new(cfg.no_randoms, cfg.capacity, &mut rng)?;
        log::debug!("Index: capacity={} window={} sweep_quota={} pool={}", cfg.capacity, window, cfg.sweep_quota(), sampler.len());
        Ok(Self {
            slots: vec![Slot::Empty; cfg.capacity],
            occupied: 0,
            window,
            global_records: 0,
            round: 1,
            sweeps: 0,
            purged: 0,
            matches: PutResult::default(),
            xi: cfg.xi,
            sampler,
            rng,
            keys: BlockingKeyGenerator::new(&cfg.blocking),
            engine,
            similarity: Arc::new(similarity),
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.slots.iter().filter_map(Slot::block)
    }

    fn sweep_quota(&self) -> usize {
        (self.xi * self.slots.len() as f64).floor() as usize
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            processed: self.global_records,
            true_positives: self.matches.true_positives,
            false_positives: self.matches.false_positives,
            occupied: self.occupied,
            round: self.round,
            sweeps: self.sweeps,
            purged: self.purged,
        }
    }

    /// Route `rec` to the block for its key, creating the block if needed.
    pub fn insert(&mut self, rec: Record, sink: &mut dyn MatchSink) -> Result<PutResult, IndexError> {
        if self.occupied == self.slots.len() {
            self.sweep();
        }
        self.global_records += 1;
        let key = self.keys.key(&rec.surname, &rec.postal_code);

        let mut first_empty = None;
        let mut found = None;
        for (i, slot) in self.slots.iter().enumerate() {
            match slot {
                Slot::Occupied(b) if b.key() == key => {
                    found = Some(i);
                    break;
                }
                Slot::Occupied(_) => {}
                Slot::Empty => {
                    if first_empty.is_none() {
                        first_empty = Some(i);
                    }
                }
            }
        }

        let pos = match found.or(first_empty) {
            Some(pos) => pos,
            None => {
                return Err(IndexError::NoFreeSlot { key, occupied: self.occupied, capacity: self.slots.len() });
            }
        };
        if found.is_none() {
            self.slots[pos] = Slot::Occupied(Block::new(key, Arc::clone(&self.similarity)));
            self.occupied += 1;
        }
        let block = match &mut self.slots[pos] {
            Slot::Occupied(b) => b,
            Slot::Empty => unreachable!("slot {} was just filled", pos),
        };
        let res = block.put(rec, self.window, self.round, &self.engine, sink, &mut self.rng);
        self.matches.accrue(res);
        Ok(res)
    }

    /// Purge up to `floor(xi * capacity)` cold blocks. Returns how many were purged.
    ///
    /// Stops early only if a full lap of the pool meets no occupied slot.
    pub fn sweep(&mut self) -> usize {
        let quota = self.sweep_quota();
        let avg = (self.global_records / self.slots.len() as u64).max(1);
        let mut purged = 0usize;
        let mut idle = 0usize;
        while purged < quota && idle < self.sampler.len() {
            let i = self.sampler.current();
            self.sampler.advance();
            let block = match &mut self.slots[i] {
                Slot::Occupied(b) => b,
                Slot::Empty => {
                    idle += 1;
                    continue;
                }
            };
            idle = 0;
            if block.compute_degree(avg, self.round) <= 0 {
                self.slots[i] = Slot::Empty;
                purged += 1;
            } else {
                block.age(avg);
            }
        }
        if purged < quota {
            log::warn!("Sweep in round {} purged {} of {} blocks: sample pool exhausted", self.round, purged, quota);
        }
        self.occupied -= purged;
        self.round += 1;
        self.sweeps += 1;
        self.purged += purged as u64;
        log::debug!("Sweep done: round={} purged={} avg={} cursor={}", self.round, purged, avg, self.sampler.cursor());
        purged
    }

    #[cfg(test)]
    pub(crate) fn with_sampler(mut self, sampler: SlotSampler) -> Self {
        self.sampler = sampler;
        self
    }

    #[cfg(test)]
    pub(crate) fn block_mut(&mut self, i: usize) -> Option<&mut Block> {
        match &mut self.slots[i] {
            Slot::Occupied(b) => Some(b),
            Slot::Empty => None,
        }
    }
}
