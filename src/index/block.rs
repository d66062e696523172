use rand::Rng;
use std::sync::Arc;

use crate::models::{MatchEvent, Origin, PutResult, Record};
use crate::similarity::{SimilarityConfig, SimilarityEngine};
use crate::sink::MatchSink;

/// Two-sided bounded window of records sharing one blocking key.
#[derive(Debug, Clone)]
pub struct Block {
    key: String,
    side_a: Vec<Record>,
    side_b: Vec<Record>,
    /// Records ever put here, minus the decay applied by sweeps. May go negative.
    pub(crate) record_count: i64,
    pub(crate) last_round_touched: u64,
    degree: i64,
    config: Arc<SimilarityConfig>,
}

impl Block {
    pub fn new(key: String, config: Arc<SimilarityConfig>) -> Self {
        Self { key, side_a: Vec::new(), side_b: Vec::new(), record_count: 0, last_round_touched: 0, degree: 0, config }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn side_a(&self) -> &[Record] {
        &self.side_a
    }

    pub fn side_b(&self) -> &[Record] {
        &self.side_b
    }

    pub fn len(&self) -> usize {
        self.side_a.len() + self.side_b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record_count(&self) -> i64 {
        self.record_count
    }

    pub fn last_round_touched(&self) -> u64 {
        self.last_round_touched
    }

    pub fn degree(&self) -> i64 {
        self.degree
    }

    /// Records held for `origin`.
    pub fn side(&self, origin: Origin) -> &[Record] {
        match origin {
            Origin::A => &self.side_a,
            Origin::B => &self.side_b,
        }
    }

    /// Compare `rec` against the opposite side, count true/false positives, emit
    /// an event per true positive, then make room (if at `window`) and append.
    pub fn put<R: Rng + ?Sized>(
        &mut self,
        rec: Record,
        window: usize,
        round: u64,
        engine: &SimilarityEngine,
        sink: &mut dyn MatchSink,
        rng: &mut R,
    ) -> PutResult {
        let mut result = PutResult::default();
        for existing in self.side(rec.origin.opposite()) {
            let scores = engine.score_records(existing, &rec, &self.config);
            if !self.config.is_match(&scores) {
                continue;
            }
            if existing.same_entity(&rec) {
                result.true_positives += 1;
                sink.emit(&MatchEvent::new(existing, &rec, scores.total));
            } else {
                result.false_positives += 1;
            }
        }

        if self.len() >= window {
            self.evict_one(rng);
        }
        match rec.origin {
            Origin::A => self.side_a.push(rec),
            Origin::B => self.side_b.push(rec),
        }
        self.record_count += 1;
        self.last_round_touched = round;
        result
    }

    /// Drop one random record from the larger side (A only when strictly larger).
    fn evict_one<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.side_a.len() > self.side_b.len() {
            let i = rng.gen_range(0..self.side_a.len());
            self.side_a.remove(i);
        } else if !self.side_b.is_empty() {
            let i = rng.gen_range(0..self.side_b.len());
            self.side_b.remove(i);
        }
    }

    /// `floor(record_count * (last_round / round) / avg)`; 0 when `round` or `avg` is 0.
    pub fn compute_degree(&mut self, avg: u64, round: u64) -> i64 {
        let activity = if round > 0 { self.last_round_touched as f64 / round as f64 } else { 0.0 };
        self.degree = if avg > 0 { (self.record_count as f64 * activity / avg as f64).floor() as i64 } else { 0 };
        self.degree
    }

    /// Sweep decay for a block that survived.
    pub(crate) fn age(&mut self, avg: u64) {
        self.record_count -= avg as i64;
    }
}
