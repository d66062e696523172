use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::index::IndexConfig;
use crate::similarity::SimilarityConfig;

/// One similarity configuration to run, numbered from 1 as in the report files.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Experiment {
    pub index: usize,
    pub similarity: SimilarityConfig,
}

impl Experiment {
    /// Preset `n` (1-based) from [`SimilarityConfig::presets`].
    pub fn preset(n: usize) -> Result<Self, ConfigError> {
        let presets = SimilarityConfig::presets();
        match n.checked_sub(1).and_then(|i| presets.get(i)) {
            Some(cfg) => Ok(Experiment { index: n, similarity: *cfg }),
            None => Err(ConfigError::OutOfRange { field: "preset", value: n as f64, expected: "1..=11" }),
        }
    }

    pub fn all_presets() -> Vec<Self> {
        SimilarityConfig::presets()
            .into_iter()
            .enumerate()
            .map(|(i, similarity)| Experiment { index: i + 1, similarity })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub input_a: PathBuf,
    pub input_b: PathBuf,
    pub vectors: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub repetitions: usize,
    /// Ground-truth number of matching pairs, the recall denominator.
    pub truly_matching_pairs: u64,
    pub progress_every: u64,
    pub cache_capacity: usize,
    pub threads: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_a: PathBuf::from("test_voters_A.txt"),
            input_b: PathBuf::from("test_voters_B.txt"),
            vectors: None,
            out_dir: PathBuf::from("."),
            repetitions: 10,
            truly_matching_pairs: 1_000_000,
            progress_every: 10_000,
            cache_capacity: 100_000,
            threads: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub experiments: Vec<Experiment>,
    pub index: IndexConfig,
    pub run: RunConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            experiments: vec![Experiment { index: 8, similarity: SimilarityConfig::default() }],
            index: IndexConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.experiments.is_empty() {
            return Err(ConfigError::Missing("experiments"));
        }
        for e in &self.experiments {
            e.similarity.validate()?;
        }
        self.index.validate()?;
        if self.run.input_a.as_os_str().is_empty() {
            return Err(ConfigError::Missing("input_a"));
        }
        if self.run.input_b.as_os_str().is_empty() {
            return Err(ConfigError::Missing("input_b"));
        }
        if self.run.repetitions == 0 {
            return Err(ConfigError::OutOfRange { field: "repetitions", value: 0.0, expected: ">= 1" });
        }
        if self.run.cache_capacity == 0 {
            return Err(ConfigError::OutOfRange { field: "cache_capacity", value: 0.0, expected: ">= 1" });
        }
        if self.run.threads == Some(0) {
            return Err(ConfigError::OutOfRange { field: "threads", value: 0.0, expected: ">= 1" });
        }
        Ok(())
    }
}
