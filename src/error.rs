use thiserror::Error;

/// Rejected configuration values. Raised eagerly when a config is built or validated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be finite (got {value})")]
    NotFinite { field: &'static str, value: f64 },

    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange { field: &'static str, value: f64, expected: &'static str },

    #[error("missing required field: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Broken index invariants. These indicate a construction bug and are never retried.
#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("window capacity must be at least 1 (derived {0})")]
    ZeroWindow(f64),

    #[error("table capacity must be at least 1")]
    ZeroCapacity,

    #[error("sweep quota floor(xi * b) is 0 for xi={xi}, b={capacity}")]
    EmptySweepQuota { xi: f64, capacity: usize },

    #[error("random slot pool is empty (no_randoms={0}, need at least 10)")]
    EmptySlotPool(usize),

    #[error("no empty or matching slot for key {key} (occupied {occupied}/{capacity})")]
    NoFreeSlot { key: String, occupied: usize, capacity: usize },
}

/// Word-vector file failures. Callers usually degrade to syntactic-only scoring.
#[derive(Debug, Error)]
pub enum VocabError {
    #[error("failed to read vectors file: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: cannot parse component {component:?}")]
    Parse { line: usize, component: String },

    #[error("line {line}: vector has {actual} dimensions, expected {expected}")]
    DimensionMismatch { line: usize, expected: usize, actual: usize },

    #[error("vectors file contains no vectors")]
    Empty,
}
