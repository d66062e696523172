pub mod blocking;
pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod report;
pub mod runner;
pub mod similarity;
pub mod sink;
pub mod vocab;

pub use blocking::BlockingKeyGenerator;
pub use index::{BlockIndex, IndexConfig, IndexStats};
pub use models::{MatchEvent, Origin, PutResult, Record};
pub use similarity::{ScoreBundle, SimilarityConfig, SimilarityEngine};
