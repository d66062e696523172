use clap::Parser;
use std::path::PathBuf;

use crate::blocking::BlockingConfig;
use crate::config::{AppConfig, Experiment, RunConfig};
use crate::error::ConfigError;
use crate::index::IndexConfig;

#[derive(Parser, Debug)]
#[command(name = "expblock", version, about = "Streaming record linkage with a bounded blocking index", disable_help_subcommand = true)]
pub struct Cli {
    /// Records of source A (CSV: id,surname,name,address,town,postal_code)
    #[arg(value_name = "FILE_A", env = "EXPBLOCK_INPUT_A")]
    pub input_a: PathBuf,
    /// Records of source B
    #[arg(value_name = "FILE_B", env = "EXPBLOCK_INPUT_B")]
    pub input_b: PathBuf,
    /// Plain-text word vectors; without it the semantic signal is 0
    #[arg(long, env = "EXPBLOCK_VECTORS")]
    pub vectors: Option<PathBuf>,
    /// Directory for match logs and JSON reports
    #[arg(long = "out-dir", default_value = ".", env = "EXPBLOCK_OUT_DIR")]
    pub out_dir: PathBuf,
    /// Similarity preset to run (1-11), repeatable; default 8
    #[arg(long = "preset", value_name = "N")]
    pub presets: Vec<usize>,
    /// Run all eleven presets
    #[arg(long = "all-presets", conflicts_with = "presets")]
    pub all_presets: bool,
    /// Executions per preset
    #[arg(long, default_value_t = 10)]
    pub repetitions: usize,
    /// Window error tolerance
    #[arg(long, default_value_t = 0.1)]
    pub epsilon: f64,
    /// Probability of losing a true match to window eviction
    #[arg(long, default_value_t = 0.1)]
    pub delta: f64,
    /// Estimated probability that a compared pair matches
    #[arg(long, default_value_t = 2.0 / 3.0)]
    pub q: f64,
    /// Number of block slots
    #[arg(long, default_value_t = 1000)]
    pub capacity: usize,
    /// Fraction of slots purged per sweep
    #[arg(long, default_value_t = 0.08)]
    pub xi: f64,
    /// Size of the pre-drawn random slot pool
    #[arg(long, default_value_t = 5000)]
    pub randoms: usize,
    /// Base seed; execution j uses seed + j - 1
    #[arg(long, default_value_t = 42, env = "EXPBLOCK_SEED")]
    pub seed: u64,
    /// Embedding cache entries
    #[arg(long = "cache-capacity", default_value_t = 100_000)]
    pub cache_capacity: usize,
    /// Ground-truth matching pairs (recall denominator)
    #[arg(long = "truly-matching", default_value_t = 1_000_000)]
    pub truly_matching: u64,
    /// Worker threads for parallel runs (env: EXPBLOCK_THREADS)
    #[arg(long)]
    pub threads: Option<usize>,
}

impl Cli {
    pub fn to_app_config(&self) -> Result<AppConfig, ConfigError> {
        let experiments = if self.all_presets {
            Experiment::all_presets()
        } else if self.presets.is_empty() {
            vec![Experiment::preset(8)?]
        } else {
            self.presets.iter().map(|n| Experiment::preset(*n)).collect::<Result<Vec<_>, _>>()?
        };
        let cfg = AppConfig {
            experiments,
            index: IndexConfig {
                epsilon: self.epsilon,
                delta: self.delta,
                q: self.q,
                capacity: self.capacity,
                xi: self.xi,
                no_randoms: self.randoms,
                seed: self.seed,
                blocking: BlockingConfig::default(),
            },
            run: RunConfig {
                input_a: self.input_a.clone(),
                input_b: self.input_b.clone(),
                vectors: self.vectors.clone(),
                out_dir: self.out_dir.clone(),
                repetitions: self.repetitions,
                truly_matching_pairs: self.truly_matching,
                cache_capacity: self.cache_capacity,
                threads: self.threads,
                ..RunConfig::default()
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

pub fn parse_cli_to_app_config() -> Result<AppConfig, ConfigError> {
    let cli = Cli::parse();
    cli.to_app_config()
}
