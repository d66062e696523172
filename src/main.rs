use anyhow::Result;
use env_logger::Env;
use log::{error, info, warn};
use std::sync::Arc;

use expblock::cli::parse_cli_to_app_config;
use expblock::config::AppConfig;
use expblock::runner::run_experiments;
use expblock::similarity::embedding::{EmbeddingCache, Vocabulary};
use expblock::similarity::SimilarityEngine;
use expblock::vocab::TextVectors;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cfg = match parse_cli_to_app_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&cfg) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cfg: &AppConfig) -> Result<()> {
    // A missing or broken vectors file degrades to syntactic-only scoring.
    let vocab: Option<Arc<dyn Vocabulary>> = match &cfg.run.vectors {
        Some(path) => match TextVectors::load(path) {
            Ok(v) => Some(Arc::new(v)),
            Err(e) => {
                warn!("Word vectors unavailable ({}); semantic similarity disabled", e);
                None
            }
        },
        None => None,
    };
    let cache = Arc::new(EmbeddingCache::new(cfg.run.cache_capacity)?);
    let engine = SimilarityEngine::new(vocab, cache);

    info!(
        "{} experiment(s) x {} execution(s) over {} and {}, window capacity {}, {} slots",
        cfg.experiments.len(), cfg.run.repetitions, cfg.run.input_a.display(), cfg.run.input_b.display(),
        cfg.index.window()?, cfg.index.capacity
    );
    let reports = run_experiments(cfg, &engine)?;

    for r in &reports {
        info!(
            "config {:>2} exec {:>2}: processed={} tp={} fp={} precision={:.4} recall={:.4} time={:.2}s peak_rss={}MB",
            r.config_index, r.execution_index, r.results.total_records_processed, r.results.matching_pairs_no,
            r.results.false_positives_no, r.results.precision, r.results.recall, r.results.elapsed_time_seconds,
            r.results.peak_rss_mb
        );
    }
    info!("Embedding cache: {} entries, {} hits, {} misses", engine.cache().len(), engine.cache().hits(), engine.cache().misses());
    Ok(())
}
