//! Drives whole runs: interleaved A/B ingestion into a fresh index per
//! (configuration, repetition), match log and JSON report per run.

use anyhow::{Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::path::Path;

use crate::config::{AppConfig, Experiment};
use crate::index::{BlockIndex, IndexConfig, IndexStats};
use crate::ingest::{interleave, open_records};
use crate::metrics::ProgressMonitor;
use crate::models::Record;
use crate::report::{ConfigSummary, RunReport, RunResults};
use crate::similarity::{SimilarityConfig, SimilarityEngine};
use crate::sink::{LineSink, MatchSink};

#[derive(Debug, Clone, Copy)]
pub struct RunOutcome {
    pub stats: IndexStats,
    pub elapsed_secs: f64,
    /// Highest resident set size sampled during the run.
    pub peak_rss_mb: u64,
}

/// Feed A and B alternately through one index. Records are pulled one at a
/// time; nothing beyond the index's own windows is retained.
pub fn run_experiment<A, B>(
    records_a: A,
    records_b: B,
    index_cfg: &IndexConfig,
    similarity: SimilarityConfig,
    engine: &SimilarityEngine,
    sink: &mut dyn MatchSink,
    progress: &mut ProgressMonitor,
) -> Result<RunOutcome>
where
    A: IntoIterator<Item = Result<Record>>,
    B: IntoIterator<Item = Result<Record>>,
{
    let mut index = BlockIndex::new(index_cfg, similarity, engine.clone()).context("building block index")?;
    for rec in interleave(records_a, records_b) {
        index.insert(rec?, sink)?;
        let s = index.stats();
        progress.observe(s.processed, s.true_positives, s.false_positives);
    }
    sink.flush();
    Ok(RunOutcome {
        stats: index.stats(),
        elapsed_secs: progress.elapsed().as_secs_f64(),
        peak_rss_mb: progress.finish(),
    })
}

pub fn match_log_name(config_index: usize, execution_index: usize) -> String {
    format!("matches_config_{}_exec_{}.txt", config_index, execution_index)
}

/// Thread pool for parallel runs; `EXPBLOCK_THREADS` or the configured count, else all cores.
pub fn build_pool(threads: Option<usize>) -> Result<ThreadPool> {
    let from_env = std::env::var("EXPBLOCK_THREADS").ok().and_then(|v| v.parse::<usize>().ok()).filter(|n| *n > 0);
    let n = threads
        .or(from_env)
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4));
    log::info!("Running experiments on {} threads", n);
    rayon::ThreadPoolBuilder::new()
        .num_threads(n)
        .thread_name(|i| format!("expblock-{}", i))
        .build()
        .context("creating experiment thread pool")
}

fn run_one(
    cfg: &AppConfig,
    experiment: &Experiment,
    execution: usize,
    engine: &SimilarityEngine,
    out_dir: &Path,
) -> Result<RunReport> {
    let label = format!("config {} exec {}", experiment.index, execution);
    let index_cfg = IndexConfig { seed: cfg.index.seed.wrapping_add(execution as u64 - 1), ..cfg.index };
    let log_path = out_dir.join(match_log_name(experiment.index, execution));
    let mut sink = LineSink::create(&log_path).with_context(|| format!("creating match log {}", log_path.display()))?;
    let records_a = open_records(&cfg.run.input_a)?;
    let records_b = open_records(&cfg.run.input_b)?;
    let mut progress = ProgressMonitor::new(label.clone(), cfg.run.progress_every);
    let outcome = run_experiment(records_a, records_b, &index_cfg, experiment.similarity, engine, &mut sink, &mut progress)
        .with_context(|| format!("run {}", label))?;
    if sink.dropped() > 0 {
        log::warn!("[{}] {} match lines could not be written", label, sink.dropped());
    }

    let report = RunReport {
        config_index: experiment.index,
        execution_index: execution,
        configurations: experiment.similarity,
        results: RunResults::from_stats(&outcome.stats, outcome.elapsed_secs, cfg.run.truly_matching_pairs)
            .with_peak_rss(outcome.peak_rss_mb),
        finished_at: Utc::now(),
    };
    let report_path = out_dir.join(RunReport::file_name(experiment.index, execution));
    report.write_json(&report_path)?;
    log::info!(
        "[{}] done in {:.2}s: {} matching pairs, {} false positives, precision {:.4}, recall {:.4} -> {}",
        label, outcome.elapsed_secs, report.results.matching_pairs_no, report.results.false_positives_no,
        report.results.precision, report.results.recall, report_path.display()
    );
    Ok(report)
}

/// Every configured experiment, `repetitions` times each, in parallel. Each run
/// streams its own readers over the inputs and owns its index and sink; the
/// engine (and its embedding cache) is shared.
pub fn run_experiments(cfg: &AppConfig, engine: &SimilarityEngine) -> Result<Vec<RunReport>> {
    std::fs::create_dir_all(&cfg.run.out_dir)
        .with_context(|| format!("creating output directory {}", cfg.run.out_dir.display()))?;
    let jobs: Vec<(Experiment, usize)> = cfg
        .experiments
        .iter()
        .flat_map(|e| (1..=cfg.run.repetitions).map(move |j| (*e, j)))
        .collect();
    let pool = build_pool(cfg.run.threads)?;
    let mut reports = pool.install(|| {
        jobs.par_iter()
            .map(|(e, j)| run_one(cfg, e, *j, engine, &cfg.run.out_dir))
            .collect::<Result<Vec<_>>>()
    })?;
    reports.sort_by_key(|r| (r.config_index, r.execution_index));
    for summary in ConfigSummary::from_reports(&reports) {
        let path = cfg.run.out_dir.join(ConfigSummary::file_name(summary.config_index));
        summary.write_json(&path)?;
        log::info!(
            "config {}: {} executions, mean precision {:.4}, mean recall {:.4}, mean time {:.2}s -> {}",
            summary.config_index, summary.executions.len(), summary.mean_precision, summary.mean_recall,
            summary.mean_elapsed_time_seconds, path.display()
        );
    }
    Ok(reports)
}
