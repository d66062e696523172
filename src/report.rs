use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::index::IndexStats;
use crate::similarity::SimilarityConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunResults {
    pub elapsed_time_seconds: f64,
    pub total_records_processed: u64,
    pub matching_pairs_no: u64,
    pub false_positives_no: u64,
    pub total_pairs_identified: u64,
    pub precision: f64,
    pub recall: f64,
    pub sweeps: u64,
    pub blocks_purged: u64,
    #[serde(default)]
    pub peak_rss_mb: u64,
}

/// Outcome of one (configuration, repetition) run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub config_index: usize,
    pub execution_index: usize,
    pub configurations: SimilarityConfig,
    pub results: RunResults,
    pub finished_at: DateTime<Utc>,
}

impl RunResults {
    pub fn from_stats(stats: &IndexStats, elapsed_secs: f64, truly_matching_pairs: u64) -> Self {
        let identified = stats.true_positives + stats.false_positives;
        let precision = if identified > 0 { stats.true_positives as f64 / identified as f64 } else { 0.0 };
        let recall = if truly_matching_pairs > 0 { stats.true_positives as f64 / truly_matching_pairs as f64 } else { 0.0 };
        RunResults {
            elapsed_time_seconds: elapsed_secs,
            total_records_processed: stats.processed,
            matching_pairs_no: stats.true_positives,
            false_positives_no: stats.false_positives,
            total_pairs_identified: identified,
            precision,
            recall,
            sweeps: stats.sweeps,
            blocks_purged: stats.purged,
            peak_rss_mb: 0,
        }
    }

    pub fn with_peak_rss(mut self, peak_rss_mb: u64) -> Self {
        self.peak_rss_mb = peak_rss_mb;
        self
    }
}

impl RunReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).with_context(|| format!("writing report {}", path.display()))?;
        Ok(())
    }

    pub fn file_name(config_index: usize, execution_index: usize) -> String {
        format!("results_config_{}_exec_{}.json", config_index, execution_index)
    }
}

/// One execution's row in a [`ConfigSummary`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRow {
    pub execution_index: usize,
    pub recall: f64,
    pub precision: f64,
    pub matching_pairs_no: u64,
    pub false_positives_no: u64,
    pub total_pairs_identified: u64,
    pub elapsed_time_seconds: f64,
}

/// All executions of one configuration side by side, with their means.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub config_index: usize,
    pub configurations: SimilarityConfig,
    pub executions: Vec<ExecutionRow>,
    pub mean_precision: f64,
    pub mean_recall: f64,
    pub mean_elapsed_time_seconds: f64,
}

impl ConfigSummary {
    /// Groups reports by configuration, ordered by config then execution index.
    pub fn from_reports(reports: &[RunReport]) -> Vec<ConfigSummary> {
        let mut grouped: BTreeMap<usize, Vec<&RunReport>> = BTreeMap::new();
        for r in reports {
            grouped.entry(r.config_index).or_default().push(r);
        }
        grouped
            .into_iter()
            .map(|(config_index, mut runs)| {
                runs.sort_by_key(|r| r.execution_index);
                let n = runs.len() as f64;
                let mean = |f: fn(&RunResults) -> f64| runs.iter().map(|r| f(&r.results)).sum::<f64>() / n;
                ConfigSummary {
                    config_index,
                    configurations: runs[0].configurations,
                    mean_precision: mean(|r| r.precision),
                    mean_recall: mean(|r| r.recall),
                    mean_elapsed_time_seconds: mean(|r| r.elapsed_time_seconds),
                    executions: runs
                        .iter()
                        .map(|r| ExecutionRow {
                            execution_index: r.execution_index,
                            recall: r.results.recall,
                            precision: r.results.precision,
                            matching_pairs_no: r.results.matching_pairs_no,
                            false_positives_no: r.results.false_positives_no,
                            total_pairs_identified: r.results.total_pairs_identified,
                            elapsed_time_seconds: r.results.elapsed_time_seconds,
                        })
                        .collect(),
                }
            })
            .collect()
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing summary {}", path.display()))?;
        Ok(())
    }

    pub fn file_name(config_index: usize) -> String {
        format!("summary_config_{}.json", config_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(tp: u64, fp: u64) -> IndexStats {
        IndexStats { processed: 100, true_positives: tp, false_positives: fp, ..Default::default() }
    }

    #[test]
    fn precision_and_recall() {
        let r = RunResults::from_stats(&stats(30, 10), 1.5, 60);
        assert_eq!(r.total_pairs_identified, 40);
        assert!((r.precision - 0.75).abs() < 1e-12);
        assert!((r.recall - 0.5).abs() < 1e-12);
        let r = RunResults::from_stats(&stats(0, 0), 0.0, 0);
        assert_eq!((r.precision, r.recall), (0.0, 0.0));
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let report = RunReport {
            config_index: 1,
            execution_index: 2,
            configurations: SimilarityConfig::default(),
            results: RunResults::from_stats(&stats(1, 1), 0.25, 10),
            finished_at: Utc::now(),
        };
        let json = report.to_json().unwrap();
        assert!(json.contains("\"configIndex\": 1"));
        assert!(json.contains("\"matchingPairsNo\": 1"));
        assert!(json.contains("\"semanticWeight\": 0.3"));
        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.results, report.results);
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RunReport::file_name(1, 1));
        let report = RunReport {
            config_index: 1,
            execution_index: 1,
            configurations: SimilarityConfig::default(),
            results: RunResults::from_stats(&stats(0, 0), 0.0, 1),
            finished_at: Utc::now(),
        };
        report.write_json(&path).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("totalRecordsProcessed"));
    }

    fn report(config_index: usize, execution_index: usize, tp: u64, fp: u64, secs: f64) -> RunReport {
        RunReport {
            config_index,
            execution_index,
            configurations: SimilarityConfig::presets()[config_index - 1],
            results: RunResults::from_stats(&stats(tp, fp), secs, 100),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn summary_groups_and_averages_per_config() {
        let reports = vec![report(4, 2, 30, 10, 3.0), report(1, 1, 50, 0, 1.0), report(4, 1, 10, 10, 1.0)];
        let summaries = ConfigSummary::from_reports(&reports);
        assert_eq!(summaries.iter().map(|s| s.config_index).collect::<Vec<_>>(), vec![1, 4]);

        let s4 = &summaries[1];
        assert_eq!(s4.executions.iter().map(|e| e.execution_index).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(s4.configurations, SimilarityConfig::presets()[3]);
        // precision 0.5 and 0.75, recall 0.1 and 0.3
        assert!((s4.mean_precision - 0.625).abs() < 1e-12);
        assert!((s4.mean_recall - 0.2).abs() < 1e-12);
        assert!((s4.mean_elapsed_time_seconds - 2.0).abs() < 1e-12);
        assert_eq!(s4.executions[1].total_pairs_identified, 40);

        let json = serde_json::to_string(s4).unwrap();
        assert!(json.contains("\"meanRecall\""));
        assert!(json.contains("\"executionIndex\":1"));
        assert!(ConfigSummary::from_reports(&[]).is_empty());
    }

    #[test]
    fn peak_rss_is_serialized() {
        let r = RunResults::from_stats(&stats(1, 0), 0.1, 1).with_peak_rss(123);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"peakRssMb\":123"));
    }
}
