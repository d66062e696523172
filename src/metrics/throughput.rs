use std::time::{Duration, Instant};

use super::memory::ProcessMemory;

#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub processed: u64,
    pub true_positives: u64,
    pub false_positives: u64,
    pub records_per_second: f64,
    pub elapsed: Duration,
    pub rss_mb: u64,
    pub host_avail_mb: u64,
}

/// Emits a progress line every `every` processed records.
pub struct ProgressMonitor {
    label: String,
    start: Instant,
    every: u64,
    next: u64,
    memory: ProcessMemory,
}

impl ProgressMonitor {
    pub fn new(label: impl Into<String>, every: u64) -> Self {
        let every = every.max(1);
        Self { label: label.into(), start: Instant::now(), every, next: every, memory: ProcessMemory::new() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Returns (and logs) an update once `processed` crosses the next multiple of `every`.
    pub fn observe(&mut self, processed: u64, true_positives: u64, false_positives: u64) -> Option<ProgressUpdate> {
        if processed < self.next {
            return None;
        }
        while self.next <= processed {
            self.next += self.every;
        }
        let elapsed = self.start.elapsed();
        let secs = elapsed.as_secs_f64();
        let mem = self.memory.sample();
        let update = ProgressUpdate {
            processed,
            true_positives,
            false_positives,
            records_per_second: if secs > 0.0 { processed as f64 / secs } else { 0.0 },
            elapsed,
            rss_mb: mem.rss_mb,
            host_avail_mb: mem.host_avail_mb,
        };
        log::info!(
            "[{}] Processed {} records. Identified {} matching pairs ({} false positives) | {:.0} rec/s | RSS: {} MB | Host avail: {} MB",
            self.label, update.processed, update.true_positives, update.false_positives,
            update.records_per_second, update.rss_mb, update.host_avail_mb
        );
        Some(update)
    }

    /// Takes a closing memory sample and returns the run's peak RSS in MB.
    pub fn finish(&mut self) -> u64 {
        self.memory.sample();
        self.memory.peak_rss_mb()
    }
}
