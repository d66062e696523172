use sysinfo::{MemoryRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, System};

const MB: u64 = 1024 * 1024;

/// Resident memory of this process next to what the host still has free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySample {
    pub rss_mb: u64,
    pub host_avail_mb: u64,
}

/// Samples the current process. Keeps one `System` so repeated samples during
/// a run only refresh this pid and the host memory counters.
pub struct ProcessMemory {
    sys: System,
    pid: Option<Pid>,
    peak_rss_mb: u64,
}

impl ProcessMemory {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                log::debug!("Process memory unavailable: {}", e);
                None
            }
        };
        Self { sys: System::new(), pid, peak_rss_mb: 0 }
    }

    pub fn sample(&mut self) -> MemorySample {
        self.sys.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
        let rss_mb = match self.pid {
            Some(pid) => {
                self.sys.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    false,
                    ProcessRefreshKind::nothing().with_memory(),
                );
                self.sys.process(pid).map(|p| p.memory() / MB).unwrap_or(0)
            }
            None => 0,
        };
        self.peak_rss_mb = self.peak_rss_mb.max(rss_mb);
        MemorySample { rss_mb, host_avail_mb: self.sys.available_memory() / MB }
    }

    /// Largest RSS seen by [`sample`](Self::sample) so far.
    pub fn peak_rss_mb(&self) -> u64 {
        self.peak_rss_mb
    }
}

impl Default for ProcessMemory {
    fn default() -> Self {
        Self::new()
    }
}
