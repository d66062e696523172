//! Run-time reporting helpers: process memory samples and periodic progress lines.

pub mod memory;
pub mod throughput;

pub use memory::{MemorySample, ProcessMemory};
pub use throughput::{ProgressMonitor, ProgressUpdate};
