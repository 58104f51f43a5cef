//! Host telemetry: CPU, memory, disk, network, and process control.
//!
//! This crate wraps the OS metrics provider behind result-returning
//! functions with tagged error kinds. Readings are point-in-time; each
//! call queries the OS directly and holds no shared state.

mod error;
pub mod process;
pub mod snapshot;

pub use error::{Error, Result};
pub use process::{
    GRACEFUL_WAIT, ProcessSnapshot, SortKey, TerminateOutcome, process_detail, resume_process,
    search_processes, suspend_process, terminate_process, top_processes,
};
pub use snapshot::{
    CpuSnapshot, DiskSnapshot, MemorySnapshot, NetworkSnapshot, SAMPLE_WINDOW, SystemSummary,
    cpu_snapshot, disk_snapshot, memory_snapshot, network_snapshot, system_summary,
};

pub(crate) fn bytes_to_mb(bytes: u64) -> f64 {
    round2(bytes as f64 / (1024.0 * 1024.0))
}

pub(crate) fn bytes_to_gb(bytes: u64) -> f64 {
    round2(bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Current time as an ISO-8601 string, attached to every reading.
pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
