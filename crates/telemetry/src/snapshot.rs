//! Point-in-time host snapshots: CPU, memory, disk, network, summary.
//!
//! Each call builds its own `sysinfo` state and queries the OS directly,
//! so concurrent callers get independently consistent readings.

use std::time::Duration;

use serde::Serialize;
use sysinfo::{Disks, Networks, System};

use crate::error::{Error, Result};
use crate::{bytes_to_gb, bytes_to_mb, round2, timestamp};

/// Blocking CPU sampling window. Usage percentages are deltas between
/// two refreshes, so every CPU reading costs one window.
pub const SAMPLE_WINDOW: Duration = Duration::from_millis(200);

/// CPU load and frequency.
#[derive(Debug, Clone, Serialize)]
pub struct CpuSnapshot {
    pub overall_usage_percent: f64,
    pub cpu_count: usize,
    pub per_core_usage: Vec<f64>,
    pub current_frequency_mhz: Option<f64>,
    pub max_frequency_mhz: Option<f64>,
    pub timestamp: String,
}

/// Virtual memory and swap.
#[derive(Debug, Clone, Serialize)]
pub struct MemorySnapshot {
    pub total_gb: f64,
    pub used_gb: f64,
    pub available_gb: f64,
    pub usage_percent: f64,
    pub swap_total_gb: f64,
    pub swap_used_gb: f64,
    pub swap_percent: f64,
    pub timestamp: String,
}

/// Usage of the filesystem holding a given path.
#[derive(Debug, Clone, Serialize)]
pub struct DiskSnapshot {
    pub path: String,
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub usage_percent: f64,
    pub timestamp: String,
}

/// Cumulative network I/O counters, summed over interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkSnapshot {
    pub bytes_sent_mb: f64,
    pub bytes_recv_mb: f64,
    pub packets_sent: u64,
    pub packets_recv: u64,
    pub errors_in: u64,
    pub errors_out: u64,
    pub timestamp: String,
}

/// One-line health overview of the host.
#[derive(Debug, Clone, Serialize)]
pub struct SystemSummary {
    pub cpu_usage_percent: f64,
    pub memory_usage_percent: f64,
    pub memory_available_gb: f64,
    pub disk_usage_percent: f64,
    pub disk_free_gb: f64,
    pub total_processes: usize,
    pub boot_time: String,
    pub timestamp: String,
}

/// Sample CPU usage over one blocking window.
pub fn cpu_snapshot() -> CpuSnapshot {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    std::thread::sleep(SAMPLE_WINDOW.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
    sys.refresh_cpu_usage();

    let per_core_usage: Vec<f64> = sys
        .cpus()
        .iter()
        .map(|cpu| round2(cpu.cpu_usage() as f64))
        .collect();

    // sysinfo reports the current frequency per core; the rated maximum
    // is not exposed, so that field stays null.
    let current_frequency_mhz = sys
        .cpus()
        .iter()
        .map(|cpu| cpu.frequency())
        .max()
        .filter(|&mhz| mhz > 0)
        .map(|mhz| mhz as f64);

    CpuSnapshot {
        overall_usage_percent: round2(sys.global_cpu_usage() as f64),
        cpu_count: sys.cpus().len(),
        per_core_usage,
        current_frequency_mhz,
        max_frequency_mhz: None,
        timestamp: timestamp(),
    }
}

/// Read memory and swap counters.
pub fn memory_snapshot() -> MemorySnapshot {
    let mut sys = System::new();
    sys.refresh_memory();

    let swap_total = sys.total_swap();
    let swap_percent = if swap_total > 0 {
        round2(sys.used_swap() as f64 / swap_total as f64 * 100.0)
    } else {
        0.0
    };
    let total = sys.total_memory();
    let usage_percent = if total > 0 {
        round2(sys.used_memory() as f64 / total as f64 * 100.0)
    } else {
        0.0
    };

    MemorySnapshot {
        total_gb: bytes_to_gb(total),
        used_gb: bytes_to_gb(sys.used_memory()),
        available_gb: bytes_to_gb(sys.available_memory()),
        usage_percent,
        swap_total_gb: bytes_to_gb(swap_total),
        swap_used_gb: bytes_to_gb(sys.used_swap()),
        swap_percent,
        timestamp: timestamp(),
    }
}

/// Usage of the filesystem that holds `path`.
///
/// The path is canonicalized and matched against the mounted disk with
/// the longest mount-point prefix; a path that does not resolve is an
/// [`Error::InvalidPath`].
pub fn disk_snapshot(path: &str) -> Result<DiskSnapshot> {
    let canonical =
        std::fs::canonicalize(path).map_err(|_| Error::InvalidPath(path.to_string()))?;

    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|d| canonical.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .ok_or_else(|| Error::InvalidPath(path.to_string()))?;

    let total = disk.total_space();
    let free = disk.available_space();
    let used = total.saturating_sub(free);
    let usage_percent = if total > 0 {
        round2(used as f64 / total as f64 * 100.0)
    } else {
        0.0
    };

    Ok(DiskSnapshot {
        path: path.to_string(),
        total_gb: bytes_to_gb(total),
        used_gb: bytes_to_gb(used),
        free_gb: bytes_to_gb(free),
        usage_percent,
        timestamp: timestamp(),
    })
}

/// Cumulative I/O counters summed across interfaces.
pub fn network_snapshot() -> NetworkSnapshot {
    let networks = Networks::new_with_refreshed_list();

    let mut snapshot = NetworkSnapshot {
        bytes_sent_mb: 0.0,
        bytes_recv_mb: 0.0,
        packets_sent: 0,
        packets_recv: 0,
        errors_in: 0,
        errors_out: 0,
        timestamp: timestamp(),
    };

    let mut bytes_sent = 0u64;
    let mut bytes_recv = 0u64;
    for (_name, data) in &networks {
        bytes_sent += data.total_transmitted();
        bytes_recv += data.total_received();
        snapshot.packets_sent += data.total_packets_transmitted();
        snapshot.packets_recv += data.total_packets_received();
        snapshot.errors_in += data.total_errors_on_received();
        snapshot.errors_out += data.total_errors_on_transmitted();
    }
    snapshot.bytes_sent_mb = bytes_to_mb(bytes_sent);
    snapshot.bytes_recv_mb = bytes_to_mb(bytes_recv);

    snapshot
}

/// Combined CPU / memory / root-disk / process-count overview.
pub fn system_summary() -> SystemSummary {
    let mut sys = System::new();
    sys.refresh_cpu_usage();
    sys.refresh_memory();
    std::thread::sleep(SAMPLE_WINDOW.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
    sys.refresh_cpu_usage();
    sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);

    let (disk_usage_percent, disk_free_gb) = match disk_snapshot("/") {
        Ok(disk) => (disk.usage_percent, disk.free_gb),
        Err(_) => (0.0, 0.0),
    };

    let total = sys.total_memory();
    let memory_usage_percent = if total > 0 {
        round2(sys.used_memory() as f64 / total as f64 * 100.0)
    } else {
        0.0
    };

    let boot_time = chrono::DateTime::from_timestamp(System::boot_time() as i64, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    SystemSummary {
        cpu_usage_percent: round2(sys.global_cpu_usage() as f64),
        memory_usage_percent,
        memory_available_gb: bytes_to_gb(sys.available_memory()),
        disk_usage_percent,
        disk_free_gb,
        total_processes: sys.processes().len(),
        boot_time,
        timestamp: timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_snapshot_shape() {
        let cpu = cpu_snapshot();
        assert!(cpu.cpu_count > 0);
        assert_eq!(cpu.per_core_usage.len(), cpu.cpu_count);
        assert!((0.0..=100.0).contains(&cpu.overall_usage_percent));
        assert!(cpu.max_frequency_mhz.is_none());
    }

    #[test]
    fn memory_snapshot_bounds() {
        let mem = memory_snapshot();
        assert!(mem.total_gb > 0.0);
        assert!(mem.used_gb <= mem.total_gb);
        assert!((0.0..=100.0).contains(&mem.usage_percent));
    }

    #[test]
    fn disk_snapshot_valid_path() {
        let disk = disk_snapshot("/").expect("root must resolve");
        assert!(disk.total_gb > 0.0);
        assert!((0.0..=100.0).contains(&disk.usage_percent));
        assert_eq!(disk.path, "/");
    }

    #[test]
    fn disk_snapshot_relative_path() {
        let disk = disk_snapshot(".").expect("cwd must resolve");
        assert!(disk.total_gb > 0.0);
    }

    #[test]
    fn disk_snapshot_invalid_path() {
        let err = disk_snapshot("/definitely/not/a/real/path").unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[test]
    fn network_snapshot_does_not_panic() {
        let net = network_snapshot();
        assert!(net.bytes_sent_mb >= 0.0);
    }

    #[test]
    fn summary_counts_processes() {
        let summary = system_summary();
        assert!(summary.total_processes > 0);
        assert!((0.0..=100.0).contains(&summary.memory_usage_percent));
        assert!(!summary.boot_time.is_empty());
    }

    #[test]
    fn snapshots_serialize_flat() {
        let value = serde_json::to_value(memory_snapshot()).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.values().all(|v| !v.is_object()));
    }
}
