//! Process listing, lookup, and lifecycle control.

use std::time::{Duration, Instant};

use serde::Serialize;
use sysinfo::{Pid, Process, ProcessStatus, ProcessesToUpdate, Signal, System, Users};

use crate::error::{Error, Result};
use crate::round2;
use crate::snapshot::SAMPLE_WINDOW;

/// Bounded wait for a SIGTERM to take effect before escalating.
pub const GRACEFUL_WAIT: Duration = Duration::from_secs(3);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How many leading argv entries survive into `cmdline`.
const CMDLINE_ARGS: usize = 3;

/// Read-only view of one process. PIDs are reused by the OS, so this is
/// a point-in-time identity, not a stable key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub status: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_mb: f64,
    pub num_threads: Option<usize>,
    pub username: Option<String>,
    pub create_time: String,
    pub cmdline: String,
}

/// Ordering key for process listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Cpu,
    Memory,
    Name,
}

impl SortKey {
    /// Parse a sort key; anything unrecognized resolves to CPU, which is
    /// the documented default.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Self::Memory,
            "name" => Self::Name,
            _ => Self::Cpu,
        }
    }
}

/// Outcome of a terminate request that removed the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// The process exited within [`GRACEFUL_WAIT`] of SIGTERM.
    Graceful { name: String },
    /// SIGTERM was ignored; SIGKILL removed it.
    Forced { name: String },
}

/// List processes ordered by `sort`, at most `limit` entries.
///
/// Per-process CPU is sampled over one shared blocking window, so the
/// call costs [`SAMPLE_WINDOW`] regardless of process count. Entries
/// whose fields are unreadable (permissions) are silently dropped.
pub fn top_processes(limit: usize, sort: SortKey) -> Vec<ProcessSnapshot> {
    let (sys, users) = sampled_system();
    let total_memory = sys.total_memory();

    let mut processes: Vec<ProcessSnapshot> = sys
        .processes()
        .iter()
        .filter_map(|(pid, proc)| snapshot_of(pid.as_u32(), proc, total_memory, &users))
        .collect();

    match sort {
        SortKey::Cpu => processes.sort_by(|a, b| {
            b.cpu_percent
                .partial_cmp(&a.cpu_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
        SortKey::Memory => processes.sort_by(|a, b| {
            b.memory_percent
                .partial_cmp(&a.memory_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
        SortKey::Name => {
            processes.sort_by_key(|p| p.name.to_lowercase());
        }
    }

    processes.truncate(limit);
    processes
}

/// All processes whose name contains `name`, case-insensitively.
pub fn search_processes(name: &str) -> Vec<ProcessSnapshot> {
    let needle = name.to_lowercase();
    let (sys, users) = sampled_system();
    let total_memory = sys.total_memory();

    sys.processes()
        .iter()
        .filter_map(|(pid, proc)| snapshot_of(pid.as_u32(), proc, total_memory, &users))
        .filter(|snapshot| snapshot.name.to_lowercase().contains(&needle))
        .collect()
}

/// Full snapshot of a single process.
pub fn process_detail(pid: u32) -> Result<ProcessSnapshot> {
    let target = [Pid::from_u32(pid)];
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_processes(ProcessesToUpdate::Some(&target), true);
    if sys.process(target[0]).is_none() {
        return Err(Error::NotFound(pid));
    }

    // Second refresh after the window gives a real CPU delta.
    std::thread::sleep(SAMPLE_WINDOW);
    sys.refresh_processes(ProcessesToUpdate::Some(&target), true);
    let proc = sys.process(target[0]).ok_or(Error::NotFound(pid))?;

    let users = Users::new_with_refreshed_list();
    snapshot_of(pid, proc, sys.total_memory(), &users).ok_or(Error::PermissionDenied(pid))
}

/// Terminate a process: SIGTERM, bounded wait, then SIGKILL.
///
/// State machine: Running -> SIGTERM -> wait (<= [`GRACEFUL_WAIT`], polled)
/// -> exited => graceful | still running -> SIGKILL -> exited => forced.
pub fn terminate_process(pid: u32) -> Result<TerminateOutcome> {
    let target = [Pid::from_u32(pid)];
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&target), true);
    let proc = sys.process(target[0]).ok_or(Error::NotFound(pid))?;
    let name = proc.name().to_string_lossy().into_owned();

    match proc.kill_with(Signal::Term) {
        None => return Err(Error::Unsupported),
        Some(false) => return Err(Error::PermissionDenied(pid)),
        Some(true) => {}
    }

    let deadline = Instant::now() + GRACEFUL_WAIT;
    while Instant::now() < deadline {
        std::thread::sleep(POLL_INTERVAL);
        if exited(&mut sys, &target) {
            return Ok(TerminateOutcome::Graceful { name });
        }
    }

    // Escalate.
    let proc = match sys.process(target[0]) {
        None => return Ok(TerminateOutcome::Graceful { name }),
        Some(proc) => proc,
    };
    if !proc.kill() {
        return Err(Error::PermissionDenied(pid));
    }
    std::thread::sleep(POLL_INTERVAL);
    if exited(&mut sys, &target) {
        Ok(TerminateOutcome::Forced { name })
    } else {
        Err(Error::KillFailed(pid))
    }
}

/// Suspend a process with SIGSTOP. Returns the process name.
pub fn suspend_process(pid: u32) -> Result<String> {
    signal_process(pid, Signal::Stop)
}

/// Resume a suspended process with SIGCONT. Returns the process name.
pub fn resume_process(pid: u32) -> Result<String> {
    signal_process(pid, Signal::Continue)
}

fn signal_process(pid: u32, signal: Signal) -> Result<String> {
    let target = [Pid::from_u32(pid)];
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&target), true);
    let proc = sys.process(target[0]).ok_or(Error::NotFound(pid))?;
    let name = proc.name().to_string_lossy().into_owned();

    match proc.kill_with(signal) {
        None => Err(Error::Unsupported),
        Some(false) => Err(Error::PermissionDenied(pid)),
        Some(true) => Ok(name),
    }
}

// A terminated child of another process disappears from the table; our
// own children linger as zombies until reaped, which still counts as
// exited here.
fn exited(sys: &mut System, target: &[Pid; 1]) -> bool {
    sys.refresh_processes(ProcessesToUpdate::Some(target), true);
    match sys.process(target[0]) {
        None => true,
        Some(proc) => proc.status() == ProcessStatus::Zombie,
    }
}

fn sampled_system() -> (System, Users) {
    let mut sys = System::new_all();
    std::thread::sleep(SAMPLE_WINDOW);
    sys.refresh_processes(ProcessesToUpdate::All, true);
    (sys, Users::new_with_refreshed_list())
}

fn snapshot_of(
    pid: u32,
    proc: &Process,
    total_memory: u64,
    users: &Users,
) -> Option<ProcessSnapshot> {
    let name = proc.name().to_string_lossy().into_owned();
    if name.is_empty() {
        // Permission-restricted entry; drop it from listings.
        return None;
    }

    let memory_percent = if total_memory > 0 {
        round2(proc.memory() as f64 / total_memory as f64 * 100.0)
    } else {
        0.0
    };

    let username = proc
        .user_id()
        .and_then(|uid| users.get_user_by_id(uid))
        .map(|user| user.name().to_string());

    let create_time = chrono::DateTime::from_timestamp(proc.start_time() as i64, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    let cmdline = proc
        .cmd()
        .iter()
        .take(CMDLINE_ARGS)
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");

    Some(ProcessSnapshot {
        pid,
        name,
        status: proc.status().to_string(),
        cpu_percent: round2(proc.cpu_usage() as f64),
        memory_percent,
        memory_mb: crate::bytes_to_mb(proc.memory()),
        num_threads: proc.tasks().map(|tasks| tasks.len()),
        username,
        create_time,
        cmdline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Comfortably above any real PID (Linux caps at 4194304).
    const BOGUS_PID: u32 = 4_000_000_000;

    #[test]
    fn sort_key_parse_known_and_fallback() {
        assert_eq!(SortKey::parse("cpu"), SortKey::Cpu);
        assert_eq!(SortKey::parse("MEMORY"), SortKey::Memory);
        assert_eq!(SortKey::parse("name"), SortKey::Name);
        assert_eq!(SortKey::parse("uptime"), SortKey::Cpu);
        assert_eq!(SortKey::parse(""), SortKey::Cpu);
    }

    #[test]
    fn top_processes_respects_limit() {
        assert!(top_processes(0, SortKey::Cpu).is_empty());
        let three = top_processes(3, SortKey::Cpu);
        assert!(three.len() <= 3);
        assert!(!three.is_empty());
    }

    #[test]
    fn top_processes_sorted_descending_by_cpu() {
        let procs = top_processes(10, SortKey::Cpu);
        for pair in procs.windows(2) {
            assert!(pair[0].cpu_percent >= pair[1].cpu_percent);
        }
    }

    #[test]
    fn top_processes_sorted_ascending_by_name() {
        let procs = top_processes(10, SortKey::Name);
        for pair in procs.windows(2) {
            assert!(pair[0].name.to_lowercase() <= pair[1].name.to_lowercase());
        }
    }

    #[test]
    fn detail_of_current_process() {
        let me = process_detail(std::process::id()).expect("own process must resolve");
        assert_eq!(me.pid, std::process::id());
        assert!(!me.name.is_empty());
        assert!(me.memory_mb > 0.0);
    }

    #[test]
    fn detail_of_missing_process() {
        assert_eq!(process_detail(BOGUS_PID), Err(Error::NotFound(BOGUS_PID)));
    }

    #[test]
    fn search_finds_current_process() {
        let me = process_detail(std::process::id()).unwrap();
        let needle: String = me.name.chars().take(4).collect();
        let matches = search_processes(&needle);
        assert!(matches.iter().any(|p| p.pid == me.pid));
    }

    #[test]
    fn search_no_match_is_empty_not_error() {
        let matches = search_processes("no-process-is-named-like-this");
        assert!(matches.is_empty());
    }

    #[test]
    fn control_of_missing_process() {
        assert_eq!(
            terminate_process(BOGUS_PID),
            Err(Error::NotFound(BOGUS_PID))
        );
        assert_eq!(suspend_process(BOGUS_PID), Err(Error::NotFound(BOGUS_PID)));
        assert_eq!(resume_process(BOGUS_PID), Err(Error::NotFound(BOGUS_PID)));
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use std::process::Command;

        #[test]
        fn terminate_graceful() {
            let mut child = Command::new("sleep").arg("30").spawn().unwrap();
            let outcome = terminate_process(child.id()).unwrap();
            assert!(matches!(outcome, TerminateOutcome::Graceful { .. }));
            child.wait().unwrap();
        }

        #[test]
        fn terminate_escalates_to_kill() {
            let mut child = Command::new("sh")
                .args(["-c", "trap '' TERM; sleep 30"])
                .spawn()
                .unwrap();
            let outcome = terminate_process(child.id()).unwrap();
            assert!(matches!(outcome, TerminateOutcome::Forced { .. }));
            child.wait().unwrap();
        }

        #[test]
        fn suspend_then_resume() {
            let mut child = Command::new("sleep").arg("30").spawn().unwrap();
            let pid = child.id();

            let name = suspend_process(pid).unwrap();
            assert_eq!(name, "sleep");
            resume_process(pid).unwrap();

            child.kill().unwrap();
            child.wait().unwrap();
        }
    }
}
