//! Zoom process discovery and termination
//!
//! Discovery goes through `sysinfo` on every platform. Termination sends
//! SIGTERM on Unix (so Zoom can flush and exit cleanly) and falls back to
//! `TerminateProcess` via `sysinfo` on Windows.

use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System, UpdateKind};
use tracing::{debug, info, warn};

use crate::error::{ResetError, ResetResult};

/// Delay between liveness checks while waiting for terminated processes
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A running process that matched the search pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// Full command line, when the OS exposes it
    pub command: Option<String>,
}

impl fmt::Display for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (PID {})", self.name, self.pid)
    }
}

/// What happened to a single process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillStatus {
    /// Dry-run: nothing was sent
    WouldTerminate,
    Terminated,
    /// The process exited before we got to it
    NotFound,
    PermissionDenied(String),
    Failed(String),
}

/// Result of terminating one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillOutcome {
    pub process: ProcessInfo,
    pub status: KillStatus,
}

impl fmt::Display for KillOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.process;
        match &self.status {
            KillStatus::WouldTerminate => write!(f, "Would terminate {}", p),
            KillStatus::Terminated => write!(f, "Terminated {}", p),
            KillStatus::NotFound => write!(f, "Process {} not found; skipping", p.pid),
            KillStatus::PermissionDenied(msg) => {
                write!(f, "Permission denied terminating {}: {}", p.pid, msg)
            }
            KillStatus::Failed(msg) => write!(f, "Failed to terminate {}: {}", p, msg),
        }
    }
}

/// Case-insensitive match of `pattern` against a process name and command line.
pub fn matches_pattern(name: &str, command: Option<&str>, pattern: &str) -> bool {
    let pattern = pattern.to_lowercase();
    if pattern.is_empty() {
        return false;
    }
    name.to_lowercase().contains(&pattern)
        || command
            .map(|c| c.to_lowercase().contains(&pattern))
            .unwrap_or(false)
}

/// List running processes whose name or command line contains `pattern`.
///
/// Never returned: this process, its threads, and the chain of processes
/// that launched it (a `sudo zoom-reset` or `sh -c zoom-reset` parent matches
/// the default pattern too). Threads of other processes are skipped as well;
/// signalling the owning process covers them.
pub fn find_processes(pattern: &str) -> ResetResult<Vec<ProcessInfo>> {
    if !sysinfo::IS_SUPPORTED_SYSTEM {
        return Err(ResetError::ProcessQuery(format!(
            "process enumeration is not available on {}",
            std::env::consts::OS
        )));
    }

    let mut sys = System::new();
    sys.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::new().with_cmd(UpdateKind::Always),
    );

    let own_pid = std::process::id();
    let excluded: HashSet<u32> = ancestor_chain(own_pid, |pid| {
        sys.process(Pid::from_u32(pid))
            .and_then(|p| p.parent())
            .map(|p| p.as_u32())
    })
    .into_iter()
    .collect();

    let mut matches: Vec<ProcessInfo> = sys
        .processes()
        .iter()
        .filter(|(pid, process)| {
            let parent = process.parent().map(|p| p.as_u32());
            let is_thread = process.thread_kind().is_some();
            !is_excluded(pid.as_u32(), parent, is_thread, own_pid, &excluded)
        })
        .filter_map(|(pid, process)| {
            let name = process.name().to_string_lossy().to_string();
            let command = join_command(process.cmd());
            if matches_pattern(&name, command.as_deref(), pattern) {
                Some(ProcessInfo {
                    pid: pid.as_u32(),
                    name,
                    command,
                })
            } else {
                None
            }
        })
        .collect();

    matches.sort_by_key(|p| p.pid);
    debug!(
        "Found {} process(es) matching '{}' ({} own/ancestor pid(s) excluded)",
        matches.len(),
        pattern,
        excluded.len()
    );
    Ok(matches)
}

/// `start` followed by each of its ancestors, nearest first.
///
/// Stops at the root, at an unknown pid, or on a loop in the parent links.
pub fn ancestor_chain(start: u32, parent_of: impl Fn(u32) -> Option<u32>) -> Vec<u32> {
    let mut chain = vec![start];
    let mut seen: HashSet<u32> = HashSet::from([start]);
    let mut current = start;

    while let Some(parent) = parent_of(current) {
        if parent == 0 || !seen.insert(parent) {
            break;
        }
        chain.push(parent);
        current = parent;
    }
    chain
}

/// Whether a process table entry must never be signalled.
fn is_excluded(
    pid: u32,
    parent: Option<u32>,
    is_thread: bool,
    own_pid: u32,
    protected: &HashSet<u32>,
) -> bool {
    is_thread || protected.contains(&pid) || parent == Some(own_pid)
}

fn join_command(parts: &[std::ffi::OsString]) -> Option<String> {
    if parts.is_empty() {
        return None;
    }
    let joined = parts
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    Some(joined)
}

/// Terminate every process in `processes`. Failures are reported per process
/// and never stop the loop.
pub fn terminate(processes: &[ProcessInfo], dry_run: bool) -> Vec<KillOutcome> {
    processes
        .iter()
        .map(|process| terminate_one(process, dry_run))
        .collect()
}

/// Terminate a single process (or only report it under dry-run).
pub fn terminate_one(process: &ProcessInfo, dry_run: bool) -> KillOutcome {
    let status = if dry_run {
        KillStatus::WouldTerminate
    } else {
        send_terminate(process.pid)
    };
    match &status {
        KillStatus::Terminated => info!("Terminated {}", process),
        KillStatus::WouldTerminate | KillStatus::NotFound => {
            debug!("{}: {:?}", process, status)
        }
        _ => warn!("Could not terminate {}: {:?}", process, status),
    }
    KillOutcome {
        process: process.clone(),
        status,
    }
}

/// Poll until every pid in `pids` has exited or `timeout` elapses.
///
/// Returns the pids still running at the deadline. Zombies count as exited.
pub fn wait_for_exit(pids: &[u32], timeout: Duration) -> Vec<u32> {
    let deadline = Instant::now() + timeout;
    let mut remaining = pids.to_vec();
    let mut sys = System::new();

    while !remaining.is_empty() {
        let targets: Vec<Pid> = remaining.iter().map(|pid| Pid::from_u32(*pid)).collect();
        sys.refresh_processes(ProcessesToUpdate::Some(&targets), true);
        remaining.retain(|pid| {
            sys.process(Pid::from_u32(*pid))
                .map(|p| p.status() != ProcessStatus::Zombie)
                .unwrap_or(false)
        });

        if remaining.is_empty() || Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(EXIT_POLL_INTERVAL);
    }

    if !remaining.is_empty() {
        warn!("Still running after {:?}: {:?}", timeout, remaining);
    }
    remaining
}

#[cfg(unix)]
fn send_terminate(pid: u32) -> KillStatus {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return KillStatus::Failed(format!("PID {} out of range", pid));
    };

    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => KillStatus::Terminated,
        Err(Errno::ESRCH) => KillStatus::NotFound,
        Err(Errno::EPERM) => KillStatus::PermissionDenied(Errno::EPERM.desc().to_string()),
        Err(errno) => KillStatus::Failed(errno.desc().to_string()),
    }
}

#[cfg(not(unix))]
fn send_terminate(pid: u32) -> KillStatus {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    match sys.process(pid) {
        None => KillStatus::NotFound,
        Some(process) if process.kill() => KillStatus::Terminated,
        Some(_) => KillStatus::Failed("TerminateProcess failed".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(pid: u32, name: &str) -> ProcessInfo {
        ProcessInfo {
            pid,
            name: name.to_string(),
            command: None,
        }
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("Zoom", None, "zoom"));
        assert!(matches_pattern("zoom.us", None, "ZOOM"));
        assert!(matches_pattern("Zoom.exe", None, "zoom"));
        assert!(matches_pattern(
            "ZoomWebviewHost",
            Some("/Applications/zoom.us.app/Contents/MacOS/ZoomWebviewHost"),
            "zoom"
        ));
        // Truncated comm, full path only in argv
        assert!(matches_pattern("aomhost", Some("/opt/zoom/aomhost --fd 3"), "zoom"));

        assert!(!matches_pattern("otherproc", Some("/bin/other"), "zoom"));
        assert!(!matches_pattern("zoom", None, ""));
    }

    #[test]
    fn test_join_command() {
        assert_eq!(join_command(&[]), None);
        assert_eq!(
            join_command(&["/opt/zoom/zoom".into(), "--url".into()]),
            Some("/opt/zoom/zoom --url".to_string())
        );
    }

    #[test]
    fn test_dry_run_sends_nothing() {
        let own = info(std::process::id(), "self");
        let outcomes = terminate(&[own.clone()], true);

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, KillStatus::WouldTerminate);
        assert_eq!(outcomes[0].to_string(), format!("Would terminate self (PID {})", own.pid));
    }

    #[test]
    fn test_outcome_display() {
        let outcome = KillOutcome {
            process: info(1234, "Zoom"),
            status: KillStatus::NotFound,
        };
        assert_eq!(outcome.to_string(), "Process 1234 not found; skipping");

        let outcome = KillOutcome {
            process: info(1234, "Zoom"),
            status: KillStatus::Terminated,
        };
        assert_eq!(outcome.to_string(), "Terminated Zoom (PID 1234)");
    }

    #[test]
    fn test_find_processes_excludes_self() {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return;
        }
        // Keep an extra thread alive so the process has more than one task
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let worker = std::thread::spawn(move || {
            let _ = rx.recv();
        });

        // The test binary's own path matches its crate name
        let found = find_processes("zoom_reset").unwrap();
        assert!(found.iter().all(|p| p.pid != std::process::id()));

        #[cfg(target_os = "linux")]
        {
            let tids: Vec<u32> = std::fs::read_dir("/proc/self/task")
                .unwrap()
                .filter_map(|e| e.ok()?.file_name().to_str()?.parse().ok())
                .collect();
            assert!(tids.len() >= 2);
            for p in &found {
                assert!(!tids.contains(&p.pid), "own thread listed: {:?}", p);
            }
        }

        let sorted = found.windows(2).all(|w| w[0].pid <= w[1].pid);
        assert!(sorted);

        tx.send(()).unwrap();
        worker.join().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_find_processes_excludes_parent() {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return;
        }
        let parent = std::os::unix::process::parent_id();
        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new().with_cmd(UpdateKind::Always),
        );
        let Some(name) = sys
            .process(Pid::from_u32(parent))
            .map(|p| p.name().to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
        else {
            return;
        };

        // The launching process matches by name, yet is never a candidate
        let found = find_processes(&name).unwrap();
        assert!(found.iter().all(|p| p.pid != parent));
    }

    #[test]
    fn test_ancestor_chain() {
        // 40 -> 30 -> 20 -> 1 -> (root)
        let parents = |pid: u32| match pid {
            40 => Some(30),
            30 => Some(20),
            20 => Some(1),
            _ => None,
        };
        assert_eq!(ancestor_chain(40, parents), vec![40, 30, 20, 1]);
        assert_eq!(ancestor_chain(99, parents), vec![99]);

        // Parent pid 0 ends the chain
        assert_eq!(ancestor_chain(5, |pid| (pid == 5).then_some(0)), vec![5]);
    }

    #[test]
    fn test_ancestor_chain_stops_on_loop() {
        let parents = |pid: u32| match pid {
            7 => Some(8),
            8 => Some(7),
            _ => None,
        };
        assert_eq!(ancestor_chain(7, parents), vec![7, 8]);
    }

    #[test]
    fn test_is_excluded() {
        let protected: HashSet<u32> = HashSet::from([100, 50, 1]);

        // Self and launching shell
        assert!(is_excluded(100, Some(50), false, 100, &protected));
        assert!(is_excluded(50, Some(1), false, 100, &protected));
        // Own worker thread, reported with our pid as parent
        assert!(is_excluded(101, Some(100), true, 100, &protected));
        // A thread inside some other process
        assert!(is_excluded(901, Some(900), true, 100, &protected));
        // A real Zoom process
        assert!(!is_excluded(900, Some(1), false, 100, &protected));
    }

    #[test]
    fn test_wait_for_exit() {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return;
        }
        // We are alive for the whole timeout
        let own = std::process::id();
        let remaining = wait_for_exit(&[own], Duration::from_millis(150));
        assert_eq!(remaining, vec![own]);

        assert!(wait_for_exit(&[], Duration::from_secs(5)).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_for_exit_gone_process() {
        let start = Instant::now();
        let remaining = wait_for_exit(&[i32::MAX as u32], Duration::from_secs(5));
        assert!(remaining.is_empty());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_missing_process() {
        // PID well beyond any default pid_max
        let outcomes = terminate(&[info(i32::MAX as u32, "ghost")], false);
        assert_eq!(outcomes[0].status, KillStatus::NotFound);
    }
}
