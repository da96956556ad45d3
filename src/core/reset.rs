//! The reset procedure: stop Zoom, then move its state into a backup

use chrono::NaiveDateTime;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::backup::{self, MoveOutcome};
use super::config::ResetConfig;
use crate::error::ResetResult;
use crate::platform::paths::{expand_home, extend_unique, remove_excluded};
use crate::platform::{self, KillOutcome, KillStatus, PathEnv, ProcessInfo, TargetOs};

/// Per-run switches, after CLI flags were merged over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetOptions {
    pub dry_run: bool,
    pub skip_kill: bool,
    pub backup_root: Option<PathBuf>,
}

impl ResetOptions {
    /// Merge CLI flags over `config`; a set flag always wins.
    pub fn from_config(
        config: &ResetConfig,
        dry_run: bool,
        skip_kill: bool,
        backup_root: Option<PathBuf>,
    ) -> Self {
        Self {
            dry_run,
            skip_kill: skip_kill || config.skip_kill,
            backup_root: backup_root.or_else(|| config.backup_root.clone()),
        }
    }
}

/// Everything a reset did, or would have done under dry-run.
#[derive(Debug, Clone)]
pub struct ResetReport {
    pub system: TargetOs,
    pub dry_run: bool,
    /// `None` when termination was skipped
    pub processes: Option<Vec<KillOutcome>>,
    /// Timestamped directory the state went to (planned one under dry-run)
    pub backup_dir: PathBuf,
    pub moves: Vec<MoveOutcome>,
}

impl ResetReport {
    pub fn is_success(&self) -> bool {
        !self.moves.iter().any(MoveOutcome::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &MoveOutcome> {
        self.moves.iter().filter(|m| m.is_failure())
    }
}

/// Progress of a running reset, reported as each step happens.
#[derive(Debug, Clone, Copy)]
pub enum ResetStep<'a> {
    Detected(TargetOs),
    KillSkipped,
    ProcessesFound(&'a [ProcessInfo]),
    Killed(&'a KillOutcome),
    /// Terminated processes that outlived the exit timeout
    StillRunning(&'a [u32]),
    Backup(&'a MoveOutcome),
}

/// The full list of state paths for `os` after config additions/exclusions.
pub fn target_paths(os: TargetOs, env: &PathEnv, config: &ResetConfig) -> Vec<PathBuf> {
    let expand = |paths: &[PathBuf]| -> Vec<PathBuf> {
        paths.iter().map(|p| expand_home(p, &env.home)).collect()
    };

    let mut paths = platform::state_paths(os, env);
    extend_unique(&mut paths, expand(&config.extra_paths));
    remove_excluded(&mut paths, &expand(&config.excluded_paths));
    paths
}

/// Run the reset for `os`.
///
/// Process lookup failures abort the run. A path that cannot be moved is
/// recorded as [`MoveOutcome::Failed`] and the remaining paths still go.
pub fn perform_reset(
    os: TargetOs,
    env: &PathEnv,
    config: &ResetConfig,
    options: &ResetOptions,
    now: NaiveDateTime,
) -> ResetResult<ResetReport> {
    perform_reset_with(os, env, config, options, now, &mut |_| {})
}

/// [`perform_reset`], calling `on_step` as each step completes.
pub fn perform_reset_with(
    os: TargetOs,
    env: &PathEnv,
    config: &ResetConfig,
    options: &ResetOptions,
    now: NaiveDateTime,
    on_step: &mut dyn FnMut(ResetStep<'_>),
) -> ResetResult<ResetReport> {
    info!("Detected system: {}", os);
    on_step(ResetStep::Detected(os));

    let processes = if options.skip_kill {
        info!("Skipping process termination step");
        on_step(ResetStep::KillSkipped);
        None
    } else {
        let found = platform::find_processes(&config.process_pattern)?;
        info!("Found {} running Zoom process(es)", found.len());
        on_step(ResetStep::ProcessesFound(&found));

        let outcomes: Vec<KillOutcome> = found
            .iter()
            .map(|process| {
                let outcome = platform::terminate_one(process, options.dry_run);
                on_step(ResetStep::Killed(&outcome));
                outcome
            })
            .collect();

        let terminated: Vec<u32> = outcomes
            .iter()
            .filter(|o| o.status == KillStatus::Terminated)
            .map(|o| o.process.pid)
            .collect();
        let timeout = Duration::from_secs(config.exit_timeout_secs);
        let still_running = platform::wait_for_exit(&terminated, timeout);
        if !still_running.is_empty() {
            on_step(ResetStep::StillRunning(&still_running));
        }
        Some(outcomes)
    };

    let backup_dir = if options.dry_run {
        let root = options
            .backup_root
            .clone()
            .unwrap_or_else(|| backup::default_backup_root(&env.home));
        root.join(backup::backup_dir_name(now))
    } else {
        let root = backup::ensure_backup_root(options.backup_root.as_deref(), &env.home)?;
        backup::timestamped_backup_dir(&root, now)?
    };
    debug!("Backup directory: {}", backup_dir.display());

    let anchor = Some(env.home.as_path());
    let moves = target_paths(os, env, config)
        .into_iter()
        .map(|path| {
            let outcome =
                backup::backup_and_remove(&path, &backup_dir, anchor, now, options.dry_run)
                    .unwrap_or_else(|e| {
                        warn!("{}", e);
                        MoveOutcome::Failed {
                            path,
                            error: e.to_string(),
                        }
                    });
            on_step(ResetStep::Backup(&outcome));
            outcome
        })
        .collect();

    Ok(ResetReport {
        system: os,
        dry_run: options.dry_run,
        processes,
        backup_dir,
        moves,
    })
}
