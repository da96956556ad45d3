//! Backup location management and the safe move into it
//!
//! Every reset gets its own `YYYYMMDD-HHMMSS` directory under the backup root.
//! Targets under the home directory keep their home-relative layout inside
//! it, so `~/.config/zoom` lands in `<backup>/.config/zoom`.

use chrono::NaiveDateTime;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ResetError, ResetResult};

/// Backup root directory name under the home directory
pub const DEFAULT_BACKUP_DIR: &str = ".zoom-reset-backups";

/// What happened to a single state path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nothing exists at this path
    Skipped { path: PathBuf },
    /// Dry-run: the move that would have happened
    WouldMove { from: PathBuf, to: PathBuf },
    Moved { from: PathBuf, to: PathBuf },
    Failed { path: PathBuf, error: String },
}

impl MoveOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, MoveOutcome::Failed { .. })
    }
}

impl fmt::Display for MoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveOutcome::Skipped { path } => write!(f, "Not present: {}", path.display()),
            MoveOutcome::WouldMove { from, to } => {
                write!(f, "Would move {} to {}", from.display(), to.display())
            }
            MoveOutcome::Moved { from, to } => {
                write!(f, "Moving {} to backup {}", from.display(), to.display())
            }
            MoveOutcome::Failed { path, error } => {
                write!(f, "Failed to back up {}: {}", path.display(), error)
            }
        }
    }
}

/// `~/.zoom-reset-backups`
pub fn default_backup_root(home: &Path) -> PathBuf {
    home.join(DEFAULT_BACKUP_DIR)
}

/// Create the backup root (or the default one under `home`) and return it.
pub fn ensure_backup_root(root: Option<&Path>, home: &Path) -> ResetResult<PathBuf> {
    let root = root
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_backup_root(home));
    fs::create_dir_all(&root).map_err(|e| ResetError::io(&root, e))?;
    Ok(root)
}

/// Directory name for a backup taken at `now`.
pub fn backup_dir_name(now: NaiveDateTime) -> String {
    now.format("%Y%m%d-%H%M%S").to_string()
}

/// Create `root/YYYYMMDD-HHMMSS` and return it.
pub fn timestamped_backup_dir(root: &Path, now: NaiveDateTime) -> ResetResult<PathBuf> {
    let dir = root.join(backup_dir_name(now));
    fs::create_dir_all(&dir).map_err(|e| ResetError::io(&dir, e))?;
    Ok(dir)
}

/// Where `target` goes inside `backup_dir`.
///
/// Paths under `anchor` keep their relative layout; anything else lands under
/// its file name. An occupied destination gets a `-HHMMSS` suffix, then a
/// counter.
pub fn backup_destination(
    target: &Path,
    backup_dir: &Path,
    anchor: Option<&Path>,
    now: NaiveDateTime,
) -> PathBuf {
    let relative = anchor
        .and_then(|a| target.strip_prefix(a).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| {
            PathBuf::from(target.file_name().unwrap_or_else(|| OsStr::new("state")))
        });

    let destination = backup_dir.join(relative);
    if !exists(&destination) {
        return destination;
    }

    let stamp = now.format("%H%M%S").to_string();
    let stamped = with_suffix(&destination, &format!("-{}", stamp));
    if !exists(&stamped) {
        return stamped;
    }
    (2u32..)
        .map(|n| with_suffix(&destination, &format!("-{}-{}", stamp, n)))
        .find(|candidate| !exists(candidate))
        .unwrap_or(stamped)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Like `Path::exists`, but true for dangling symlinks too.
fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Move `target` into `backup_dir`, or report the move under dry-run.
pub fn backup_and_remove(
    target: &Path,
    backup_dir: &Path,
    anchor: Option<&Path>,
    now: NaiveDateTime,
    dry_run: bool,
) -> ResetResult<MoveOutcome> {
    if !exists(target) {
        debug!("Skipping {} (not present)", target.display());
        return Ok(MoveOutcome::Skipped {
            path: target.to_path_buf(),
        });
    }

    if backup_dir.starts_with(target) {
        return Err(ResetError::io(
            target,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("backup directory {} lies inside it", backup_dir.display()),
            ),
        ));
    }

    let destination = backup_destination(target, backup_dir, anchor, now);
    if dry_run {
        return Ok(MoveOutcome::WouldMove {
            from: target.to_path_buf(),
            to: destination,
        });
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| ResetError::io(parent, e))?;
    }
    move_path(target, &destination).map_err(|e| ResetError::io(target, e))?;
    info!("Moved {} to {}", target.display(), destination.display());

    Ok(MoveOutcome::Moved {
        from: target.to_path_buf(),
        to: destination,
    })
}

/// Rename, falling back to copy + delete across filesystems.
fn move_path(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!("{} is on another device, copying", from.display());
            copy_recursive(from, to)?;
            remove_path(from)
        }
        Err(e) => Err(e),
    }
}

/// Copy a file, symlink or directory tree from `from` to `to`.
pub fn copy_recursive(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(from)?;
    let file_type = meta.file_type();

    if file_type.is_symlink() {
        copy_symlink(from, to)
    } else if file_type.is_dir() {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
        fs::set_permissions(to, meta.permissions())
    } else {
        fs::copy(from, to).map(|_| ())
    }
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to).map(|_| ())
}

fn remove_path(path: &Path) -> io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
