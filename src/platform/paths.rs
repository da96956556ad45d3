//! Zoom state locations per operating system
//!
//! Lists every configuration, cache, cookie and log location that has to go
//! for a full 1132 reset:
//! - Windows: %APPDATA% and %LOCALAPPDATA% (Zoom, zoom.us, ZoomOpener, Temp\zoom)
//! - macOS: ~/Library (Application Support, Preferences, Caches, Logs, WebKit, Cookies)
//! - Linux: ~/.config, ~/.cache, ~/.zoom and the Flatpak sandbox

use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

use super::TargetOs;
use crate::error::{ResetError, ResetResult};

/// The parts of the environment that path enumeration depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEnv {
    /// Home directory of the current user
    pub home: PathBuf,
    /// Value of %APPDATA%, if set
    pub appdata: Option<PathBuf>,
    /// Value of %LOCALAPPDATA%, if set
    pub local_appdata: Option<PathBuf>,
}

impl PathEnv {
    /// Environment rooted at `home`, with no Windows overrides.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            appdata: None,
            local_appdata: None,
        }
    }

    /// Read the environment of the running process.
    pub fn from_system() -> ResetResult<Self> {
        let home = dirs::home_dir().ok_or(ResetError::HomeDirUnavailable)?;
        Ok(Self {
            home,
            appdata: non_empty(std::env::var_os("APPDATA")),
            local_appdata: non_empty(std::env::var_os("LOCALAPPDATA")),
        })
    }

    fn roaming(&self) -> PathBuf {
        self.appdata
            .clone()
            .unwrap_or_else(|| self.home.join("AppData").join("Roaming"))
    }

    fn local(&self) -> PathBuf {
        self.local_appdata
            .clone()
            .unwrap_or_else(|| self.home.join("AppData").join("Local"))
    }
}

fn non_empty(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Candidate Zoom state paths for `os`, in removal order, without duplicates.
pub fn state_paths(os: TargetOs, env: &PathEnv) -> Vec<PathBuf> {
    let candidates = match os {
        TargetOs::Windows => {
            let roaming = env.roaming();
            let local = env.local();
            vec![
                roaming.join("Zoom"),
                local.join("Zoom"),
                roaming.join("zoom.us"),
                local.join("zoom.us"),
                local.join("ZoomOpener"),
                local.join("Temp").join("zoom"),
            ]
        }
        TargetOs::MacOs => {
            let library = env.home.join("Library");
            vec![
                library.join("Application Support").join("zoom.us"),
                library.join("Application Support").join("ZoomOpener"),
                library.join("Preferences").join("us.zoom.xos.plist"),
                library.join("Caches").join("us.zoom.xos"),
                library.join("Logs").join("zoom.us"),
                library.join("WebKit").join("us.zoom.xos"),
                library.join("Cookies").join("us.zoom.xos.binarycookies"),
            ]
        }
        TargetOs::Linux => {
            let home = &env.home;
            vec![
                home.join(".config").join("zoom"),
                home.join(".cache").join("zoom"),
                home.join(".zoom"),
                home.join(".var").join("app").join("us.zoom.Zoom"),
                home.join(".cache").join("ZoomOpener"),
            ]
        }
    };

    let mut paths = Vec::with_capacity(candidates.len());
    extend_unique(&mut paths, candidates);
    paths
}

/// Append `extra` to `paths`, skipping anything already present.
pub fn extend_unique(paths: &mut Vec<PathBuf>, extra: impl IntoIterator<Item = PathBuf>) {
    for path in extra {
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
}

/// Resolve a leading `~` component against `home`; other paths pass through.
pub fn expand_home(path: &Path, home: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == OsStr::new("~") => {
            let rest = components.as_path();
            if rest.as_os_str().is_empty() {
                home.to_path_buf()
            } else {
                home.join(rest)
            }
        }
        _ => path.to_path_buf(),
    }
}

/// Remove every path listed in `excluded`.
pub fn remove_excluded(paths: &mut Vec<PathBuf>, excluded: &[PathBuf]) {
    paths.retain(|p| !excluded.iter().any(|e| Path::new(e) == p.as_path()));
}
