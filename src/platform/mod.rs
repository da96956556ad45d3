//! Platform layer for the Zoom reset
//!
//! Everything that differs between operating systems lives here:
//!
//! ```text
//! src/platform/
//! +-- mod.rs       <- This file (OS detection)
//! +-- paths.rs     <- Per-OS Zoom state locations
//! +-- process.rs   <- Process discovery and termination
//! ```
//!
//! # Platform Support
//!
//! | Feature | Windows | macOS | Linux |
//! |---------|---------|-------|-------|
//! | State paths | %APPDATA% / %LOCALAPPDATA% | ~/Library | XDG dirs + Flatpak |
//! | Process discovery | sysinfo | sysinfo | sysinfo |
//! | Termination | TerminateProcess | SIGTERM | SIGTERM |

pub mod paths;
pub mod process;

pub use paths::{state_paths, PathEnv};
pub use process::{
    find_processes, terminate, terminate_one, wait_for_exit, KillOutcome, KillStatus, ProcessInfo,
};

use std::fmt;
use std::str::FromStr;

use crate::error::{ResetError, ResetResult};

/// Operating systems with a known Zoom layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetOs {
    Windows,
    MacOs,
    Linux,
}

impl TargetOs {
    /// Detect the operating system this binary runs on.
    pub fn detect() -> ResetResult<Self> {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` style name to a supported target.
    pub fn from_os_name(name: &str) -> ResetResult<Self> {
        match name {
            "windows" => Ok(TargetOs::Windows),
            "macos" => Ok(TargetOs::MacOs),
            "linux" => Ok(TargetOs::Linux),
            other => Err(ResetError::UnsupportedPlatform(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOs::Windows => "windows",
            TargetOs::MacOs => "macos",
            TargetOs::Linux => "linux",
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetOs {
    type Err = ResetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_os_name(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_os_name() {
        assert_eq!(TargetOs::from_os_name("windows").unwrap(), TargetOs::Windows);
        assert_eq!(TargetOs::from_os_name("macos").unwrap(), TargetOs::MacOs);
        assert_eq!(TargetOs::from_os_name("linux").unwrap(), TargetOs::Linux);
    }

    #[test]
    fn test_unsupported_platform() {
        let err = TargetOs::from_os_name("freebsd").unwrap_err();
        assert!(matches!(err, ResetError::UnsupportedPlatform(ref name) if name == "freebsd"));
    }

    #[test]
    fn test_display_round_trip() {
        for os in [TargetOs::Windows, TargetOs::MacOs, TargetOs::Linux] {
            assert_eq!(os.to_string().parse::<TargetOs>().unwrap(), os);
        }
    }

    #[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
    #[test]
    fn test_detect_current() {
        assert_eq!(TargetOs::detect().unwrap().as_str(), std::env::consts::OS);
    }
}
