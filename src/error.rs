//! Error types shared by every reset step

use std::io;
use std::path::PathBuf;

/// Errors that abort a reset (or one of its steps).
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    /// The running operating system has no known Zoom layout
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// No home directory could be determined for the current user
    #[error("Unable to determine the home directory")]
    HomeDirUnavailable,

    /// Enumerating running processes failed
    #[error("Failed to query running processes: {0}")]
    ProcessQuery(String),

    /// Reading or writing the configuration file failed
    #[error("Config error ({}): {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// A filesystem operation on `path` failed
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ResetError {
    /// Attach the offending path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ResetError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for reset operations.
pub type ResetResult<T> = Result<T, ResetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResetError::UnsupportedPlatform("freebsd".into());
        assert_eq!(err.to_string(), "Unsupported platform: freebsd");

        let err = ResetError::io(
            "/tmp/zoom",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "I/O error at /tmp/zoom: denied");
    }
}
