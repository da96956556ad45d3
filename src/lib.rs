//! Zoom 1132 Reset
//!
//! Recovers the Zoom client from error 1132 (corrupted local state) by
//! stopping every running Zoom process and moving its configuration, cache
//! and log directories into a timestamped backup. Zoom rebuilds a clean
//! state on the next launch.
//!
//! ## Safety
//!
//! - Nothing is deleted: state is moved, never removed outright
//! - Each run gets its own `YYYYMMDD-HHMMSS` backup directory
//! - Dry-run mode reports every action without touching anything

pub mod core;
pub mod error;
pub mod platform;

// Re-exports
pub use crate::core::backup::MoveOutcome;
pub use crate::core::config::ResetConfig;
pub use crate::core::reset::{
    perform_reset, perform_reset_with, ResetOptions, ResetReport, ResetStep,
};
pub use error::{ResetError, ResetResult};
pub use platform::{KillOutcome, KillStatus, PathEnv, ProcessInfo, TargetOs};
