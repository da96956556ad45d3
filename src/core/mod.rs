//! Core reset logic

pub mod backup;
pub mod config;
pub mod reset;
