//! Top-level subcommand orchestration.
pub mod backup;
