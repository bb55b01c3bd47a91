//! Savegame backup engine.
//!
//! Discovers, classifies, and copies game save data from arbitrary machine
//! locations into a structured, optionally git-versioned output tree, and
//! can redirect games to write straight into that tree via symlink
//! backlinks.  Discovery is rule-driven: per-application rule files map
//! path templates (`$home/.minecraft/saves`, `$installdir/profiles/*`)
//! onto roots found on the machine.
//!
//! The public API is organised in layers:
//!
//! - **[`config`]** — the INI settings store with typed lookups
//! - **[`rules`]** — rule files and the variable reverse index
//! - **[`discovery`]** — home/vendor root discovery
//! - **[`engine`]** — the per-run session: containment checks, glob
//!   expansion, idempotent copies, backlinks, diagnostics
//! - **[`snapshot`]** — the version-control collaborator
//! - **[`commands`]** — top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod exec;
pub mod logging;
pub mod report;
pub mod rules;
pub mod snapshot;
pub mod vars;
