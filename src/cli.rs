//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI entry point for the savegame backup engine.
#[derive(Parser, Debug)]
#[command(name = "savegame", about = "Backs up game save data", version)]
pub struct Cli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Give more detail about what is happening
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Discover and back up save data into the output tree
    Backup(BackupOpts),
    /// Print version information
    Version,
}

/// Options for the `backup` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct BackupOpts {
    /// Configuration file to be used by the application
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Which folder to copy backed up files
    #[arg(short, long)]
    pub output: PathBuf,

    /// Use git for snapshots of the output tree
    #[arg(short, long)]
    pub git: bool,

    /// Create symlinks at the origin pointing into the output tree
    #[arg(short, long)]
    pub backlink: bool,

    /// Max depth for filesystem searches
    #[arg(long, default_value_t = 10)]
    pub max_depth: usize,

    /// Override the built-in rules directory
    #[arg(long)]
    pub rules: Option<PathBuf>,
}
