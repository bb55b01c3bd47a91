//! Command-line entry point for the `savegame` backup tool.

use anyhow::Result;
use clap::Parser;

use savegame_cli::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    logging::init(args.verbose);

    match args.command {
        cli::Command::Backup(opts) => commands::backup::run(&opts),
        cli::Command::Version => {
            let version = option_env!("SAVEGAME_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
            println!("savegame {version}");
            Ok(())
        }
    }
}
