//! facesync: copy messaging-app avatars onto directory contacts.
//!
//! # Usage
//!
//! ```text
//! facesync serve [--listen ADDR] --directory-contacts <file> --directory-photos <dir>
//!                --messaging-contacts <file> --messaging-photos <dir>
//! facesync run   [--keep-existing] [--session ID] <snapshot flags as above>
//! facesync config show|init [--force]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config::ConfigCommand, run::RunArgs, serve::ServeArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "facesync",
    version,
    about = "Sync contact photos from a messaging app into a contact directory",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the websocket progress server.
    Serve(ServeArgs),

    /// Run one sync in the foreground, printing progress events as JSON lines.
    Run(RunArgs),

    /// Inspect or create ~/.facesync/config.yaml.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => args.run(),
        Commands::Run(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}
