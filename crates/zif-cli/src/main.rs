//! zif - a command-line front end for the zif transaction engine.
//!
//! Wires `clap` argument parsing to `zif-transaction`'s resolve/prepare/
//! commit pipeline. No metadata refresh engine and no primary.xml parser
//! live here: packages come from a declarative "world" file (the same
//! `repo`/`package` vocabulary `zif-manifest` uses) until a real rpmdb and
//! repository backend are linked in.

#![warn(clippy::all)]

mod backend;
mod commands;
mod engine;
mod progress;
mod world;

use clap::Parser;
use commands::{Cli, Commands};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 if cli.quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let result = match &cli.command {
        Commands::Install(args) => commands::install::run(&cli, args),
        Commands::Remove(args) => commands::remove::run(&cli, args),
        Commands::Update(args) => commands::update::run(&cli, args),
        Commands::Downgrade(args) => commands::downgrade::run(&cli, args),
        Commands::SystemUpgrade => commands::system_upgrade::run(&cli),
        Commands::RunManifest(args) => commands::run_manifest::run(&cli, args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
