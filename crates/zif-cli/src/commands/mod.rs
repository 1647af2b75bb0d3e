//! CLI surface: global flags plus the install/remove/update/downgrade/
//! system-upgrade/run-manifest subcommands.

pub mod downgrade;
pub mod install;
pub mod remove;
pub mod run_manifest;
pub mod system_upgrade;
pub mod update;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// zif - dependency-resolving package transaction tool.
#[derive(Parser, Debug)]
#[command(name = "zif")]
#[command(author = "Zif Contributors")]
#[command(version)]
#[command(about = "Resolve and commit RPM package transactions", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Do not print anything but errors.
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v, -vv, -vvv).
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Allow committing a package whose signature isn't trusted (every
    /// package is untrusted until a real signing backend is linked in).
    #[arg(short = 'y', long, global = true)]
    pub assumeyes: bool,

    /// Root prefix the transaction operates under.
    #[arg(long, global = true, value_name = "DIR", default_value = "/")]
    pub root: PathBuf,

    /// `$releasever` substitution value.
    #[arg(long, global = true, default_value = "41")]
    pub releasever: String,

    /// Declarative world file describing installed and repo packages
    /// (`repo`/`package`/`requires`/... lines, same grammar zif-manifest
    /// test fixtures use). Required until a real rpmdb/repo backend
    /// exists.
    #[arg(long, global = true, value_name = "FILE")]
    pub world: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install one or more packages.
    Install(NameArgs),
    /// Remove one or more packages.
    Remove(NameArgs),
    /// Update one or more packages to the newest available version.
    Update(NameArgs),
    /// Downgrade one or more packages to an older available version.
    Downgrade(NameArgs),
    /// Update every installed package to the newest available version.
    SystemUpgrade,
    /// Run a manifest file directly (parses and executes every directive,
    /// including its own `install`/`update`/`run` lines).
    RunManifest(RunManifestArgs),
}

#[derive(Args, Debug, Clone)]
pub struct NameArgs {
    /// Package name(s) to act on.
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunManifestArgs {
    /// Path to the manifest file to execute.
    pub path: PathBuf,
}

/// Run `action` against `names` and print the resulting summary.
pub(crate) fn run_action(cli: &Cli, action: crate::engine::Action, names: &[String]) -> Result<()> {
    let summary = crate::engine::run_actions(cli, action, names)?;
    if !cli.quiet {
        println!("{} installed, {} removed, {} updated", summary.installed, summary.removed, summary.updated);
    }
    Ok(())
}
