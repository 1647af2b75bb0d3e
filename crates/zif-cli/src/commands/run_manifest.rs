//! `zif run-manifest <file>`: execute a manifest file's own directives
//! verbatim, the same entry point zif-manifest's test suite uses.

use super::{Cli, RunManifestArgs};
use anyhow::{Context, Result};
use zif_core::Arch;
use zif_manifest::ManifestRunner;

pub fn run(cli: &Cli, args: &RunManifestArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.path)
        .with_context(|| format!("reading manifest {}", args.path.display()))?;
    let runner = ManifestRunner::new(native_arch());
    let report = runner.run(&text)?;

    if report.skipped {
        if !cli.quiet {
            println!("manifest disabled, skipped");
        }
        return Ok(());
    }
    if !cli.quiet {
        for (idx, summary) in report.summaries.iter().enumerate() {
            println!(
                "run {}: {} installed, {} removed, {} updated",
                idx + 1,
                summary.installed,
                summary.removed,
                summary.updated
            );
        }
    }
    Ok(())
}

fn native_arch() -> Arch {
    Arch::new(std::env::consts::ARCH)
}
