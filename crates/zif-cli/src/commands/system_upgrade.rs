//! `zif system-upgrade`: update every currently installed package.

use super::{run_action, Cli};
use crate::engine::Action;
use anyhow::{bail, Result};

pub fn run(cli: &Cli) -> Result<()> {
    let Some(world) = &cli.world else {
        bail!("system-upgrade requires --world <FILE> until a real rpmdb/repo backend is linked in");
    };
    let names = crate::world::installed_package_names(world)?;
    if names.is_empty() {
        if !cli.quiet {
            println!("nothing installed, nothing to do");
        }
        return Ok(());
    }
    run_action(cli, Action::Update, &names)
}
