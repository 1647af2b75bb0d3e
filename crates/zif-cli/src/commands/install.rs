//! `zif install <name>...`

use super::{run_action, Cli, NameArgs};
use crate::engine::Action;
use anyhow::Result;

pub fn run(cli: &Cli, args: &NameArgs) -> Result<()> {
    run_action(cli, Action::Install, &args.names)
}
