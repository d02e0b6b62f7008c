use anyhow::{Context, Result};
use clap::Args;
use devserver_launch::RunError;

use crate::config::{LaunchArgs, resolve_configuration};

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    launch: LaunchArgs,
}

pub fn run(args: ShowArgs) -> Result<()> {
    let config = resolve_configuration(&args.launch).map_err(RunError::from)?;
    let payload =
        serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?;
    println!("{payload}");
    Ok(())
}
