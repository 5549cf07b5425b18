//! Implementation of the `stratus inspect` command.

use std::path::PathBuf;

use stratus_deploy::{Deployer, FunctionName};

use super::{cancel_on_ctrl_c, load_config};

pub async fn run(config: Option<PathBuf>, name: String) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let name = FunctionName::new(name)?;

    let deployer = Deployer::from_config(&config)?;
    let configuration = deployer.inspect(&name, &cancel_on_ctrl_c()).await?;

    println!("{}", serde_json::to_string_pretty(&configuration)?);
    Ok(())
}
