//! Implementation of the `stratus deploy` command.

use std::path::PathBuf;

use anyhow::{bail, Context};
use stratus_deploy::{Deployer, FunctionName};

use super::{cancel_on_ctrl_c, load_config};

pub async fn run(
    config: Option<PathBuf>,
    name: Option<String>,
    owner: Option<String>,
    code: PathBuf,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let source = tokio::fs::read_to_string(&code)
        .await
        .with_context(|| format!("failed to read {}", code.display()))?;

    let deployer = Deployer::from_config(&config)?;
    let cancel = cancel_on_ctrl_c();

    let outcome = match (name, owner) {
        (Some(name), _) => {
            let name = FunctionName::new(name)?;
            deployer.deploy(&name, &source, &cancel).await?
        }
        (None, Some(owner)) => deployer.deploy_for_owner(&owner, &source, &cancel).await?,
        (None, None) => bail!("either --name or --owner is required"),
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
