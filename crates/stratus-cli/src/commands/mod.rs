//! Subcommand implementations.

pub mod deploy;
pub mod inspect;

use std::path::PathBuf;

use anyhow::Context;
use stratus_deploy::DeployConfig;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Load configuration from an explicit file or the default locations.
pub fn load_config(path: Option<PathBuf>) -> anyhow::Result<DeployConfig> {
    match path {
        Some(path) => DeployConfig::from_file(&path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => DeployConfig::load().context("failed to load configuration"),
    }
}

/// Token cancelled on the first Ctrl+C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            trigger.cancel();
        }
    });

    token
}
