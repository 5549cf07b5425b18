//! Deployment entry point.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{DeployConfig, DeploymentConfig, FunctionConfig};
use crate::error::{DeployError, DeployResult};
use crate::package::package;
use crate::platform::{
    cancellable, create_platform, FunctionConfiguration, FunctionPlatform, Operation,
};
use crate::probe::function_exists;
use crate::reconcile::Reconciler;
use crate::types::FunctionName;

/// What a deployment did to the remote function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DeployAction {
    /// The function did not exist and was created.
    Created,
    /// The function existed; its code was republished.
    Updated {
        /// Whether the configuration was updated first.
        configuration_changed: bool,
    },
}

/// Result of a successful deployment.
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    /// Deployed function.
    pub name: FunctionName,
    /// Path taken.
    #[serde(flatten)]
    pub action: DeployAction,
    /// Version published by the deployment, as reported by the platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Digest of the uploaded archive.
    pub code_sha256: String,
}

/// Packages code and reconciles the remote function with it.
///
/// Each [`deploy`](Self::deploy) is a strictly sequential chain of platform
/// calls. Deployments of different functions may run concurrently; nothing
/// serialises deployments of the same function.
pub struct Deployer {
    platform: Arc<dyn FunctionPlatform>,
    function: FunctionConfig,
    deployment: DeploymentConfig,
}

impl Deployer {
    /// Create a deployer over an existing platform client.
    pub fn new(
        platform: Arc<dyn FunctionPlatform>,
        function: FunctionConfig,
        deployment: DeploymentConfig,
    ) -> Self {
        Self {
            platform,
            function,
            deployment,
        }
    }

    /// Create a deployer and its platform client from configuration.
    pub fn from_config(config: &DeployConfig) -> DeployResult<Self> {
        let platform = create_platform(&config.platform)?;
        info!(
            platform_type = ?config.platform.platform_type,
            endpoint = %config.platform.endpoint,
            "platform client configured"
        );
        Ok(Self::new(
            platform,
            config.function.clone(),
            config.deployment.clone(),
        ))
    }

    /// Deploy `code` as the function `name`.
    ///
    /// Creates the function if the platform does not report it, otherwise
    /// updates it. Stops at the first failure without undoing earlier calls.
    pub async fn deploy(
        &self,
        name: &FunctionName,
        code: &str,
        cancel: &CancellationToken,
    ) -> DeployResult<DeployOutcome> {
        info!(function = %name, code_bytes = code.len(), "starting deployment");

        let budget = self.deployment.timeout();
        let result = match tokio::time::timeout(budget, self.execute(name, code, cancel)).await {
            Ok(result) => result,
            Err(_) => Err(DeployError::TimedOut(self.deployment.timeout_secs)),
        };

        match &result {
            Ok(outcome) => info!(
                function = %name,
                action = ?outcome.action,
                version = ?outcome.version,
                "deployment completed successfully"
            ),
            Err(e) => error!(function = %name, kind = e.kind(), error = %e, "deployment failed"),
        }

        result
    }

    /// Deploy `code` for an owning resource, deriving the function name.
    pub async fn deploy_for_owner(
        &self,
        owner_id: &str,
        code: &str,
        cancel: &CancellationToken,
    ) -> DeployResult<DeployOutcome> {
        let name = FunctionName::for_owner(&self.function.name_prefix, owner_id)?;
        self.deploy(&name, code, cancel).await
    }

    /// Fetch the current remote configuration of a function.
    pub async fn inspect(
        &self,
        name: &FunctionName,
        cancel: &CancellationToken,
    ) -> DeployResult<FunctionConfiguration> {
        let operation = Operation::GetFunctionConfiguration;
        cancellable(
            cancel,
            operation,
            self.platform.get_function_configuration(name),
        )
        .await?
        .map_err(|e| DeployError::remote(operation, e))
    }

    async fn execute(
        &self,
        name: &FunctionName,
        code: &str,
        cancel: &CancellationToken,
    ) -> DeployResult<DeployOutcome> {
        let archive = package(code)?;
        let code_sha256 = archive.sha256();

        let reconciler = Reconciler::new(
            self.platform.as_ref(),
            &self.function,
            &self.deployment,
            cancel,
        );

        if function_exists(self.platform.as_ref(), name, cancel).await? {
            info!(function = %name, "function exists, updating");
            let outcome = reconciler.update(name, archive).await?;

            Ok(DeployOutcome {
                name: name.clone(),
                action: DeployAction::Updated {
                    configuration_changed: !outcome.diff.is_empty(),
                },
                version: outcome.configuration.version,
                code_sha256,
            })
        } else {
            info!(function = %name, "function absent, creating");
            let configuration = reconciler.create(name, archive).await?;

            Ok(DeployOutcome {
                name: name.clone(),
                action: DeployAction::Created,
                version: configuration.version,
                code_sha256,
            })
        }
    }
}

impl std::fmt::Debug for Deployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer")
            .field("function", &self.function)
            .field("deployment", &self.deployment)
            .finish_non_exhaustive()
    }
}
