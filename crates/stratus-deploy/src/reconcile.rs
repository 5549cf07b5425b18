//! Create-or-update reconciliation of a single function.
//!
//! ```text
//!            exists?
//!          ┌───┴────┐
//!        no│        │yes
//!          ▼        ▼
//!       CREATE    UPDATE: fetch config ─▶ resolve layer ─▶ diff
//!                                                          │
//!                                      drift? ─yes─▶ update config ─▶ wait settled
//!                                          │no                            │
//!                                          └──────────▶ update code ◀─────┘
//! ```
//!
//! The configuration step always finishes before the code step starts; the
//! platform rejects code updates while a configuration change is in flight.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{DeploymentConfig, FunctionConfig};
use crate::error::{DeployError, DeployResult};
use crate::function::{ConfigDiff, DesiredConfiguration, PUBLISH};
use crate::layer::resolve_latest_layer;
use crate::package::Archive;
use crate::platform::{
    cancellable, FunctionConfiguration, FunctionPlatform, LastUpdateStatus, Operation,
    PlatformError, PlatformResult, UpdateCodeRequest,
};
use crate::types::FunctionName;

/// Result of the update path.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// Fields that differed before the update. Empty when the configuration
    /// update was skipped.
    pub diff: ConfigDiff,
    /// Configuration reported after the code update.
    pub configuration: FunctionConfiguration,
}

/// Drives one function towards its desired state.
pub struct Reconciler<'a> {
    platform: &'a dyn FunctionPlatform,
    function: &'a FunctionConfig,
    deployment: &'a DeploymentConfig,
    cancel: &'a CancellationToken,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler for one deployment.
    #[must_use]
    pub const fn new(
        platform: &'a dyn FunctionPlatform,
        function: &'a FunctionConfig,
        deployment: &'a DeploymentConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            platform,
            function,
            deployment,
            cancel,
        }
    }

    /// Create the function with its full desired configuration and code.
    pub async fn create(
        &self,
        name: &FunctionName,
        archive: Archive,
    ) -> DeployResult<FunctionConfiguration> {
        let desired = self.desired().await?;

        info!(
            function = %name,
            layer = %desired.layer,
            archive_bytes = archive.len(),
            "creating function"
        );

        let request = desired.create_request(name, archive.into_bytes());
        self.call(
            Operation::CreateFunction,
            self.platform.create_function(&request),
        )
        .await
    }

    /// Bring configuration up to date if it drifted, then republish the code.
    pub async fn update(
        &self,
        name: &FunctionName,
        archive: Archive,
    ) -> DeployResult<UpdateOutcome> {
        let diff = self.reconcile_configuration(name).await?;
        let configuration = self.replace_code(name, archive).await?;

        Ok(UpdateOutcome {
            diff,
            configuration,
        })
    }

    async fn desired(&self) -> DeployResult<DesiredConfiguration> {
        let layer =
            resolve_latest_layer(self.platform, &self.function.layer_name, self.cancel).await?;
        Ok(DesiredConfiguration::from_config(self.function, layer))
    }

    async fn reconcile_configuration(&self, name: &FunctionName) -> DeployResult<ConfigDiff> {
        let current = self
            .call(
                Operation::GetFunctionConfiguration,
                self.platform.get_function_configuration(name),
            )
            .await?;
        let desired = self.desired().await?;

        let diff = desired.diff(&current);
        if diff.is_empty() {
            info!(function = %name, "configuration up to date, skipping update");
            return Ok(diff);
        }

        info!(
            function = %name,
            drift = %diff,
            layer = %desired.layer,
            "updating function configuration"
        );

        let updated = self
            .call(
                Operation::UpdateFunctionConfiguration,
                self.platform
                    .update_function_configuration(&desired.update_request(name)),
            )
            .await?;

        self.wait_settled(name, updated).await?;
        Ok(diff)
    }

    /// Poll until an acknowledged configuration update has been applied.
    async fn wait_settled(
        &self,
        name: &FunctionName,
        mut configuration: FunctionConfiguration,
    ) -> DeployResult<()> {
        // An unrepresentable deadline means no settle limit; the deploy budget still applies.
        let deadline = Instant::now().checked_add(self.deployment.settle_timeout());
        let poll_interval = self.deployment.settle_poll_interval();

        loop {
            match configuration.last_update_status {
                Some(LastUpdateStatus::InProgress) => {}
                Some(LastUpdateStatus::Failed) => {
                    return Err(DeployError::remote(
                        Operation::UpdateFunctionConfiguration,
                        PlatformError::UpdateIncomplete(format!(
                            "configuration update of {name} failed"
                        )),
                    ));
                }
                _ => return Ok(()),
            }

            let next_poll = Instant::now().checked_add(poll_interval);
            let past_deadline = match (deadline, next_poll) {
                (Some(deadline), Some(next_poll)) => next_poll > deadline,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if past_deadline {
                return Err(DeployError::remote(
                    Operation::UpdateFunctionConfiguration,
                    PlatformError::UpdateIncomplete(format!(
                        "configuration update of {name} still in progress after {}s",
                        self.deployment.settle_timeout_secs
                    )),
                ));
            }

            debug!(function = %name, "waiting for configuration update to settle");
            self.pause(poll_interval).await?;

            configuration = self
                .call(
                    Operation::GetFunctionConfiguration,
                    self.platform.get_function_configuration(name),
                )
                .await?;
        }
    }

    async fn replace_code(
        &self,
        name: &FunctionName,
        archive: Archive,
    ) -> DeployResult<FunctionConfiguration> {
        let request = UpdateCodeRequest {
            function_name: name.clone(),
            zip_file: archive.into_bytes(),
            publish: PUBLISH,
        };

        info!(
            function = %name,
            archive_bytes = request.zip_file.len(),
            "publishing function code"
        );

        self.call(
            Operation::UpdateFunctionCode,
            self.platform.update_function_code(&request),
        )
        .await
    }

    async fn call<T>(
        &self,
        operation: Operation,
        call: impl Future<Output = PlatformResult<T>>,
    ) -> DeployResult<T> {
        cancellable(self.cancel, operation, call)
            .await?
            .map_err(|e| DeployError::remote(operation, e))
    }

    async fn pause(&self, duration: Duration) -> DeployResult<()> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                Err(DeployError::Cancelled(Operation::UpdateFunctionConfiguration))
            }
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

impl std::fmt::Debug for Reconciler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("layer_name", &self.function.layer_name)
            .finish_non_exhaustive()
    }
}
