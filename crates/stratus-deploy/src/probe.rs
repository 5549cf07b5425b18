//! Function existence probing.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::DeployResult;
use crate::platform::{cancellable, FunctionPlatform, Operation};
use crate::types::FunctionName;

/// Check whether a function with exactly this name is registered.
///
/// Any failed query counts as "absent", so `false` does not distinguish a
/// missing function from one that could not be looked up. A transient fault
/// therefore routes the deployment to creation, where the platform reports
/// the conflict. Only cancellation is returned as an error.
pub async fn function_exists(
    platform: &dyn FunctionPlatform,
    name: &FunctionName,
    cancel: &CancellationToken,
) -> DeployResult<bool> {
    let result = cancellable(cancel, Operation::GetFunction, platform.get_function(name)).await?;

    match result {
        Ok(response) if response.configuration.function_name == name.as_str() => Ok(true),
        Ok(response) => {
            warn!(
                function = %name,
                reported = %response.configuration.function_name,
                "platform reported a different function name, treating as absent"
            );
            Ok(false)
        }
        Err(e) if e.is_not_found() => {
            debug!(function = %name, "function not found");
            Ok(false)
        }
        Err(e) => {
            warn!(
                function = %name,
                error = %e,
                "existence query failed, treating function as absent"
            );
            Ok(false)
        }
    }
}
