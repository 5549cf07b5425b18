//! Runtime layer resolution.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{DeployError, DeployResult};
use crate::platform::{cancellable, FunctionPlatform, Operation};
use crate::types::{validate_layer_name, LayerVersionRef};

/// Resolve the most recently published version of a layer.
///
/// The platform lists versions newest first; the first entry wins. An empty
/// listing or a failed query is fatal, since functions cannot run without
/// their runtime layer. A name that cannot form a valid route is rejected
/// before any call.
pub async fn resolve_latest_layer(
    platform: &dyn FunctionPlatform,
    layer_name: &str,
    cancel: &CancellationToken,
) -> DeployResult<LayerVersionRef> {
    validate_layer_name(layer_name)?;

    let versions = cancellable(
        cancel,
        Operation::ListLayerVersions,
        platform.list_layer_versions(layer_name),
    )
    .await?
    .map_err(|e| {
        DeployError::layer_resolution(format!("failed to list versions of {layer_name}: {e}"))
    })?;

    let latest = versions.into_iter().next().ok_or_else(|| {
        DeployError::layer_resolution(format!("layer {layer_name} has no published versions"))
    })?;

    debug!(
        layer = %layer_name,
        version = latest.version,
        arn = %latest.layer_version_arn,
        "resolved latest layer version"
    );

    Ok(LayerVersionRef::new(latest.layer_version_arn))
}
