//! Remote compute platform interface.
//!
//! The orchestrator never talks to the platform directly; it goes through a
//! [`FunctionPlatform`] handed to it by the caller. [`HttpPlatform`] speaks the
//! platform's REST dialect, [`MemoryPlatform`] keeps everything in process and
//! records each call.
//!
//! Request and response shapes mirror the platform's JSON field names.

mod http;
mod memory;

pub use http::HttpPlatform;
pub use memory::{MemoryPlatform, PlatformCall};

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::{PlatformConfig, PlatformType};
use crate::error::{DeployError, DeployResult};
use crate::types::{FunctionName, LayerVersionRef};

/// Result type alias using [`PlatformError`].
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors returned by a platform call.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The requested function or layer does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The platform rejected the request.
    #[error("{kind} ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Platform error type, e.g. `ResourceConflictException`.
        kind: String,
        /// Human-readable message from the platform.
        message: String,
    },

    /// The request never got a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// An acknowledged update failed or never finished applying.
    #[error("update did not complete: {0}")]
    UpdateIncomplete(String),
}

impl PlatformError {
    /// Create an API error.
    #[must_use]
    pub fn api(status: u16, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error reports a missing resource.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// The six platform calls made during a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Query whether a function exists.
    GetFunction,
    /// Query a function's configuration.
    GetFunctionConfiguration,
    /// Create a function.
    CreateFunction,
    /// Update a function's configuration.
    UpdateFunctionConfiguration,
    /// Replace a function's code.
    UpdateFunctionCode,
    /// List published versions of a layer.
    ListLayerVersions,
}

impl Operation {
    /// Get the operation name as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GetFunction => "get-function",
            Self::GetFunctionConfiguration => "get-function-configuration",
            Self::CreateFunction => "create-function",
            Self::UpdateFunctionConfiguration => "update-function-configuration",
            Self::UpdateFunctionCode => "update-function-code",
            Self::ListLayerVersions => "list-layer-versions",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A function's configuration as reported by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FunctionConfiguration {
    /// Function name.
    pub function_name: String,
    /// Fully qualified function ARN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_arn: Option<String>,
    /// Runtime identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    /// Execution role reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Entry-point identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    /// Execution timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Base64 SHA-256 of the deployed archive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_sha256: Option<String>,
    /// Version this configuration describes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Attached layers.
    pub layers: Vec<AttachedLayer>,
    /// Function state, e.g. `Active` or `Pending`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Status of the most recent update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_status: Option<LastUpdateStatus>,
}

/// A layer attached to a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachedLayer {
    /// Layer version ARN.
    pub arn: String,
    /// Layer size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_size: Option<u64>,
}

/// Progress of the most recent function update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LastUpdateStatus {
    /// The update has been applied.
    Successful,
    /// The update failed.
    Failed,
    /// The update is still being applied.
    InProgress,
    /// A status this client does not know.
    #[serde(other)]
    Unknown,
}

/// Response of the existence query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetFunctionResponse {
    /// Current configuration.
    pub configuration: FunctionConfiguration,
}

/// Inline archive upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionCode {
    /// Archive bytes, base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub zip_file: Vec<u8>,
}

/// Request to create a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateFunctionRequest {
    /// Function name.
    pub function_name: FunctionName,
    /// Execution role reference.
    pub role: String,
    /// Runtime identifier.
    pub runtime: String,
    /// Entry-point identifier.
    pub handler: String,
    /// Package type marker.
    pub package_type: String,
    /// Layers to attach.
    pub layers: Vec<LayerVersionRef>,
    /// Code payload.
    pub code: FunctionCode,
    /// Publish the created function as a version.
    pub publish: bool,
    /// Execution timeout in seconds.
    pub timeout: u64,
}

/// Request to update a function's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateConfigurationRequest {
    /// Function name, carried in the request path.
    #[serde(skip)]
    pub function_name: FunctionName,
    /// Execution role reference.
    pub role: String,
    /// Runtime identifier.
    pub runtime: String,
    /// Entry-point identifier.
    pub handler: String,
    /// Layers to attach.
    pub layers: Vec<LayerVersionRef>,
    /// Execution timeout in seconds.
    pub timeout: u64,
}

/// Request to replace a function's code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateCodeRequest {
    /// Function name, carried in the request path.
    #[serde(skip)]
    pub function_name: FunctionName,
    /// Archive bytes, base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub zip_file: Vec<u8>,
    /// Publish the new code as a version.
    pub publish: bool,
}

/// One published layer version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LayerVersion {
    /// Layer version ARN.
    pub layer_version_arn: String,
    /// Version number.
    pub version: u64,
    /// Publication timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

/// Response of the layer version listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ListLayerVersionsResponse {
    /// Versions, most recent first.
    pub layer_versions: Vec<LayerVersion>,
    /// Pagination marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_marker: Option<String>,
}

/// Client for the remote compute platform.
#[async_trait]
pub trait FunctionPlatform: Send + Sync {
    /// Look up a function by exact name.
    async fn get_function(&self, name: &FunctionName) -> PlatformResult<GetFunctionResponse>;

    /// Fetch a function's current configuration.
    async fn get_function_configuration(
        &self,
        name: &FunctionName,
    ) -> PlatformResult<FunctionConfiguration>;

    /// Create a function.
    async fn create_function(
        &self,
        request: &CreateFunctionRequest,
    ) -> PlatformResult<FunctionConfiguration>;

    /// Update a function's configuration.
    async fn update_function_configuration(
        &self,
        request: &UpdateConfigurationRequest,
    ) -> PlatformResult<FunctionConfiguration>;

    /// Replace a function's code.
    async fn update_function_code(
        &self,
        request: &UpdateCodeRequest,
    ) -> PlatformResult<FunctionConfiguration>;

    /// List published versions of a layer, most recent first.
    async fn list_layer_versions(&self, layer_name: &str) -> PlatformResult<Vec<LayerVersion>>;
}

/// Create a platform client from configuration.
pub fn create_platform(config: &PlatformConfig) -> DeployResult<Arc<dyn FunctionPlatform>> {
    match config.platform_type {
        PlatformType::Http => Ok(Arc::new(HttpPlatform::new(config)?)),
        PlatformType::Memory => Ok(Arc::new(MemoryPlatform::new())),
    }
}

/// Run a platform call unless the deployment is cancelled first.
///
/// The outer result carries cancellation, the inner one the call's outcome.
pub(crate) async fn cancellable<T, F>(
    cancel: &CancellationToken,
    operation: Operation,
    call: F,
) -> DeployResult<PlatformResult<T>>
where
    F: Future<Output = PlatformResult<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(DeployError::Cancelled(operation)),
        result = call => Ok(result),
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
