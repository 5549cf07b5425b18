//! Error types for stratus-deploy.

use crate::platform::{Operation, PlatformError};

/// Result type alias using [`DeployError`].
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that terminate a deployment.
///
/// Every variant is fatal to the current `deploy` call. Nothing is retried
/// and remote changes that already succeeded are left in place.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Building the archive failed.
    #[error("packaging error: {0}")]
    Packaging(String),

    /// No runtime layer version could be resolved.
    #[error("layer resolution error: {0}")]
    LayerResolution(String),

    /// A call to the remote platform failed.
    #[error("{operation} failed: {source}")]
    RemoteCall {
        /// Platform operation that failed.
        operation: Operation,
        /// Underlying platform error.
        #[source]
        source: PlatformError,
    },

    /// The logical function name is not acceptable to the platform.
    #[error("invalid function name: {0}")]
    InvalidName(String),

    /// The caller cancelled the deployment.
    #[error("deployment cancelled during {0}")]
    Cancelled(Operation),

    /// The deployment exceeded its time budget.
    #[error("deployment timed out after {0}s")]
    TimedOut(u64),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DeployError {
    /// Create a packaging error.
    #[must_use]
    pub fn packaging(msg: impl Into<String>) -> Self {
        Self::Packaging(msg.into())
    }

    /// Create a layer resolution error.
    #[must_use]
    pub fn layer_resolution(msg: impl Into<String>) -> Self {
        Self::LayerResolution(msg.into())
    }

    /// Wrap a platform error raised by `operation`.
    #[must_use]
    pub fn remote(operation: Operation, source: PlatformError) -> Self {
        Self::RemoteCall { operation, source }
    }

    /// Short machine-readable name of the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Packaging(_) => "packaging",
            Self::LayerResolution(_) => "layer_resolution",
            Self::RemoteCall { .. } => "remote_call",
            Self::InvalidName(_) => "invalid_name",
            Self::Cancelled(_) => "cancelled",
            Self::TimedOut(_) => "timed_out",
            Self::Config(_) => "config",
        }
    }
}

impl From<zip::result::ZipError> for DeployError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Packaging(err.to_string())
    }
}
