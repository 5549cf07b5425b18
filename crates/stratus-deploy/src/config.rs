//! Configuration for stratus-deploy.

use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::error::{DeployError, DeployResult};

/// Top-level deployment configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DeployConfig {
    /// Remote platform connection.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Static values shared by every deployed function.
    #[serde(default)]
    pub function: FunctionConfig,

    /// Deployment behaviour.
    #[serde(default)]
    pub deployment: DeploymentConfig,
}

impl DeployConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `stratus.toml` in the current directory (if present)
    /// 3. Environment variables with `STRATUS_` prefix
    pub fn load() -> DeployResult<Self> {
        Self::layered(Path::new("stratus.toml"))
    }

    /// Load configuration from a specific TOML file.
    ///
    /// Unlike [`load`](Self::load), the file must exist. Environment
    /// variables prefixed with `STRATUS_` still override file settings.
    pub fn from_file(path: impl AsRef<Path>) -> DeployResult<Self> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(DeployError::Config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        Self::layered(path)
    }

    fn layered(path: &Path) -> DeployResult<Self> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("STRATUS_").split("__"))
            .extract()
            .map_err(|e| DeployError::Config(e.to_string()))
    }
}

/// Remote platform connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Which platform client to use.
    #[serde(default)]
    pub platform_type: PlatformType,

    /// Base URL of the platform API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:4566".to_owned()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            platform_type: PlatformType::default(),
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Type of platform client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformType {
    /// REST client for a remote platform endpoint.
    #[default]
    Http,

    /// In-process platform for testing and dry runs.
    Memory,
}

/// Static function settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionConfig {
    /// Execution role reference attached to every function.
    #[serde(default = "default_role")]
    pub role: String,

    /// Logical name of the shared runtime layer.
    #[serde(default = "default_layer_name")]
    pub layer_name: String,

    /// Prefix used when deriving a function name from an owner identifier.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

fn default_role() -> String {
    "arn:aws:iam::000000000000:role/function-runner".to_owned()
}

fn default_layer_name() -> String {
    "stratus-runtime".to_owned()
}

fn default_name_prefix() -> String {
    "fn-".to_owned()
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            role: default_role(),
            layer_name: default_layer_name(),
            name_prefix: default_name_prefix(),
        }
    }
}

/// Deployment behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentConfig {
    /// Time budget for one whole deployment in seconds.
    #[serde(default = "default_deployment_timeout_secs")]
    pub timeout_secs: u64,

    /// How long to wait for a configuration update to settle.
    #[serde(default = "default_settle_timeout_secs")]
    pub settle_timeout_secs: u64,

    /// Interval between configuration polls while settling, in milliseconds.
    #[serde(default = "default_settle_poll_interval_ms")]
    pub settle_poll_interval_ms: u64,
}

const fn default_deployment_timeout_secs() -> u64 {
    60
}

const fn default_settle_timeout_secs() -> u64 {
    30
}

const fn default_settle_poll_interval_ms() -> u64 {
    500
}

impl DeploymentConfig {
    /// Deployment time budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Settle wait budget.
    #[must_use]
    pub const fn settle_timeout(&self) -> Duration {
        Duration::from_secs(self.settle_timeout_secs)
    }

    /// Settle poll interval.
    #[must_use]
    pub const fn settle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.settle_poll_interval_ms)
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_deployment_timeout_secs(),
            settle_timeout_secs: default_settle_timeout_secs(),
            settle_poll_interval_ms: default_settle_poll_interval_ms(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DeployConfig::default();
        assert_eq!(config.platform.platform_type, PlatformType::Http);
        assert_eq!(config.platform.endpoint, "http://localhost:4566");
        assert_eq!(config.function.layer_name, "stratus-runtime");
        assert_eq!(config.function.name_prefix, "fn-");
        assert_eq!(config.deployment.timeout(), Duration::from_secs(60));
        assert_eq!(
            config.deployment.settle_poll_interval(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn config_from_toml() {
        let toml = r#"
            [platform]
            platform_type = "memory"
            endpoint = "http://lambda.internal:9001"

            [function]
            role = "arn:aws:iam::123456789012:role/runner"
            layer_name = "shared-node-deps"

            [deployment]
            timeout_secs = 120
        "#;

        let config: DeployConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.platform.platform_type, PlatformType::Memory);
        assert_eq!(config.platform.endpoint, "http://lambda.internal:9001");
        assert_eq!(config.platform.request_timeout_secs, 30);
        assert_eq!(config.function.role, "arn:aws:iam::123456789012:role/runner");
        assert_eq!(config.function.layer_name, "shared-node-deps");
        assert_eq!(config.function.name_prefix, "fn-");
        assert_eq!(config.deployment.timeout_secs, 120);
        assert_eq!(config.deployment.settle_timeout_secs, 30);
    }

    #[test]
    fn explicit_missing_file_is_rejected() {
        let err = DeployConfig::from_file("/nonexistent/prod-stratus.toml").unwrap_err();

        assert!(matches!(err, DeployError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/prod-stratus.toml"));
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prod.toml");
        std::fs::write(
            &path,
            "[function]\nrole = \"arn:aws:iam::123456789012:role/prod\"\n",
        )
        .unwrap();

        let config = DeployConfig::from_file(&path).unwrap();
        assert_eq!(config.function.role, "arn:aws:iam::123456789012:role/prod");
        assert_eq!(config.function.layer_name, "stratus-runtime");
    }

    #[test]
    fn directory_is_not_a_config_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DeployConfig::from_file(dir.path()),
            Err(DeployError::Config(_))
        ));
    }
}
