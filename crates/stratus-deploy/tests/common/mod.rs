//! Common test utilities for deployment integration tests.

#![allow(dead_code)]

pub mod emulator;

use std::sync::Arc;

use stratus_deploy::function::{HANDLER, RUNTIME};
use stratus_deploy::platform::AttachedLayer;
use stratus_deploy::{
    DeployConfig, Deployer, DeploymentConfig, FunctionConfig, FunctionConfiguration,
    FunctionName, LayerVersionRef, MemoryPlatform,
};

/// Layer every test function is deployed with.
pub const LAYER: &str = "stratus-runtime";

/// Role every test function is deployed with.
pub const ROLE: &str = "arn:aws:iam::000000000000:role/test-runner";

/// A small but valid handler.
pub const CODE: &str = "exports.handler = async ({ input }) => ({ echoed: input });\n";

/// Deployer wired to an in-memory platform.
pub struct TestDeployment {
    pub platform: Arc<MemoryPlatform>,
    pub deployer: Deployer,
    pub latest_layer: Option<LayerVersionRef>,
}

impl TestDeployment {
    /// Platform with one published runtime layer version.
    pub fn new() -> Self {
        let platform = Arc::new(MemoryPlatform::new());
        let latest_layer = Some(platform.publish_layer_version(LAYER));
        Self::build(platform, latest_layer, fast_deployment_config())
    }

    /// Platform where the runtime layer has never been published.
    pub fn without_layers() -> Self {
        Self::build(
            Arc::new(MemoryPlatform::new()),
            None,
            fast_deployment_config(),
        )
    }

    /// Platform with one layer version and custom deployment settings.
    pub fn with_deployment_config(deployment: DeploymentConfig) -> Self {
        let platform = Arc::new(MemoryPlatform::new());
        let latest_layer = Some(platform.publish_layer_version(LAYER));
        Self::build(platform, latest_layer, deployment)
    }

    fn build(
        platform: Arc<MemoryPlatform>,
        latest_layer: Option<LayerVersionRef>,
        deployment: DeploymentConfig,
    ) -> Self {
        let deployer = Deployer::new(platform.clone(), function_config(), deployment);
        Self {
            platform,
            deployer,
            latest_layer,
        }
    }

    /// The latest published layer ARN.
    pub fn layer_arn(&self) -> String {
        self.latest_layer
            .as_ref()
            .map(|layer| layer.as_str().to_owned())
            .expect("test deployment has a published layer")
    }

    /// Register a function as if an earlier deployment created it.
    pub fn existing(&self, name: &str, runtime: &str, handler: &str, layers: &[&str]) {
        self.platform.insert_function(FunctionConfiguration {
            function_name: name.to_owned(),
            runtime: Some(runtime.to_owned()),
            handler: Some(handler.to_owned()),
            role: Some(ROLE.to_owned()),
            timeout: Some(10),
            layers: layers
                .iter()
                .map(|arn| AttachedLayer {
                    arn: (*arn).to_owned(),
                    code_size: None,
                })
                .collect(),
            version: Some("1".to_owned()),
            ..FunctionConfiguration::default()
        });
    }

    /// Register a function whose configuration already matches.
    pub fn existing_in_sync(&self, name: &str) {
        let layer = self.layer_arn();
        self.existing(name, RUNTIME, HANDLER, &[layer.as_str()]);
    }
}

impl Default for TestDeployment {
    fn default() -> Self {
        Self::new()
    }
}

/// Static function settings used by every test deployment.
pub fn function_config() -> FunctionConfig {
    FunctionConfig {
        role: ROLE.to_owned(),
        layer_name: LAYER.to_owned(),
        ..FunctionConfig::default()
    }
}

/// Deployment settings with millisecond settle polling.
pub fn fast_deployment_config() -> DeploymentConfig {
    DeploymentConfig {
        settle_poll_interval_ms: 5,
        ..DeploymentConfig::default()
    }
}

/// Full configuration pointing at the given endpoint.
pub fn http_config(endpoint: &str) -> DeployConfig {
    let mut config = DeployConfig::default();
    config.platform.endpoint = endpoint.to_owned();
    config.function = function_config();
    config.deployment = fast_deployment_config();
    config
}

/// Parse a function name.
pub fn name(s: &str) -> FunctionName {
    FunctionName::new(s).expect("valid test function name")
}
