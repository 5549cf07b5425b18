//! Desired function configuration and drift detection.
//!
//! Every deployed function runs the same runtime and entry point and carries
//! the latest version of the shared runtime layer. The values below are the
//! only place those settings are spelled out.

use std::fmt;

use crate::config::FunctionConfig;
use crate::platform::{
    CreateFunctionRequest, FunctionCode, FunctionConfiguration, UpdateConfigurationRequest,
};
use crate::types::{FunctionName, LayerVersionRef};

/// Runtime identifier of every deployed function.
pub const RUNTIME: &str = "nodejs18.x";

/// Entry point of every deployed function.
///
/// Resolves to the `handler` export of the wrapper stored as `index.js`.
pub const HANDLER: &str = "index.handler";

/// Package type for inline archive uploads.
pub const PACKAGE_TYPE: &str = "Zip";

/// Execution timeout of every deployed function, in seconds.
pub const TIMEOUT_SECS: u64 = 10;

/// New code and configuration are published as the invocable version.
pub const PUBLISH: bool = true;

/// The configuration a function should have after deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredConfiguration {
    /// Execution role reference.
    pub role: String,
    /// Runtime identifier.
    pub runtime: &'static str,
    /// Entry-point identifier.
    pub handler: &'static str,
    /// Runtime layer to attach.
    pub layer: LayerVersionRef,
    /// Execution timeout in seconds.
    pub timeout_secs: u64,
}

impl DesiredConfiguration {
    /// Desired configuration for the given role and resolved layer.
    #[must_use]
    pub fn new(role: impl Into<String>, layer: LayerVersionRef) -> Self {
        Self {
            role: role.into(),
            runtime: RUNTIME,
            handler: HANDLER,
            layer,
            timeout_secs: TIMEOUT_SECS,
        }
    }

    /// Desired configuration using the role from static configuration.
    #[must_use]
    pub fn from_config(config: &FunctionConfig, layer: LayerVersionRef) -> Self {
        Self::new(config.role.clone(), layer)
    }

    /// Compare against a function's current configuration.
    ///
    /// Only runtime, handler and attached layers are compared. The attached
    /// layers match when they are exactly the desired layer.
    #[must_use]
    pub fn diff(&self, current: &FunctionConfiguration) -> ConfigDiff {
        let layers_match = matches!(
            current.layers.as_slice(),
            [only] if only.arn == self.layer.as_str()
        );

        ConfigDiff {
            runtime: current.runtime.as_deref() != Some(self.runtime),
            handler: current.handler.as_deref() != Some(self.handler),
            layers: !layers_match,
        }
    }

    /// Build the creation request for a new function.
    #[must_use]
    pub fn create_request(&self, name: &FunctionName, zip_file: Vec<u8>) -> CreateFunctionRequest {
        CreateFunctionRequest {
            function_name: name.clone(),
            role: self.role.clone(),
            runtime: self.runtime.to_owned(),
            handler: self.handler.to_owned(),
            package_type: PACKAGE_TYPE.to_owned(),
            layers: vec![self.layer.clone()],
            code: FunctionCode { zip_file },
            publish: PUBLISH,
            timeout: self.timeout_secs,
        }
    }

    /// Build the configuration update request carrying the full desired state.
    #[must_use]
    pub fn update_request(&self, name: &FunctionName) -> UpdateConfigurationRequest {
        UpdateConfigurationRequest {
            function_name: name.clone(),
            role: self.role.clone(),
            runtime: self.runtime.to_owned(),
            handler: self.handler.to_owned(),
            layers: vec![self.layer.clone()],
            timeout: self.timeout_secs,
        }
    }
}

/// Which compared fields differ between current and desired configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigDiff {
    /// Runtime identifier differs.
    pub runtime: bool,
    /// Entry-point identifier differs.
    pub handler: bool,
    /// Attached layers differ.
    pub layers: bool,
}

impl ConfigDiff {
    /// True when nothing needs updating.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.runtime || self.handler || self.layers)
    }

    /// Number of differing fields.
    #[must_use]
    pub fn count(&self) -> usize {
        [self.runtime, self.handler, self.layers]
            .into_iter()
            .filter(|differs| *differs)
            .count()
    }
}

impl fmt::Display for ConfigDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = [
            (self.runtime, "runtime"),
            (self.handler, "handler"),
            (self.layers, "layers"),
        ]
        .into_iter()
        .filter_map(|(differs, name)| differs.then_some(name))
        .collect();

        if fields.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", fields.join(","))
        }
    }
}
