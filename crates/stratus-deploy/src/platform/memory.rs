//! In-process platform that records every call.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::package::code_sha256;
use crate::types::{FunctionName, LayerVersionRef};

use super::{
    AttachedLayer, CreateFunctionRequest, FunctionConfiguration, FunctionPlatform,
    GetFunctionResponse, LastUpdateStatus, LayerVersion, Operation, PlatformError,
    PlatformResult, UpdateCodeRequest, UpdateConfigurationRequest,
};

const ACCOUNT_ARN: &str = "arn:aws:lambda:local:000000000000";

/// A call received by [`MemoryPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    /// Existence query.
    GetFunction(FunctionName),
    /// Configuration query.
    GetFunctionConfiguration(FunctionName),
    /// Function creation.
    CreateFunction(CreateFunctionRequest),
    /// Configuration update.
    UpdateFunctionConfiguration(UpdateConfigurationRequest),
    /// Code replacement.
    UpdateFunctionCode(UpdateCodeRequest),
    /// Layer version listing.
    ListLayerVersions(String),
}

impl PlatformCall {
    /// The operation this call performed.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::GetFunction(_) => Operation::GetFunction,
            Self::GetFunctionConfiguration(_) => Operation::GetFunctionConfiguration,
            Self::CreateFunction(_) => Operation::CreateFunction,
            Self::UpdateFunctionConfiguration(_) => Operation::UpdateFunctionConfiguration,
            Self::UpdateFunctionCode(_) => Operation::UpdateFunctionCode,
            Self::ListLayerVersions(_) => Operation::ListLayerVersions,
        }
    }
}

#[derive(Debug)]
struct StoredFunction {
    configuration: FunctionConfiguration,
    published: u64,
    pending_polls: u32,
}

#[derive(Debug, Default)]
struct State {
    functions: HashMap<String, StoredFunction>,
    layers: HashMap<String, Vec<LayerVersion>>,
    calls: Vec<PlatformCall>,
    failures: Vec<(Operation, PlatformError)>,
    settle_polls: u32,
}

impl State {
    fn record(&mut self, call: PlatformCall) -> PlatformResult<()> {
        let operation = call.operation();
        self.calls.push(call);

        match self.failures.iter().position(|(op, _)| *op == operation) {
            Some(index) => Err(self.failures.remove(index).1),
            None => Ok(()),
        }
    }

    fn function_mut(&mut self, name: &FunctionName) -> PlatformResult<&mut StoredFunction> {
        self.functions
            .get_mut(name.as_str())
            .ok_or_else(|| PlatformError::NotFound(format!("Function not found: {name}")))
    }
}

/// Platform kept entirely in memory.
///
/// Behaves like the remote platform for the calls a deployment makes:
/// creation conflicts on existing names, updates are rejected while a
/// configuration change is still in progress, and publishing bumps the
/// function version. Every call is recorded in order.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    state: Mutex<State>,
}

impl MemoryPlatform {
    /// Create an empty platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PlatformResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| PlatformError::api(500, "ServiceException", "lock poisoned"))
    }

    fn lock_or_recover(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Publish a new version of a layer and return its reference.
    pub fn publish_layer_version(&self, layer_name: &str) -> LayerVersionRef {
        let mut state = self.lock_or_recover();
        let versions = state.layers.entry(layer_name.to_owned()).or_default();

        let version = versions.first().map_or(1, |latest| latest.version + 1);
        let arn = format!("{ACCOUNT_ARN}:layer:{layer_name}:{version}");
        versions.insert(
            0,
            LayerVersion {
                layer_version_arn: arn.clone(),
                version,
                created_date: None,
            },
        );

        LayerVersionRef::new(arn)
    }

    /// Register an existing function as if it had been deployed earlier.
    pub fn insert_function(&self, configuration: FunctionConfiguration) {
        let mut state = self.lock_or_recover();
        state.functions.insert(
            configuration.function_name.clone(),
            StoredFunction {
                configuration,
                published: 1,
                pending_polls: 0,
            },
        );
    }

    /// Fail the next call of `operation` with `error`.
    pub fn fail_next(&self, operation: Operation, error: PlatformError) {
        self.lock_or_recover().failures.push((operation, error));
    }

    /// Keep configuration updates in progress for this many configuration polls.
    pub fn settle_after(&self, polls: u32) {
        self.lock_or_recover().settle_polls = polls;
    }

    /// Current configuration of a function.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<FunctionConfiguration> {
        self.lock_or_recover()
            .functions
            .get(name)
            .map(|f| f.configuration.clone())
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.lock_or_recover().calls.clone()
    }

    /// Operations of every call received so far, in order.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.lock_or_recover()
            .calls
            .iter()
            .map(PlatformCall::operation)
            .collect()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock_or_recover().calls.clear();
    }
}

fn attached(layers: &[LayerVersionRef]) -> Vec<AttachedLayer> {
    layers
        .iter()
        .map(|layer| AttachedLayer {
            arn: layer.as_str().to_owned(),
            code_size: None,
        })
        .collect()
}

fn reject_in_progress(function: &StoredFunction, name: &FunctionName) -> PlatformResult<()> {
    if function.configuration.last_update_status == Some(LastUpdateStatus::InProgress) {
        return Err(PlatformError::api(
            409,
            "ResourceConflictException",
            format!(
                "The operation cannot be performed at this time. An update is in progress for resource: {ACCOUNT_ARN}:function:{name}"
            ),
        ));
    }
    Ok(())
}

#[async_trait]
impl FunctionPlatform for MemoryPlatform {
    async fn get_function(&self, name: &FunctionName) -> PlatformResult<GetFunctionResponse> {
        let mut state = self.lock()?;
        state.record(PlatformCall::GetFunction(name.clone()))?;

        let function = state.function_mut(name)?;
        Ok(GetFunctionResponse {
            configuration: function.configuration.clone(),
        })
    }

    async fn get_function_configuration(
        &self,
        name: &FunctionName,
    ) -> PlatformResult<FunctionConfiguration> {
        let mut state = self.lock()?;
        state.record(PlatformCall::GetFunctionConfiguration(name.clone()))?;

        let function = state.function_mut(name)?;
        if function.pending_polls > 0 {
            function.pending_polls -= 1;
            if function.pending_polls == 0 {
                function.configuration.last_update_status = Some(LastUpdateStatus::Successful);
            }
        }

        Ok(function.configuration.clone())
    }

    async fn create_function(
        &self,
        request: &CreateFunctionRequest,
    ) -> PlatformResult<FunctionConfiguration> {
        let mut state = self.lock()?;
        state.record(PlatformCall::CreateFunction(request.clone()))?;

        let name = &request.function_name;
        if state.functions.contains_key(name.as_str()) {
            return Err(PlatformError::api(
                409,
                "ResourceConflictException",
                format!("Function already exist: {name}"),
            ));
        }

        let published = u64::from(request.publish);
        let configuration = FunctionConfiguration {
            function_name: name.to_string(),
            function_arn: Some(format!("{ACCOUNT_ARN}:function:{name}")),
            runtime: Some(request.runtime.clone()),
            role: Some(request.role.clone()),
            handler: Some(request.handler.clone()),
            timeout: Some(request.timeout),
            code_sha256: Some(code_sha256(&request.code.zip_file)),
            version: Some(if request.publish {
                published.to_string()
            } else {
                "$LATEST".to_owned()
            }),
            layers: attached(&request.layers),
            state: Some("Active".to_owned()),
            last_update_status: Some(LastUpdateStatus::Successful),
        };

        state.functions.insert(
            name.to_string(),
            StoredFunction {
                configuration: configuration.clone(),
                published,
                pending_polls: 0,
            },
        );

        Ok(configuration)
    }

    async fn update_function_configuration(
        &self,
        request: &UpdateConfigurationRequest,
    ) -> PlatformResult<FunctionConfiguration> {
        let mut state = self.lock()?;
        state.record(PlatformCall::UpdateFunctionConfiguration(request.clone()))?;

        let settle_polls = state.settle_polls;
        let name = &request.function_name;
        let function = state.function_mut(name)?;
        reject_in_progress(function, name)?;

        let configuration = &mut function.configuration;
        configuration.role = Some(request.role.clone());
        configuration.runtime = Some(request.runtime.clone());
        configuration.handler = Some(request.handler.clone());
        configuration.timeout = Some(request.timeout);
        configuration.layers = attached(&request.layers);
        configuration.version = Some("$LATEST".to_owned());

        function.pending_polls = settle_polls;
        function.configuration.last_update_status = Some(if settle_polls > 0 {
            LastUpdateStatus::InProgress
        } else {
            LastUpdateStatus::Successful
        });

        Ok(function.configuration.clone())
    }

    async fn update_function_code(
        &self,
        request: &UpdateCodeRequest,
    ) -> PlatformResult<FunctionConfiguration> {
        let mut state = self.lock()?;
        state.record(PlatformCall::UpdateFunctionCode(request.clone()))?;

        let name = &request.function_name;
        let function = state.function_mut(name)?;
        reject_in_progress(function, name)?;

        function.configuration.code_sha256 = Some(code_sha256(&request.zip_file));
        function.configuration.version = if request.publish {
            function.published += 1;
            Some(function.published.to_string())
        } else {
            Some("$LATEST".to_owned())
        };

        Ok(function.configuration.clone())
    }

    async fn list_layer_versions(&self, layer_name: &str) -> PlatformResult<Vec<LayerVersion>> {
        let mut state = self.lock()?;
        state.record(PlatformCall::ListLayerVersions(layer_name.to_owned()))?;

        Ok(state.layers.get(layer_name).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::function::DesiredConfiguration;

    fn name(s: &str) -> FunctionName {
        FunctionName::new(s).unwrap()
    }

    #[test]
    fn layer_versions_are_listed_most_recent_first() {
        let platform = MemoryPlatform::new();
        let first = platform.publish_layer_version("runtime");
        let second = platform.publish_layer_version("runtime");

        assert!(first.as_str().ends_with(":layer:runtime:1"));
        assert!(second.as_str().ends_with(":layer:runtime:2"));

        let state = platform.lock_or_recover();
        let versions = &state.layers["runtime"];
        assert_eq!(versions[0].version, 2);
        assert_eq!(versions[1].version, 1);
    }

    #[tokio::test]
    async fn mock_platform_lifecycle() {
        let platform = MemoryPlatform::new();
        let layer = platform.publish_layer_version("runtime");
        let desired = DesiredConfiguration::new("role", layer);
        let fn_a = name("fn-A");

        assert!(platform.get_function(&fn_a).await.unwrap_err().is_not_found());

        let created = platform
            .create_function(&desired.create_request(&fn_a, b"one".to_vec()))
            .await
            .unwrap();
        assert_eq!(created.version.as_deref(), Some("1"));
        assert!(platform.get_function(&fn_a).await.is_ok());

        let updated = platform
            .update_function_code(&UpdateCodeRequest {
                function_name: fn_a.clone(),
                zip_file: b"two".to_vec(),
                publish: true,
            })
            .await
            .unwrap();
        assert_eq!(updated.version.as_deref(), Some("2"));
        assert_eq!(updated.code_sha256, Some(code_sha256(b"two")));

        assert_eq!(
            platform.operations(),
            vec![
                Operation::GetFunction,
                Operation::CreateFunction,
                Operation::GetFunction,
                Operation::UpdateFunctionCode,
            ]
        );
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let platform = MemoryPlatform::new();
        let desired = DesiredConfiguration::new("role", LayerVersionRef::new("arn:layer:1"));
        let request = desired.create_request(&name("fn-A"), Vec::new());

        platform.create_function(&request).await.unwrap();
        let err = platform.create_function(&request).await.unwrap_err();
        assert!(matches!(err, PlatformError::Api { status: 409, .. }));
    }

    #[tokio::test]
    async fn code_update_is_rejected_while_configuration_settles() {
        let platform = MemoryPlatform::new();
        let desired = DesiredConfiguration::new("role", LayerVersionRef::new("arn:layer:1"));
        let fn_a = name("fn-A");
        platform
            .create_function(&desired.create_request(&fn_a, Vec::new()))
            .await
            .unwrap();

        platform.settle_after(1);
        let pending = platform
            .update_function_configuration(&desired.update_request(&fn_a))
            .await
            .unwrap();
        assert_eq!(pending.last_update_status, Some(LastUpdateStatus::InProgress));

        let code = UpdateCodeRequest {
            function_name: fn_a.clone(),
            zip_file: Vec::new(),
            publish: true,
        };
        assert!(platform.update_function_code(&code).await.is_err());

        let settled = platform.get_function_configuration(&fn_a).await.unwrap();
        assert_eq!(settled.last_update_status, Some(LastUpdateStatus::Successful));
        assert!(platform.update_function_code(&code).await.is_ok());
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let platform = MemoryPlatform::new();
        platform.fail_next(
            Operation::ListLayerVersions,
            PlatformError::api(500, "ServiceException", "boom"),
        );

        assert!(platform.list_layer_versions("runtime").await.is_err());
        assert!(platform.list_layer_versions("runtime").await.unwrap().is_empty());
    }
}
