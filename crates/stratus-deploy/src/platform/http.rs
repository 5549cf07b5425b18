//! REST client for the remote platform.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::PlatformConfig;
use crate::error::{DeployError, DeployResult};
use crate::types::FunctionName;

use super::{
    CreateFunctionRequest, FunctionConfiguration, FunctionPlatform, GetFunctionResponse,
    LayerVersion, ListLayerVersionsResponse, PlatformError, PlatformResult, UpdateCodeRequest,
    UpdateConfigurationRequest,
};

const FUNCTIONS_PATH: &str = "2015-03-31/functions";
const LAYERS_PATH: &str = "2018-10-31/layers";
const ERROR_TYPE_HEADER: &str = "x-amzn-ErrorType";

/// Error body returned by the platform.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "Type", alias = "__type")]
    kind: Option<String>,
    #[serde(rename = "Message", alias = "message")]
    message: Option<String>,
}

/// HTTP client for the platform's function API.
#[derive(Debug, Clone)]
pub struct HttpPlatform {
    client: Client,
    base_url: String,
}

impl HttpPlatform {
    /// Create a new platform client from configuration.
    pub fn new(config: &PlatformConfig) -> DeployResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DeployError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.endpoint.trim_end_matches('/').to_owned(),
        })
    }

    /// Create a new platform client with a custom base URL.
    pub fn with_url(url: impl Into<String>) -> DeployResult<Self> {
        let config = PlatformConfig {
            endpoint: url.into(),
            ..PlatformConfig::default()
        };
        Self::new(&config)
    }

    fn function_url(&self, name: &FunctionName) -> String {
        format!("{}/{FUNCTIONS_PATH}/{name}", self.base_url)
    }
}

#[async_trait]
impl FunctionPlatform for HttpPlatform {
    async fn get_function(&self, name: &FunctionName) -> PlatformResult<GetFunctionResponse> {
        let url = self.function_url(name);
        debug!(url = %url, "querying function");

        let response = self.client.get(&url).send().await?;
        decode(response, name.as_str()).await
    }

    async fn get_function_configuration(
        &self,
        name: &FunctionName,
    ) -> PlatformResult<FunctionConfiguration> {
        let url = format!("{}/configuration", self.function_url(name));
        debug!(url = %url, "querying function configuration");

        let response = self.client.get(&url).send().await?;
        decode(response, name.as_str()).await
    }

    async fn create_function(
        &self,
        request: &CreateFunctionRequest,
    ) -> PlatformResult<FunctionConfiguration> {
        let url = format!("{}/{FUNCTIONS_PATH}", self.base_url);
        debug!(
            url = %url,
            function = %request.function_name,
            archive_bytes = request.code.zip_file.len(),
            "creating function"
        );

        let response = self.client.post(&url).json(request).send().await?;
        decode(response, request.function_name.as_str()).await
    }

    async fn update_function_configuration(
        &self,
        request: &UpdateConfigurationRequest,
    ) -> PlatformResult<FunctionConfiguration> {
        let url = format!("{}/configuration", self.function_url(&request.function_name));
        debug!(url = %url, "updating function configuration");

        let response = self.client.put(&url).json(request).send().await?;
        decode(response, request.function_name.as_str()).await
    }

    async fn update_function_code(
        &self,
        request: &UpdateCodeRequest,
    ) -> PlatformResult<FunctionConfiguration> {
        let url = format!("{}/code", self.function_url(&request.function_name));
        debug!(
            url = %url,
            archive_bytes = request.zip_file.len(),
            "updating function code"
        );

        let response = self.client.put(&url).json(request).send().await?;
        decode(response, request.function_name.as_str()).await
    }

    async fn list_layer_versions(&self, layer_name: &str) -> PlatformResult<Vec<LayerVersion>> {
        let url = format!("{}/{LAYERS_PATH}/{layer_name}/versions", self.base_url);
        debug!(url = %url, "listing layer versions");

        let response = self.client.get(&url).send().await?;
        let listing: ListLayerVersionsResponse = decode(response, layer_name).await?;
        Ok(listing.layer_versions)
    }
}

async fn decode<T: DeserializeOwned>(response: Response, subject: &str) -> PlatformResult<T> {
    if response.status().is_success() {
        let body = response.bytes().await?;
        return serde_json::from_slice(&body).map_err(|e| PlatformError::Decode(e.to_string()));
    }

    Err(error_from_response(response, subject).await)
}

async fn error_from_response(response: Response, subject: &str) -> PlatformError {
    let status = response.status();
    let header_kind = response
        .headers()
        .get(ERROR_TYPE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(':').next())
        .map(str::to_owned);

    let body = response.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<ErrorBody>(&body).ok();
    let (body_kind, body_message) = parsed.map_or((None, None), |b| (b.kind, b.message));

    let message = body_message
        .or_else(|| (!body.is_empty()).then(|| body.clone()))
        .unwrap_or_else(|| status.to_string());

    if status == StatusCode::NOT_FOUND {
        return PlatformError::NotFound(format!("{subject}: {message}"));
    }

    let kind = header_kind
        .or(body_kind)
        .unwrap_or_else(|| "UnknownError".to_owned());

    PlatformError::api(status.as_u16(), kind, message)
}
