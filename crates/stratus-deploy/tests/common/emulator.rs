//! In-process HTTP emulator of the platform's function API.
//!
//! Routes are served by a [`MemoryPlatform`], so state behaves exactly as in
//! the in-memory tests while requests travel over real HTTP.

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use stratus_deploy::platform::{
    CreateFunctionRequest, UpdateCodeRequest, UpdateConfigurationRequest,
};
use stratus_deploy::{
    FunctionName, FunctionPlatform, LayerVersionRef, MemoryPlatform, PlatformError,
};

/// A request as received by the emulator.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Value,
}

#[derive(Clone)]
struct EmulatorState {
    platform: Arc<MemoryPlatform>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// A running emulator.
pub struct Emulator {
    pub platform: Arc<MemoryPlatform>,
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl Emulator {
    /// Start serving on an ephemeral local port.
    pub async fn start(platform: Arc<MemoryPlatform>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = EmulatorState {
            platform: platform.clone(),
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/2015-03-31/functions", post(create_function))
            .route("/2015-03-31/functions/{name}", get(get_function))
            .route(
                "/2015-03-31/functions/{name}/configuration",
                get(get_configuration).put(update_configuration),
            )
            .route("/2015-03-31/functions/{name}/code", put(update_code))
            .route("/2018-10-31/layers/{layer}/versions", get(list_layer_versions))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind emulator");
        let addr = listener.local_addr().expect("emulator address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("emulator server");
        });

        Self {
            platform,
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

fn record(state: &EmulatorState, method: Method, uri: &Uri, body: &[u8]) {
    let body = serde_json::from_slice(body).unwrap_or(Value::Null);
    state
        .requests
        .lock()
        .expect("requests lock")
        .push(RecordedRequest {
            method,
            path: uri.path().to_owned(),
            body,
        });
}

fn error_response(err: PlatformError) -> Response {
    let (status, kind, message) = match err {
        PlatformError::NotFound(message) => (
            StatusCode::NOT_FOUND,
            "ResourceNotFoundException".to_owned(),
            message,
        ),
        PlatformError::Api {
            status,
            kind,
            message,
        } => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            kind,
            message,
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "ServiceException".to_owned(),
            other.to_string(),
        ),
    };

    (
        status,
        [("x-amzn-errortype", format!("{kind}:http://internal.amazon.com/coral/"))],
        Json(json!({ "Type": "User", "Message": message })),
    )
        .into_response()
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "Type": "User", "Message": message.into() })),
    )
        .into_response()
}

fn respond<T: serde::Serialize>(status: StatusCode, result: Result<T, PlatformError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_function(
    State(state): State<EmulatorState>,
    Path(name): Path<String>,
    uri: Uri,
) -> Response {
    record(&state, Method::GET, &uri, &[]);
    let Ok(name) = FunctionName::new(name) else {
        return bad_request("invalid function name");
    };
    respond(StatusCode::OK, state.platform.get_function(&name).await)
}

async fn get_configuration(
    State(state): State<EmulatorState>,
    Path(name): Path<String>,
    uri: Uri,
) -> Response {
    record(&state, Method::GET, &uri, &[]);
    let Ok(name) = FunctionName::new(name) else {
        return bad_request("invalid function name");
    };
    respond(
        StatusCode::OK,
        state.platform.get_function_configuration(&name).await,
    )
}

async fn create_function(State(state): State<EmulatorState>, uri: Uri, body: Bytes) -> Response {
    record(&state, Method::POST, &uri, &body);
    let request: CreateFunctionRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return bad_request(e.to_string()),
    };
    respond(
        StatusCode::CREATED,
        state.platform.create_function(&request).await,
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct ConfigurationBody {
    role: String,
    runtime: String,
    handler: String,
    layers: Vec<String>,
    timeout: u64,
}

async fn update_configuration(
    State(state): State<EmulatorState>,
    Path(name): Path<String>,
    uri: Uri,
    body: Bytes,
) -> Response {
    record(&state, Method::PUT, &uri, &body);
    let Ok(function_name) = FunctionName::new(name) else {
        return bad_request("invalid function name");
    };
    let body: ConfigurationBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => return bad_request(e.to_string()),
    };

    let request = UpdateConfigurationRequest {
        function_name,
        role: body.role,
        runtime: body.runtime,
        handler: body.handler,
        layers: body.layers.into_iter().map(LayerVersionRef::new).collect(),
        timeout: body.timeout,
    };
    respond(
        StatusCode::OK,
        state.platform.update_function_configuration(&request).await,
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct CodeBody {
    zip_file: String,
    publish: bool,
}

async fn update_code(
    State(state): State<EmulatorState>,
    Path(name): Path<String>,
    uri: Uri,
    body: Bytes,
) -> Response {
    record(&state, Method::PUT, &uri, &body);
    let Ok(function_name) = FunctionName::new(name) else {
        return bad_request("invalid function name");
    };
    let body: CodeBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => return bad_request(e.to_string()),
    };
    let Ok(zip_file) = STANDARD.decode(body.zip_file) else {
        return bad_request("ZipFile is not base64");
    };

    let request = UpdateCodeRequest {
        function_name,
        zip_file,
        publish: body.publish,
    };
    respond(
        StatusCode::OK,
        state.platform.update_function_code(&request).await,
    )
}

async fn list_layer_versions(
    State(state): State<EmulatorState>,
    Path(layer): Path<String>,
    uri: Uri,
) -> Response {
    record(&state, Method::GET, &uri, &[]);
    match state.platform.list_layer_versions(&layer).await {
        Ok(versions) => Json(json!({ "LayerVersions": versions })).into_response(),
        Err(err) => error_response(err),
    }
}
