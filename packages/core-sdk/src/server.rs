use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, get_service, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tower_http::services::ServeDir;

use crate::config::{Diagnostics, ServerConfig};
use crate::error::ChatError;
use crate::models::{ChatMessage, ProviderCredentials, Vendor, MODELS};
use crate::selector::{self, ProviderDefaults};

pub const INVALID_BODY: &str = "Invalid request body";
pub const INVALID_MESSAGES: &str = "Invalid messages format";
pub const MODEL_NOT_SPECIFIED: &str = "Model not specified";

/**
 * \brief State shared by all handlers; read-only after startup.
 */
#[derive(Clone)]
pub struct AppState {
    pub defaults: Arc<ProviderDefaults>,
    pub diagnostics: Diagnostics,
}

impl AppState {
    pub fn new(defaults: ProviderDefaults, diagnostics: Diagnostics) -> Self {
        Self {
            defaults: Arc::new(defaults),
            diagnostics,
        }
    }
}

/**
 * \brief Starts the HTTP service: chat API plus the static chat UI.
 */
pub async fn run(config: ServerConfig) -> Result<()> {
    let defaults = config.provider_defaults()?;
    for vendor in Vendor::ALL {
        if !defaults.credentials.contains(vendor) {
            tracing::info!(
                "{} not set; {} requests without a key header get simulated replies",
                vendor.env_var(),
                vendor.name()
            );
        }
    }

    let state = AppState::new(defaults, config.diagnostics);
    let app = app(state, &config.ui_dir);

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    tracing::info!("server listening on http://{}", config.addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server shut down");
    Ok(())
}

/**
 * \brief API routes with the static UI directory as fallback.
 */
pub fn app(state: AppState, ui_dir: &Path) -> Router {
    let static_service =
        get_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
    router(state).fallback_service(static_service)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/models", get(list_models))
        .route("/api/health", get(health_check))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ChatReply {
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

/**
 * \brief Validated inbound chat request.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /** \brief Non-empty conversation in chronological order */
    pub messages: Vec<ChatMessage>,
    /** \brief Logical model identifier, exactly as sent */
    pub model: String,
}

/**
 * \brief Failure outcome of one chat request.
 */
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0}")]
    Validation(&'static str),

    #[error(transparent)]
    Chat(#[from] ChatError),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::Validation(_) => StatusCode::BAD_REQUEST,
            RequestError::Chat(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/**
 * \brief Parses and validates a raw chat request body.
 */
pub fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, RequestError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| RequestError::Validation(INVALID_BODY))?;

    let messages = match value.get("messages") {
        Some(Value::Array(items)) if !items.is_empty() => items.clone(),
        _ => return Err(RequestError::Validation(INVALID_MESSAGES)),
    };
    let messages: Vec<ChatMessage> = serde_json::from_value(Value::Array(messages))
        .map_err(|_| RequestError::Validation(INVALID_MESSAGES))?;

    // Opaque id: whitespace is kept and unrecognised ids route to the stub.
    let model = value
        .get("model")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .ok_or(RequestError::Validation(MODEL_NOT_SPECIFIED))?;

    Ok(ChatRequest {
        messages,
        model: model.to_string(),
    })
}

/**
 * \brief Collects per-vendor credential overrides from the request headers.
 */
pub fn overrides_from_headers(headers: &HeaderMap) -> ProviderCredentials {
    let mut overrides = ProviderCredentials::new();
    for vendor in Vendor::ALL {
        if let Some(value) = headers.get(vendor.header()).and_then(|v| v.to_str().ok()) {
            overrides.set(vendor, value.trim());
        }
    }
    overrides
}

/**
 * \brief validate -> select -> generate, with every adapter failure caught here.
 */
pub async fn handle_chat(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<String, RequestError> {
    let request = parse_chat_request(body).inspect_err(|err| {
        tracing::info!("rejected chat request: {}", err);
    })?;

    let overrides = overrides_from_headers(headers);
    let provider = selector::select(&request.model, Some(&overrides), &state.defaults);

    match provider.generate(&request.messages).await {
        Ok(content) => {
            tracing::info!(
                model = %request.model,
                provider = provider.id(),
                messages = request.messages.len(),
                reply_len = content.len(),
                "chat request completed"
            );
            Ok(content)
        }
        Err(err) => {
            report_failure(state.diagnostics, &request.model, &err);
            Err(err.into())
        }
    }
}

fn report_failure(diagnostics: Diagnostics, model: &str, err: &ChatError) {
    match diagnostics {
        Diagnostics::Terse => {
            tracing::error!(model, vendor = err.vendor().key(), "chat request failed: {}", err);
        }
        Diagnostics::Verbose => {
            let mut chain = Vec::new();
            let mut source = std::error::Error::source(err);
            while let Some(cause) = source {
                chain.push(cause.to_string());
                source = cause.source();
            }
            tracing::error!(
                model,
                vendor = err.vendor().key(),
                detail = ?err.diagnostic(),
                chain = ?chain,
                debug = ?err,
                "chat request failed: {}",
                err
            );
        }
    }
}

/**
 * \brief Chat endpoint: POST /api/chat
 */
async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatReply>, RequestError> {
    let content = handle_chat(&state, &headers, &body).await?;
    Ok(Json(ChatReply { content }))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ModelItem {
    pub id: String,
    pub name: String,
    /** \brief Whether the server holds a default credential for the model's vendor */
    pub configured: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ModelListResponse {
    pub models: Vec<ModelItem>,
}

/**
 * \brief Lists the model catalog shown in the sidebar.
 */
async fn list_models(State(state): State<AppState>) -> Json<ModelListResponse> {
    let models = MODELS
        .iter()
        .map(|m| ModelItem {
            id: m.id.to_string(),
            name: m.name.to_string(),
            configured: m
                .vendor
                .map(|v| state.defaults.credentials.contains(v))
                .unwrap_or(false),
        })
        .collect();
    Json(ModelListResponse { models })
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}
