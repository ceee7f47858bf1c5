//! Axum Handlers for the REST API
//!
//! This module contains the logic for handling the feed endpoints.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use sciscroll_core::{FeedError, GenerateRequest, validator};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    models::{
        ErrorResponse, GeneratePayload, GenerateResponse, HealthResponse, InitialPayload,
        InitialResponse, MAX_TOPIC_CHARS,
    },
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    ServiceUnavailable(String),
    BadGateway(String),
    InternalServerError(anyhow::Error),
}

impl ApiError {
    /// Malformed, mistyped or missing JSON bodies are client errors.
    fn from_rejection(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }

    fn from_feed(err: FeedError) -> Self {
        match err {
            FeedError::OrchestratorUnavailable => ApiError::ServiceUnavailable(
                "Content orchestrator is not configured. Set the orchestrator API key.".to_string(),
            ),
            FeedError::OrchestrationFailed(_) => {
                ApiError::BadGateway(format!("Content generation failed: {err}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::ServiceUnavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorResponse { message })).into_response()
            }
            ApiError::BadGateway(message) => {
                (StatusCode::BAD_GATEWAY, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Serialises a response and logs structural problems without altering it.
fn log_validation<T: Serialize>(
    endpoint: &str,
    response: &T,
    validate: fn(&Value) -> Vec<String>,
) -> Result<(), ApiError> {
    let value = serde_json::to_value(response)?;
    let errors = validate(&value);
    if !errors.is_empty() {
        error!(endpoint, ?errors, "Response failed validation");
    }
    Ok(())
}

/// Report which collaborators are configured.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        available_apis: state.feed.availability(),
    })
}

/// Start an exploration session on a topic.
#[utoipa::path(
    post,
    path = "/api/initial",
    request_body = InitialPayload,
    responses(
        (status = 200, description = "First batch of content with the seeded graph", body = InitialResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 502, description = "Content generation failed", body = ErrorResponse),
        (status = 503, description = "Orchestrator not configured", body = ErrorResponse)
    )
)]
pub async fn initial(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InitialPayload>, JsonRejection>,
) -> Result<Json<InitialResponse>, ApiError> {
    let Json(payload) = payload.map_err(ApiError::from_rejection)?;
    let topic = payload.topic.trim();
    if topic.is_empty() {
        return Err(ApiError::BadRequest("topic is required".to_string()));
    }
    if topic.chars().count() > MAX_TOPIC_CHARS {
        return Err(ApiError::BadRequest(format!(
            "topic must be at most {MAX_TOPIC_CHARS} characters"
        )));
    }

    info!(%topic, "Starting exploration session");
    let response = InitialResponse::from(
        state
            .feed
            .initial(topic)
            .await
            .map_err(ApiError::from_feed)?,
    );
    log_validation("initial", &response, validator::validate_initial_response)?;
    Ok(Json(response))
}

/// Generate the next batch of content for the node being read.
#[utoipa::path(
    post,
    path = "/api/generate",
    request_body = GeneratePayload,
    responses(
        (status = 200, description = "Next batch of content", body = GenerateResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 502, description = "Content generation failed", body = ErrorResponse),
        (status = 503, description = "Orchestrator not configured", body = ErrorResponse)
    )
)]
pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GeneratePayload>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(payload) = payload.map_err(ApiError::from_rejection)?;
    let current_node = payload.current_node.trim();
    if current_node.is_empty() {
        return Err(ApiError::BadRequest("current_node is required".to_string()));
    }
    if payload.time_data.as_ref().is_some_and(|t| !t.is_object()) {
        return Err(ApiError::BadRequest("time_data must be an object".to_string()));
    }

    let request = GenerateRequest {
        current_node: current_node.to_string(),
        telemetry: payload.time_data.clone(),
        visited_node_ids: payload.visited_nodes.clone(),
        last_read_passage: payload.last_paragraph_text(),
    };
    let response = GenerateResponse::from(
        state
            .feed
            .generate(&request)
            .await
            .map_err(ApiError::from_feed)?,
    );
    log_validation("generate", &response, validator::validate_generate_response)?;
    Ok(Json(response))
}
