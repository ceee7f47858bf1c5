//! Axum Router Configuration
//!
//! This module defines the HTTP routing for the feed API and its OpenAPI
//! documentation.

use crate::{
    handlers,
    models::{
        ErrorResponse, GeneratePayload, GenerateResponse, HealthResponse, InitialPayload,
        InitialResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::initial,
        handlers::generate,
    ),
    components(
        schemas(InitialPayload, InitialResponse, GeneratePayload, GenerateResponse, HealthResponse, ErrorResponse)
    ),
    tags(
        (name = "SciScroll API", description = "Adaptive infinite-scroll exploration of science topics")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/initial", post(handlers::initial))
        .route("/api/generate", post(handlers::generate))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_feed_endpoints() {
        let doc = ApiDoc::openapi();
        for path in ["/api/health", "/api/initial", "/api/generate"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
