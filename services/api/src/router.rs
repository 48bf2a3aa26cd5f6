//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and the OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ChatPayload, ChatResponse, ErrorResponse, GenerateTrackPayload, GeneratedTrackResponse,
        LearningPathResponse, ModuleCompletionResponse, ModulePayload, ModuleStartResponse,
        QuickSimulationPayload, QuickSimulationResponse, SimulationResponse, StartTrackResponse,
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
        handlers::generate_track,
        handlers::start_track,
        handlers::get_path,
        handlers::start_module,
        handlers::complete_module,
        handlers::quick_simulation,
        handlers::get_simulation,
        handlers::chat,
    ),
    components(
        schemas(
            GenerateTrackPayload, GeneratedTrackResponse, StartTrackResponse, LearningPathResponse,
            ModulePayload, ModuleStartResponse, ModuleCompletionResponse, QuickSimulationPayload,
            QuickSimulationResponse, SimulationResponse, ChatPayload, ChatResponse, ErrorResponse
        )
    ),
    tags(
        (name = "GoDash API", description = "Sales training: learning paths and client simulations")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/tracks/generate", post(handlers::generate_track))
        .route("/tracks/{id}/start", post(handlers::start_track))
        .route("/paths/{id}", get(handlers::get_path))
        .route("/modules/start", post(handlers::start_module))
        .route("/modules/complete", post(handlers::complete_module))
        .route("/simulations/quick", post(handlers::quick_simulation))
        .route("/simulations/chat", post(handlers::chat))
        .route("/simulations/{id}", get(handlers::get_simulation))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
