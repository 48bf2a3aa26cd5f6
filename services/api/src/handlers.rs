//! Axum Handlers for the REST API
//!
//! Each handler authenticates the caller from the `x-user-id` header, hands
//! the request to the orchestrator and maps the result (or the `CoreError`)
//! to an HTTP response. Endpoints are documented with `utoipa`.

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use godash_core::CoreError;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    models::{
        ChatPayload, ChatResponse, ErrorResponse, GenerateTrackPayload, GeneratedTrackResponse,
        LearningPathResponse, ModuleCompletionResponse, ModulePayload, ModuleStartResponse,
        QuickSimulationPayload, QuickSimulationResponse, SimulationResponse, StartTrackResponse,
    },
    state::AppState,
};

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    InternalServerError(CoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Authentication => Self::Unauthorized(err.to_string()),
            CoreError::NotFound(_) => Self::NotFound(err.to_string()),
            CoreError::InvalidRequest(_) => Self::BadRequest(err.to_string()),
            CoreError::SimulationCompleted(_) | CoreError::ModuleLocked { .. } => {
                Self::Conflict(err.to_string())
            }
            CoreError::GenerationValidation(_)
            | CoreError::GenerationTimeout(_)
            | CoreError::Generation(_)
            | CoreError::Persistence(_) => Self::InternalServerError(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "Rejected request body");
        Self::BadRequest(rejection.body_text())
    }
}

/// Extracts the authenticated learner from the request headers.
pub fn caller_id(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| ApiError::from(CoreError::Authentication))
}

/// Generate a personalized AI learning path.
#[utoipa::path(
    post,
    path = "/tracks/generate",
    request_body = GenerateTrackPayload,
    responses(
        (status = 201, description = "Learning path generated", body = GeneratedTrackResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the learner")
    )
)]
pub async fn generate_track(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<GenerateTrackPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller_id(&headers)?;
    let Json(payload) = payload?;
    if payload.industry.trim().is_empty() {
        return Err(ApiError::BadRequest("industry must not be empty".to_string()));
    }

    let generated = state
        .orchestrator
        .generate_track(
            user_id,
            payload.experience_level,
            payload.training_goal,
            payload.industry,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GeneratedTrackResponse {
            path_id: generated.path_id,
            syllabus: generated.syllabus,
        }),
    ))
}

/// Start a standard track by cloning it into a new learning path.
#[utoipa::path(
    post,
    path = "/tracks/{id}/start",
    responses(
        (status = 201, description = "Learning path created", body = StartTrackResponse),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorResponse),
        (status = 404, description = "Track not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Standard track ID"),
        ("x-user-id" = String, Header, description = "The ID of the learner")
    )
)]
pub async fn start_track(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller_id(&headers)?;
    let path = state.orchestrator.start_standard_track(user_id, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(StartTrackResponse { path_id: path.id }),
    ))
}

/// Get a learning path by its ID.
#[utoipa::path(
    get,
    path = "/paths/{id}",
    responses(
        (status = 200, description = "Learning path details", body = LearningPathResponse),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorResponse),
        (status = 404, description = "Learning path not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Learning path ID"),
        ("x-user-id" = String, Header, description = "The ID of the learner")
    )
)]
pub async fn get_path(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<LearningPathResponse>, ApiError> {
    let user_id = caller_id(&headers)?;
    let path = state.orchestrator.get_learning_path(user_id, id).await?;
    Ok(Json(path.into()))
}

/// Open a module: create its simulation or return its theory content.
#[utoipa::path(
    post,
    path = "/modules/start",
    request_body = ModulePayload,
    responses(
        (status = 200, description = "Module started", body = ModuleStartResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorResponse),
        (status = 404, description = "Path or module not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the learner")
    )
)]
pub async fn start_module(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ModulePayload>, JsonRejection>,
) -> Result<Json<ModuleStartResponse>, ApiError> {
    let user_id = caller_id(&headers)?;
    let Json(payload) = payload?;
    let started = state
        .orchestrator
        .start_module(user_id, payload.path_id, payload.module_index)
        .await?;
    Ok(Json(started.into()))
}

/// Complete the current module of a learning path.
#[utoipa::path(
    post,
    path = "/modules/complete",
    request_body = ModulePayload,
    responses(
        (status = 200, description = "Module completed", body = ModuleCompletionResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorResponse),
        (status = 404, description = "Path or module not found", body = ErrorResponse),
        (status = 409, description = "Module is locked", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the learner")
    )
)]
pub async fn complete_module(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ModulePayload>, JsonRejection>,
) -> Result<Json<ModuleCompletionResponse>, ApiError> {
    let user_id = caller_id(&headers)?;
    let Json(payload) = payload?;
    let done = state
        .orchestrator
        .complete_module(user_id, payload.path_id, payload.module_index)
        .await?;
    Ok(Json(done.into()))
}

/// Start a free-practice simulation with a stock client persona.
#[utoipa::path(
    post,
    path = "/simulations/quick",
    request_body = QuickSimulationPayload,
    responses(
        (status = 201, description = "Simulation created", body = QuickSimulationResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the learner")
    )
)]
pub async fn quick_simulation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<QuickSimulationPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller_id(&headers)?;
    let Json(payload) = payload?;
    let simulation = state
        .orchestrator
        .quick_simulation(user_id, payload.channel)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(QuickSimulationResponse {
            simulation_id: simulation.id,
        }),
    ))
}

/// Get a simulation, its transcript and (once ended) its results.
#[utoipa::path(
    get,
    path = "/simulations/{id}",
    responses(
        (status = 200, description = "Simulation details", body = SimulationResponse),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorResponse),
        (status = 404, description = "Simulation not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Simulation ID"),
        ("x-user-id" = String, Header, description = "The ID of the learner")
    )
)]
pub async fn get_simulation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<SimulationResponse>, ApiError> {
    let user_id = caller_id(&headers)?;
    let simulation = state.orchestrator.get_simulation(user_id, id).await?;
    Ok(Json(simulation.into()))
}

/// Send one message to the simulated client and receive its reply.
#[utoipa::path(
    post,
    path = "/simulations/chat",
    request_body = ChatPayload,
    responses(
        (status = 200, description = "Client replied", body = ChatResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid caller identity", body = ErrorResponse),
        (status = 404, description = "Simulation not found", body = ErrorResponse),
        (status = 409, description = "Simulation already completed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("x-user-id" = String, Header, description = "The ID of the learner")
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let user_id = caller_id(&headers)?;
    let Json(payload) = payload?;
    let turn = state
        .orchestrator
        .chat_turn(user_id, payload.simulation_id, payload.message)
        .await?;
    Ok(Json(turn.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::time::Duration;

    fn status(err: CoreError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_core_error_status_mapping() {
        assert_eq!(status(CoreError::Authentication), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(CoreError::NotFound("simulation".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(CoreError::SimulationCompleted(Uuid::nil())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(CoreError::ModuleLocked {
                index: 2,
                current: 0
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(CoreError::InvalidRequest("empty".to_string())),
            StatusCode::BAD_REQUEST
        );
        for internal in [
            CoreError::GenerationValidation("bad".to_string()),
            CoreError::GenerationTimeout(Duration::from_secs(60)),
            CoreError::Generation("down".to_string()),
            CoreError::Persistence("db".to_string()),
        ] {
            assert_eq!(status(internal), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_caller_id() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            caller_id(&headers),
            Err(ApiError::Unauthorized(_))
        ));

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(matches!(
            caller_id(&headers),
            Err(ApiError::Unauthorized(_))
        ));

        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_static("550e8400-e29b-41d4-a716-446655440000"),
        );
        assert_eq!(
            caller_id(&headers).unwrap().to_string(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
    }
}
