//! Error taxonomy shared by the agents, the store port and the orchestrator.

use std::time::Duration;
use uuid::Uuid;

/// Every failure the core can surface to its callers.
///
/// Best-effort failures (auxiliary counters) never reach this type: they are
/// logged where they happen and swallowed.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("No valid caller identity")]
    Authentication,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Generated content failed validation: {0}")]
    GenerationValidation(String),
    #[error("Generation exceeded its {0:?} budget")]
    GenerationTimeout(Duration),
    #[error("Generation provider failed: {0}")]
    Generation(String),
    #[error("Persistence failed: {0}")]
    Persistence(String),
    #[error("Simulation {0} is already completed")]
    SimulationCompleted(Uuid),
    #[error("Module {index} is locked; the current module is {current}")]
    ModuleLocked { index: usize, current: usize },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CoreError {
    /// Shorthand for a validation failure with a formatted message.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::GenerationValidation(message.into())
    }

    /// True for the failures a caller may reasonably retry as a whole.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::GenerationValidation(_) | Self::GenerationTimeout(_) | Self::Generation(_)
        )
    }
}

/// A convenience type alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;
