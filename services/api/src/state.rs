//! Shared Application State

use godash_core::TrainingOrchestrator;

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub orchestrator: TrainingOrchestrator,
}
