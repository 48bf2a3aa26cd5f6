//! Core of the sales-training backend: domain types, the generative agents,
//! the persistence port and the orchestrator that ties them together.

pub mod agents;
pub mod content;
pub mod error;
pub mod generation;
pub mod llm_client;
pub mod orchestrator;
pub mod policy;
pub mod profile;
pub mod prompts;
pub mod resolver;
pub mod simulation;
pub mod store;
pub mod stored;
pub mod syllabus;

pub use error::{CoreError, CoreResult};
pub use orchestrator::{
    ChatTurnOutcome, GeneratedTrack, ModuleStart, OrchestratorSettings, TrainingOrchestrator,
};
pub use store::{InMemoryStore, TrainingStore};
