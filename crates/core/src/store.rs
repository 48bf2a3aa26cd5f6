//! The persistence port used by the orchestrator.
//!
//! Every call is scoped by owner id: a row that exists but belongs to someone
//! else is reported exactly like a row that does not exist.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::content::ModuleContent;
use crate::error::{CoreError, CoreResult};
use crate::profile::LearnerProfile;
use crate::simulation::{NewSimulation, Simulation, SimulationResult, TranscriptMessage};
use crate::syllabus::{LearningPath, NewLearningPath, StandardTrack};

/// A conditional path update: applied only while the stored index still
/// equals `expected_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathAdvance {
    pub path_id: Uuid,
    pub user_id: Uuid,
    pub expected_index: usize,
    pub completed_module: usize,
    pub new_index: usize,
    pub completed: bool,
}

#[async_trait]
pub trait TrainingStore: Send + Sync {
    /// `None` when the learner has not been onboarded.
    async fn get_profile(&self, user_id: Uuid) -> CoreResult<Option<LearnerProfile>>;

    async fn increment_simulation_count(&self, user_id: Uuid) -> CoreResult<()>;

    async fn create_learning_path(&self, path: NewLearningPath) -> CoreResult<LearningPath>;

    async fn get_learning_path(&self, path_id: Uuid, user_id: Uuid) -> CoreResult<LearningPath>;

    /// Applies `advance` atomically. Returns `false` when the guard did not match.
    async fn advance_learning_path(&self, advance: PathAdvance) -> CoreResult<bool>;

    /// Caches generated content on one module of a path.
    async fn set_module_content(
        &self,
        path_id: Uuid,
        user_id: Uuid,
        module_index: usize,
        content: ModuleContent,
    ) -> CoreResult<()>;

    async fn get_standard_track(&self, track_id: Uuid) -> CoreResult<StandardTrack>;

    async fn create_simulation(&self, simulation: NewSimulation) -> CoreResult<Simulation>;

    async fn get_simulation(&self, simulation_id: Uuid, user_id: Uuid) -> CoreResult<Simulation>;

    /// Appends one message while the simulation is active.
    ///
    /// Fails with `SimulationCompleted` once the simulation has ended.
    async fn append_transcript_message(
        &self,
        simulation_id: Uuid,
        user_id: Uuid,
        message: TranscriptMessage,
    ) -> CoreResult<()>;

    /// Ends an active simulation in one atomic step: appends the closing
    /// message (if any) and writes the result.
    async fn finish_simulation(
        &self,
        simulation_id: Uuid,
        user_id: Uuid,
        closing_message: Option<TranscriptMessage>,
        result: SimulationResult,
    ) -> CoreResult<()>;
}

/// A process-local `TrainingStore` for development and tests.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, LearnerProfile>,
    tracks: HashMap<Uuid, StandardTrack>,
    paths: HashMap<Uuid, LearningPath>,
    simulations: HashMap<Uuid, Simulation>,
}

fn path_not_found(path_id: Uuid) -> CoreError {
    CoreError::NotFound(format!("learning path {path_id}"))
}

fn simulation_not_found(simulation_id: Uuid) -> CoreError {
    CoreError::NotFound(format!("simulation {simulation_id}"))
}

impl Tables {
    fn path_mut(&mut self, path_id: Uuid, user_id: Uuid) -> CoreResult<&mut LearningPath> {
        self.paths
            .get_mut(&path_id)
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| path_not_found(path_id))
    }

    fn active_simulation_mut(
        &mut self,
        simulation_id: Uuid,
        user_id: Uuid,
    ) -> CoreResult<&mut Simulation> {
        let simulation = self
            .simulations
            .get_mut(&simulation_id)
            .filter(|s| s.user_id == user_id)
            .ok_or_else(|| simulation_not_found(simulation_id))?;
        if simulation.is_completed() {
            return Err(CoreError::SimulationCompleted(simulation_id));
        }
        Ok(simulation)
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, profile: LearnerProfile) {
        self.inner.lock().await.profiles.insert(profile.user_id, profile);
    }

    pub async fn insert_standard_track(&self, track: StandardTrack) {
        self.inner.lock().await.tracks.insert(track.id, track);
    }

    pub async fn simulation_count(&self) -> usize {
        self.inner.lock().await.simulations.len()
    }
}

#[async_trait]
impl TrainingStore for InMemoryStore {
    async fn get_profile(&self, user_id: Uuid) -> CoreResult<Option<LearnerProfile>> {
        Ok(self.inner.lock().await.profiles.get(&user_id).cloned())
    }

    async fn increment_simulation_count(&self, user_id: Uuid) -> CoreResult<()> {
        let mut tables = self.inner.lock().await;
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| CoreError::NotFound(format!("profile {user_id}")))?;
        profile.total_simulations += 1;
        Ok(())
    }

    async fn create_learning_path(&self, path: NewLearningPath) -> CoreResult<LearningPath> {
        let now = Utc::now();
        let created = LearningPath {
            id: Uuid::new_v4(),
            user_id: path.user_id,
            title: path.title,
            description: path.description,
            track_type: path.track_type,
            source_track_id: path.source_track_id,
            industry: path.industry,
            total_modules: path.modules.len(),
            completed: path.modules.is_empty(),
            modules: path.modules,
            current_module_index: 0,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .lock()
            .await
            .paths
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_learning_path(&self, path_id: Uuid, user_id: Uuid) -> CoreResult<LearningPath> {
        let mut tables = self.inner.lock().await;
        Ok(tables.path_mut(path_id, user_id)?.clone())
    }

    async fn advance_learning_path(&self, advance: PathAdvance) -> CoreResult<bool> {
        let mut tables = self.inner.lock().await;
        let path = tables.path_mut(advance.path_id, advance.user_id)?;
        if path.current_module_index != advance.expected_index {
            return Ok(false);
        }
        if let Some(module) = path.modules.get_mut(advance.completed_module) {
            module.completed = true;
        }
        path.current_module_index = advance.new_index;
        path.completed = advance.completed;
        path.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_module_content(
        &self,
        path_id: Uuid,
        user_id: Uuid,
        module_index: usize,
        content: ModuleContent,
    ) -> CoreResult<()> {
        let mut tables = self.inner.lock().await;
        let path = tables.path_mut(path_id, user_id)?;
        let module = path.modules.get_mut(module_index).ok_or_else(|| {
            CoreError::NotFound(format!("module {module_index} of learning path {path_id}"))
        })?;
        module.content = Some(content);
        path.updated_at = Utc::now();
        Ok(())
    }

    async fn get_standard_track(&self, track_id: Uuid) -> CoreResult<StandardTrack> {
        self.inner
            .lock()
            .await
            .tracks
            .get(&track_id)
            .filter(|t| t.is_active)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("standard track {track_id}")))
    }

    async fn create_simulation(&self, simulation: NewSimulation) -> CoreResult<Simulation> {
        let now = Utc::now();
        let created = Simulation {
            id: Uuid::new_v4(),
            user_id: simulation.user_id,
            path_id: simulation.path_id,
            channel: simulation.channel,
            difficulty: simulation.difficulty,
            client_persona: simulation.client_persona,
            context: simulation.context,
            goal: simulation.goal,
            transcript: Vec::new(),
            result: None,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .lock()
            .await
            .simulations
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_simulation(&self, simulation_id: Uuid, user_id: Uuid) -> CoreResult<Simulation> {
        self.inner
            .lock()
            .await
            .simulations
            .get(&simulation_id)
            .filter(|s| s.user_id == user_id)
            .cloned()
            .ok_or_else(|| simulation_not_found(simulation_id))
    }

    async fn append_transcript_message(
        &self,
        simulation_id: Uuid,
        user_id: Uuid,
        message: TranscriptMessage,
    ) -> CoreResult<()> {
        let mut tables = self.inner.lock().await;
        let simulation = tables.active_simulation_mut(simulation_id, user_id)?;
        simulation.transcript.push(message);
        simulation.updated_at = Utc::now();
        Ok(())
    }

    async fn finish_simulation(
        &self,
        simulation_id: Uuid,
        user_id: Uuid,
        closing_message: Option<TranscriptMessage>,
        result: SimulationResult,
    ) -> CoreResult<()> {
        let mut tables = self.inner.lock().await;
        let simulation = tables.active_simulation_mut(simulation_id, user_id)?;
        simulation.transcript.extend(closing_message);
        simulation.result = Some(result);
        simulation.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{
        AIFeedback, Channel, ClientPersona, DetailedScores, Difficulty, EndSimulation,
        MessageRole, PainLevel, Personality, SimulationOutcome, SimulationScores,
    };

    fn new_simulation(user_id: Uuid) -> NewSimulation {
        NewSimulation {
            user_id,
            path_id: None,
            channel: Channel::Whatsapp,
            difficulty: Difficulty::Easy,
            client_persona: ClientPersona {
                name: "Laura".to_string(),
                role: "Compradora".to_string(),
                company: "N/A".to_string(),
                personality: Personality::Amiable,
                pain_level: PainLevel::Low,
                objections: vec!["Solo miro".to_string()],
                decision_maker: true,
            },
            context: None,
            goal: None,
        }
    }

    fn result() -> SimulationResult {
        let detailed = DetailedScores {
            rapport_building: 1,
            question_quality: 2,
            active_listening: 3,
            objection_handling: 4,
            closing_technique: 5,
        };
        SimulationResult {
            outcome: EndSimulation {
                reason: "Bought".to_string(),
                outcome: SimulationOutcome::DealWon,
                feedback_hint: None,
            },
            scores: SimulationScores {
                overall: 50,
                discovery: 50,
                qualification: 50,
                objection_handling: 50,
                closing: 50,
            },
            feedback: AIFeedback {
                overall_summary: "ok".to_string(),
                strengths: vec![],
                weaknesses: vec![],
                next_steps: vec![],
                detailed_scores: detailed,
            },
        }
    }

    fn message(content: &str, timestamp: i64) -> TranscriptMessage {
        TranscriptMessage {
            role: MessageRole::User,
            content: content.to_string(),
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_simulations_are_owner_scoped() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let sim = store.create_simulation(new_simulation(owner)).await.unwrap();

        assert!(matches!(
            store.get_simulation(sim.id, Uuid::new_v4()).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            store
                .append_transcript_message(sim.id, Uuid::new_v4(), message("x", 1))
                .await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_finish_is_one_way() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let sim = store.create_simulation(new_simulation(owner)).await.unwrap();

        store
            .append_transcript_message(sim.id, owner, message("Hola", 1))
            .await
            .unwrap();
        store
            .finish_simulation(sim.id, owner, Some(message("Adiós", 2)), result())
            .await
            .unwrap();

        let finished = store.get_simulation(sim.id, owner).await.unwrap();
        assert!(finished.is_completed());
        assert_eq!(finished.transcript.len(), 2);

        assert!(matches!(
            store
                .append_transcript_message(sim.id, owner, message("¿Sigue ahí?", 3))
                .await,
            Err(CoreError::SimulationCompleted(id)) if id == sim.id
        ));
        assert!(matches!(
            store.finish_simulation(sim.id, owner, None, result()).await,
            Err(CoreError::SimulationCompleted(_))
        ));
    }

    #[tokio::test]
    async fn test_advance_guard_rejects_stale_index() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let path = store
            .create_learning_path(NewLearningPath {
                user_id: owner,
                title: "t".to_string(),
                description: None,
                track_type: crate::syllabus::TrackType::AiGenerated,
                source_track_id: None,
                industry: None,
                modules: vec![],
            })
            .await
            .unwrap();

        let stale = PathAdvance {
            path_id: path.id,
            user_id: owner,
            expected_index: 3,
            completed_module: 3,
            new_index: 4,
            completed: false,
        };
        assert!(!store.advance_learning_path(stale).await.unwrap());
    }
}
