//! Simulation lifecycle and learning-path orchestration.
//!
//! The orchestrator is stateless between calls: everything it knows about a
//! path or a simulation is read from the [`TrainingStore`] at the start of an
//! operation, and every state change is a single store call. Generation
//! always happens before the write that depends on it, so a failed or
//! timed-out generation leaves durable state exactly as it was.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::agents::{ActorAgent, Agents, AnalystAgent, ArchitectAgent, ProducerAgent};
use crate::content::ModuleContent;
use crate::error::{CoreError, CoreResult};
use crate::policy::{pick_quick_persona, quick_simulation_difficulty};
use crate::profile::{ExperienceLevel, TrainingGoal};
use crate::simulation::{
    Channel, Difficulty, EndSimulation, MessageRole, NewSimulation, Simulation, SimulationResult,
    TranscriptMessage,
};
use crate::store::{PathAdvance, TrainingStore};
use crate::syllabus::{
    CompletionPlan, ContentType, LearningPath, ModuleCompletion, NewLearningPath, Syllabus,
    SyllabusModule,
};

/// Industry used when a path does not name one.
pub const DEFAULT_INDUSTRY: &str = "General";
/// Level used for theory content when the learner has no profile.
pub const DEFAULT_THEORY_LEVEL: ExperienceLevel = ExperienceLevel::Mid;
/// Difficulty of simulations started from a learning-path module.
pub const MODULE_SIMULATION_DIFFICULTY: Difficulty = Difficulty::Medium;
pub const DEFAULT_CHANNEL: Channel = Channel::Whatsapp;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Generate content for modules after the first in the background once an
    /// AI track is created.
    pub prefetch_content: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            prefetch_content: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedTrack {
    pub path_id: Uuid,
    pub syllabus: Syllabus,
}

/// What starting a module produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleStart {
    /// A simulation was created for the learner to open.
    Simulation { simulation_id: Uuid, is_static: bool },
    /// Content to render. Drill content is delivered here too.
    Theory {
        content: ModuleContent,
        is_static: bool,
    },
}

/// The caller-facing result of one chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurnOutcome {
    pub reply: Option<String>,
    pub simulation_ended: bool,
    pub outcome: Option<EndSimulation>,
}

pub struct TrainingOrchestrator {
    store: Arc<dyn TrainingStore>,
    architect: ArchitectAgent,
    producer: Arc<ProducerAgent>,
    actor: ActorAgent,
    analyst: AnalystAgent,
    settings: OrchestratorSettings,
}

impl TrainingOrchestrator {
    pub fn new(
        store: Arc<dyn TrainingStore>,
        agents: Agents,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            architect: agents.architect,
            producer: agents.producer,
            actor: agents.actor,
            analyst: agents.analyst,
            settings,
        }
    }

    /// Designs a syllabus for the learner and stores it as a new AI path.
    #[instrument(skip(self))]
    pub async fn generate_track(
        &self,
        user_id: Uuid,
        experience_level: ExperienceLevel,
        training_goal: Option<TrainingGoal>,
        industry: String,
    ) -> CoreResult<GeneratedTrack> {
        let syllabus = self
            .architect
            .generate_syllabus(experience_level, training_goal, &industry)
            .await?;

        let path = self
            .store
            .create_learning_path(NewLearningPath::from_syllabus(
                user_id,
                Some(industry),
                syllabus.clone(),
            ))
            .await?;
        let path_id = path.id;
        info!(path_id = %path_id, modules = path.total_modules, "AI learning path created");

        if self.settings.prefetch_content {
            let producer = self.producer.clone();
            let store = self.store.clone();
            tokio::spawn(async move {
                if let Err(e) = prefetch_content(producer, store, path, experience_level).await {
                    error!(path_id = %path_id, error = %e, "Content prefetch failed");
                }
            });
        }

        Ok(GeneratedTrack { path_id, syllabus })
    }

    /// Clones an active standard track into a new learning path.
    #[instrument(skip(self))]
    pub async fn start_standard_track(
        &self,
        user_id: Uuid,
        track_id: Uuid,
    ) -> CoreResult<LearningPath> {
        let track = self.store.get_standard_track(track_id).await?;
        let path = self
            .store
            .create_learning_path(NewLearningPath::from_track(user_id, &track))
            .await?;
        info!(path_id = %path.id, track = %track.title, "Standard track started");
        Ok(path)
    }

    pub async fn get_learning_path(
        &self,
        user_id: Uuid,
        path_id: Uuid,
    ) -> CoreResult<LearningPath> {
        self.store.get_learning_path(path_id, user_id).await
    }

    pub async fn get_simulation(&self, user_id: Uuid, simulation_id: Uuid) -> CoreResult<Simulation> {
        self.store.get_simulation(simulation_id, user_id).await
    }

    /// Content already available for a module, without generating anything.
    ///
    /// The module's own content wins; otherwise a path cloned from a standard
    /// track falls back to the template module at the same index.
    async fn stored_content(
        &self,
        path: &LearningPath,
        index: usize,
    ) -> CoreResult<Option<ModuleContent>> {
        let module = path.module(index)?;
        if let Some(content) = &module.content {
            return Ok(Some(content.clone()));
        }
        let Some(track_id) = path.source_track_id else {
            return Ok(None);
        };
        match self.store.get_standard_track(track_id).await {
            Ok(track) => Ok(track
                .syllabus_template
                .get(index)
                .and_then(|m| m.content.clone())),
            Err(CoreError::NotFound(_)) => {
                warn!(track_id = %track_id, "Source track of learning path is gone");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Opens a module: creates its simulation, or returns its content.
    #[instrument(skip(self))]
    pub async fn start_module(
        &self,
        user_id: Uuid,
        path_id: Uuid,
        module_index: usize,
    ) -> CoreResult<ModuleStart> {
        let path = self.store.get_learning_path(path_id, user_id).await?;
        let module = path.module(module_index)?.clone();
        let industry = path.industry.as_deref().unwrap_or(DEFAULT_INDUSTRY);
        let stored = self.stored_content(&path, module_index).await?;

        if module.content_type == ContentType::Simulation {
            let (scenario, channel, is_static) = match stored {
                Some(ModuleContent::Simulation { scenario, channel }) => (scenario, channel, true),
                _ => {
                    let scenario = self
                        .producer
                        .generate_simulation_scenario(
                            module.topic(),
                            industry,
                            MODULE_SIMULATION_DIFFICULTY,
                        )
                        .await?;
                    (scenario, None, false)
                }
            };

            let simulation = self
                .create_simulation(NewSimulation {
                    user_id,
                    path_id: Some(path.id),
                    channel: channel.unwrap_or(DEFAULT_CHANNEL),
                    difficulty: MODULE_SIMULATION_DIFFICULTY,
                    client_persona: scenario.client_persona,
                    context: Some(scenario.context),
                    goal: Some(scenario.goal),
                })
                .await?;
            return Ok(ModuleStart::Simulation {
                simulation_id: simulation.id,
                is_static,
            });
        }

        if let Some(content) = stored.filter(|c| !c.is_simulation()) {
            return Ok(ModuleStart::Theory {
                content,
                is_static: true,
            });
        }

        let level = self.theory_level(user_id).await?;
        let content = generate_module_content(&self.producer, &module, industry, level).await?;
        Ok(ModuleStart::Theory {
            content,
            is_static: false,
        })
    }

    async fn theory_level(&self, user_id: Uuid) -> CoreResult<ExperienceLevel> {
        Ok(self
            .store
            .get_profile(user_id)
            .await?
            .map_or(DEFAULT_THEORY_LEVEL, |p| p.experience_level))
    }

    /// Creates an active simulation with an empty transcript.
    #[instrument(skip(self, simulation), fields(user_id = %simulation.user_id))]
    pub async fn create_simulation(&self, simulation: NewSimulation) -> CoreResult<Simulation> {
        if simulation.client_persona.objections.is_empty() {
            return Err(CoreError::InvalidRequest(
                "client persona declares no objections".to_string(),
            ));
        }
        let created = self.store.create_simulation(simulation).await?;
        info!(
            simulation_id = %created.id,
            channel = %created.channel,
            difficulty = %created.difficulty,
            "Simulation created"
        );
        Ok(created)
    }

    /// Starts a free-practice simulation with a stock persona.
    #[instrument(skip(self))]
    pub async fn quick_simulation(
        &self,
        user_id: Uuid,
        channel: Option<Channel>,
    ) -> CoreResult<Simulation> {
        let level = self
            .store
            .get_profile(user_id)
            .await?
            .map(|p| p.experience_level);
        let client_persona = pick_quick_persona(&mut rand::rng());

        self.create_simulation(NewSimulation {
            user_id,
            path_id: None,
            channel: channel.unwrap_or(DEFAULT_CHANNEL),
            difficulty: quick_simulation_difficulty(level),
            client_persona,
            context: None,
            goal: None,
        })
        .await
    }

    /// Records the learner's message and produces exactly one client reply.
    ///
    /// The learner's message is persisted before the Actor runs. When the
    /// Actor ends the conversation, the Analyst scores the full transcript
    /// (closing reply included) and the closing reply and result are written
    /// together.
    #[instrument(skip(self, message))]
    pub async fn chat_turn(
        &self,
        user_id: Uuid,
        simulation_id: Uuid,
        message: String,
    ) -> CoreResult<ChatTurnOutcome> {
        if message.trim().is_empty() {
            return Err(CoreError::InvalidRequest("message is empty".to_string()));
        }

        let mut simulation = self.store.get_simulation(simulation_id, user_id).await?;
        if simulation.is_completed() {
            return Err(CoreError::SimulationCompleted(simulation_id));
        }

        let user_message =
            TranscriptMessage::next(&simulation.transcript, MessageRole::User, message, Utc::now());
        self.store
            .append_transcript_message(simulation_id, user_id, user_message.clone())
            .await?;
        simulation.transcript.push(user_message);

        let brief = scenario_brief(&simulation);
        let reply = self
            .actor
            .generate_response(
                &simulation.client_persona,
                &simulation.transcript,
                simulation.difficulty,
                simulation.channel,
                brief.as_deref(),
            )
            .await?;

        let client_message = reply.text.as_ref().map(|text| {
            TranscriptMessage::next(
                &simulation.transcript,
                MessageRole::Client,
                text.clone(),
                Utc::now(),
            )
        });

        let Some(end) = reply.end_signal().cloned() else {
            // Silence is only allowed when the client ends the conversation.
            let Some(client_message) = client_message else {
                warn!(simulation_id = %simulation_id, "Actor returned neither text nor an end signal");
                return Err(CoreError::invalid_output(
                    "actor reply has no text and does not end the simulation",
                ));
            };
            self.store
                .append_transcript_message(simulation_id, user_id, client_message)
                .await?;
            return Ok(ChatTurnOutcome {
                reply: reply.text,
                simulation_ended: false,
                outcome: None,
            });
        };

        let mut full_transcript = simulation.transcript;
        full_transcript.extend(client_message.clone());
        let analysis = self
            .analyst
            .analyze_simulation(
                &full_transcript,
                &simulation.client_persona,
                simulation.channel,
            )
            .await?;

        self.store
            .finish_simulation(
                simulation_id,
                user_id,
                client_message,
                SimulationResult::new(end.clone(), analysis),
            )
            .await?;
        info!(outcome = %end.outcome, "Simulation ended");

        Ok(ChatTurnOutcome {
            reply: reply.text,
            simulation_ended: true,
            outcome: Some(end),
        })
    }

    /// Marks the current module completed and advances the path.
    #[instrument(skip(self))]
    pub async fn complete_module(
        &self,
        user_id: Uuid,
        path_id: Uuid,
        module_index: usize,
    ) -> CoreResult<ModuleCompletion> {
        let path = self.store.get_learning_path(path_id, user_id).await?;

        let (expected_index, new_index, track_complete, content_type) =
            match path.plan_completion(module_index)? {
                CompletionPlan::AlreadyCompleted => {
                    return Ok(ModuleCompletion::at(
                        path.current_module_index,
                        path.total_modules,
                    ));
                }
                CompletionPlan::Advance {
                    expected_index,
                    new_index,
                    track_complete,
                    content_type,
                } => (expected_index, new_index, track_complete, content_type),
            };

        let applied = self
            .store
            .advance_learning_path(PathAdvance {
                path_id,
                user_id,
                expected_index,
                completed_module: module_index,
                new_index,
                completed: track_complete,
            })
            .await?;

        if !applied {
            info!("Module was completed concurrently; path left as is");
            let current = self.store.get_learning_path(path_id, user_id).await?;
            return Ok(ModuleCompletion::at(
                current.current_module_index,
                current.total_modules,
            ));
        }

        if content_type == ContentType::Simulation {
            if let Err(e) = self.store.increment_simulation_count(user_id).await {
                warn!(error = %e, "Could not increment simulation counter");
            }
        }

        info!(new_index, track_complete, "Module completed");
        Ok(ModuleCompletion::at(new_index, path.total_modules))
    }
}

/// Context handed to the Actor: the scenario brief plus the learner's goal.
fn scenario_brief(simulation: &Simulation) -> Option<String> {
    match (&simulation.context, &simulation.goal) {
        (Some(context), Some(goal)) => Some(format!("{context}\nThe salesperson's goal: {goal}")),
        (Some(context), None) => Some(context.clone()),
        (None, Some(goal)) => Some(format!("The salesperson's goal: {goal}")),
        (None, None) => None,
    }
}

/// Generates fresh content for a module according to its type.
async fn generate_module_content(
    producer: &ProducerAgent,
    module: &SyllabusModule,
    industry: &str,
    level: ExperienceLevel,
) -> CoreResult<ModuleContent> {
    let content = match module.content_type {
        ContentType::Theory => {
            ModuleContent::Story(producer.generate_theory(module.topic(), industry, level).await?)
        }
        ContentType::Drill => {
            ModuleContent::Drill(producer.generate_drill(module.topic(), industry).await?)
        }
        ContentType::Simulation => ModuleContent::Simulation {
            scenario: producer
                .generate_simulation_scenario(module.topic(), industry, MODULE_SIMULATION_DIFFICULTY)
                .await?,
            channel: None,
        },
    };
    Ok(content)
}

/// Fills in content for every module after the first, one at a time.
///
/// A module that fails is logged and skipped; it will be generated on demand
/// when the learner opens it.
async fn prefetch_content(
    producer: Arc<ProducerAgent>,
    store: Arc<dyn TrainingStore>,
    path: LearningPath,
    level: ExperienceLevel,
) -> CoreResult<usize> {
    let industry = path.industry.as_deref().unwrap_or(DEFAULT_INDUSTRY);
    let mut stored = 0;

    for index in path.modules_to_prefetch() {
        let module = path.module(index)?;
        let content = match generate_module_content(&producer, module, industry, level).await {
            Ok(content) => content,
            Err(e) => {
                error!(path_id = %path.id, module = index, error = %e, "Module prefetch failed");
                continue;
            }
        };
        store
            .set_module_content(path.id, path.user_id, index, content)
            .await?;
        stored += 1;
    }

    info!(path_id = %path.id, stored, "Content prefetch finished");
    Ok(stored)
}
