//! API and Database Models
//!
//! Request and response bodies (camelCase on the wire, documented with
//! `utoipa`) and the `sqlx` row records that are converted into core types.

use chrono::{DateTime, Utc};
use godash_core::content::ModuleContent;
use godash_core::error::{CoreError, CoreResult};
use godash_core::orchestrator::{ChatTurnOutcome, ModuleStart};
use godash_core::profile::{ExperienceLevel, LearnerProfile, TrainingGoal};
use godash_core::simulation::{
    AIFeedback, Channel, ClientPersona, Difficulty, EndSimulation, Simulation, SimulationResult,
    SimulationScores, TranscriptMessage,
};
use godash_core::stored;
use godash_core::syllabus::{LearningPath, ModuleCompletion, StandardTrack, Syllabus, SyllabusModule};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Requests ---

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateTrackPayload {
    #[schema(value_type = String, example = "mid")]
    pub experience_level: ExperienceLevel,
    #[schema(value_type = Option<String>, example = "improve_skill")]
    pub training_goal: Option<TrainingGoal>,
    #[schema(example = "Seguros")]
    pub industry: String,
}

/// Identifies one module of one learning path.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModulePayload {
    #[schema(value_type = String, format = Uuid)]
    pub path_id: Uuid,
    pub module_index: usize,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct QuickSimulationPayload {
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "whatsapp")]
    pub channel: Option<Channel>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    #[schema(value_type = String, format = Uuid)]
    pub simulation_id: Uuid,
    #[schema(example = "Hola, busco una chaqueta")]
    pub message: String,
}

// --- Responses ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTrackResponse {
    #[schema(value_type = String, format = Uuid)]
    pub path_id: Uuid,
    #[schema(value_type = Object)]
    pub syllabus: Syllabus,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartTrackResponse {
    #[schema(value_type = String, format = Uuid)]
    pub path_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModuleStartResponse {
    Simulation {
        #[serde(rename = "resourceId")]
        #[schema(value_type = String, format = Uuid)]
        resource_id: Uuid,
        #[serde(rename = "isStatic")]
        is_static: bool,
    },
    Theory {
        #[schema(value_type = Object)]
        content: ModuleContent,
        #[serde(rename = "isStatic")]
        is_static: bool,
    },
}

impl From<ModuleStart> for ModuleStartResponse {
    fn from(start: ModuleStart) -> Self {
        match start {
            ModuleStart::Simulation {
                simulation_id,
                is_static,
            } => Self::Simulation {
                resource_id: simulation_id,
                is_static,
            },
            ModuleStart::Theory { content, is_static } => Self::Theory { content, is_static },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCompletionResponse {
    pub next_module_index: Option<usize>,
    pub is_track_complete: bool,
}

impl From<ModuleCompletion> for ModuleCompletionResponse {
    fn from(done: ModuleCompletion) -> Self {
        Self {
            next_module_index: done.next_module_index,
            is_track_complete: done.is_track_complete,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuickSimulationResponse {
    #[schema(value_type = String, format = Uuid)]
    pub simulation_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: Option<String>,
    pub simulation_ended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub outcome: Option<EndSimulation>,
}

impl From<ChatTurnOutcome> for ChatResponse {
    fn from(turn: ChatTurnOutcome) -> Self {
        Self {
            reply: turn.reply,
            simulation_ended: turn.simulation_ended,
            outcome: turn.outcome,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "ai_generated")]
    pub track_type: String,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub source_track_id: Option<Uuid>,
    pub industry: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub syllabus_data: Vec<SyllabusModule>,
    pub current_module_index: usize,
    pub total_modules: usize,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LearningPath> for LearningPathResponse {
    fn from(path: LearningPath) -> Self {
        Self {
            id: path.id,
            title: path.title,
            description: path.description,
            track_type: path.track_type.to_string(),
            source_track_id: path.source_track_id,
            industry: path.industry,
            syllabus_data: path.modules,
            current_module_index: path.current_module_index,
            total_modules: path.total_modules,
            completed: path.completed,
            created_at: path.created_at,
            updated_at: path.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub path_id: Option<Uuid>,
    #[schema(value_type = String, example = "whatsapp")]
    pub channel: Channel,
    #[schema(value_type = String, example = "medium")]
    pub difficulty: Difficulty,
    #[schema(value_type = Object)]
    pub client_persona: ClientPersona,
    pub context: Option<String>,
    pub goal: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub transcript: Vec<TranscriptMessage>,
    pub completed: bool,
    #[schema(value_type = Option<Object>)]
    pub outcome: Option<EndSimulation>,
    #[schema(value_type = Option<Object>)]
    pub scores: Option<SimulationScores>,
    #[schema(value_type = Option<Object>)]
    pub feedback: Option<AIFeedback>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Simulation> for SimulationResponse {
    fn from(simulation: Simulation) -> Self {
        let completed = simulation.is_completed();
        let (outcome, scores, feedback) = match simulation.result {
            Some(result) => (
                Some(result.outcome),
                Some(result.scores),
                Some(result.feedback),
            ),
            None => (None, None, None),
        };
        Self {
            id: simulation.id,
            path_id: simulation.path_id,
            channel: simulation.channel,
            difficulty: simulation.difficulty,
            client_persona: simulation.client_persona,
            context: simulation.context,
            goal: simulation.goal,
            transcript: simulation.transcript,
            completed,
            outcome,
            scores,
            feedback,
            created_at: simulation.created_at,
            updated_at: simulation.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

// --- Database records ---

/// Parses a TEXT column holding a serde enum name (e.g. `"ai_generated"`).
fn parse_label<T: DeserializeOwned>(column: &str, label: String) -> CoreResult<T> {
    serde_json::from_value(Value::String(label))
        .map_err(|e| CoreError::Persistence(format!("{column} has an unknown value: {e}")))
}

fn to_index(column: &str, value: i32) -> CoreResult<usize> {
    usize::try_from(value)
        .map_err(|_| CoreError::Persistence(format!("{column} is negative: {value}")))
}

fn to_score(column: &str, value: Option<i16>) -> CoreResult<u8> {
    value
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| CoreError::Persistence(format!("{column} is missing or out of range")))
}

#[derive(Debug, FromRow)]
pub struct ProfileRecord {
    pub user_id: Uuid,
    pub experience_level: String,
    pub training_goal: Option<String>,
    pub industry: Option<String>,
    pub total_simulations: i32,
}

impl TryFrom<ProfileRecord> for LearnerProfile {
    type Error = CoreError;

    fn try_from(record: ProfileRecord) -> CoreResult<Self> {
        Ok(Self {
            user_id: record.user_id,
            experience_level: parse_label("experience_level", record.experience_level)?,
            training_goal: record
                .training_goal
                .map(|goal| parse_label("training_goal", goal))
                .transpose()?,
            industry: record.industry,
            total_simulations: u32::try_from(record.total_simulations).unwrap_or(0),
        })
    }
}

#[derive(Debug, FromRow)]
pub struct StandardTrackRecord {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub industry: String,
    pub difficulty: String,
    pub syllabus_template: Value,
    pub is_active: bool,
}

impl TryFrom<StandardTrackRecord> for StandardTrack {
    type Error = CoreError;

    fn try_from(record: StandardTrackRecord) -> CoreResult<Self> {
        Ok(Self {
            id: record.id,
            title: record.title,
            description: record.description,
            industry: record.industry,
            difficulty: parse_label("difficulty", record.difficulty)?,
            syllabus_template: stored::decode("syllabus_template", record.syllabus_template)?,
            is_active: record.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct LearningPathRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub track_type: String,
    pub source_track_id: Option<Uuid>,
    pub industry: Option<String>,
    pub syllabus_data: Value,
    pub current_module_index: i32,
    pub total_modules: i32,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LearningPathRecord> for LearningPath {
    type Error = CoreError;

    fn try_from(record: LearningPathRecord) -> CoreResult<Self> {
        Ok(Self {
            id: record.id,
            user_id: record.user_id,
            title: record.title,
            description: record.description,
            track_type: parse_label("track_type", record.track_type)?,
            source_track_id: record.source_track_id,
            industry: record.industry,
            modules: stored::decode("syllabus_data", record.syllabus_data)?,
            current_module_index: to_index("current_module_index", record.current_module_index)?,
            total_modules: to_index("total_modules", record.total_modules)?,
            completed: record.completed,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct SimulationRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub path_id: Option<Uuid>,
    pub channel: String,
    pub difficulty: String,
    pub client_persona: Value,
    pub context: Option<String>,
    pub goal: Option<String>,
    pub transcript: Option<Value>,
    pub completed: bool,
    pub outcome: Option<Value>,
    pub score_overall: Option<i16>,
    pub score_discovery: Option<i16>,
    pub score_qualification: Option<i16>,
    pub score_objection_handling: Option<i16>,
    pub score_closing: Option<i16>,
    pub ai_feedback: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SimulationRecord {
    fn result(&self) -> CoreResult<Option<SimulationResult>> {
        if !self.completed {
            return Ok(None);
        }
        let outcome = self
            .outcome
            .clone()
            .ok_or_else(|| CoreError::Persistence("completed simulation has no outcome".into()))?;
        let feedback = self
            .ai_feedback
            .clone()
            .ok_or_else(|| CoreError::Persistence("completed simulation has no feedback".into()))?;
        Ok(Some(SimulationResult {
            outcome: stored::decode("outcome", outcome)?,
            scores: SimulationScores {
                overall: to_score("score_overall", self.score_overall)?,
                discovery: to_score("score_discovery", self.score_discovery)?,
                qualification: to_score("score_qualification", self.score_qualification)?,
                objection_handling: to_score(
                    "score_objection_handling",
                    self.score_objection_handling,
                )?,
                closing: to_score("score_closing", self.score_closing)?,
            },
            feedback: stored::decode("ai_feedback", feedback)?,
        }))
    }
}

impl TryFrom<SimulationRecord> for Simulation {
    type Error = CoreError;

    fn try_from(record: SimulationRecord) -> CoreResult<Self> {
        let result = record.result()?;
        Ok(Self {
            id: record.id,
            user_id: record.user_id,
            path_id: record.path_id,
            channel: parse_label("channel", record.channel)?,
            difficulty: parse_label("difficulty", record.difficulty)?,
            client_persona: stored::decode("client_persona", record.client_persona)?,
            context: record.context,
            goal: record.goal,
            transcript: stored::decode_or_default("transcript", record.transcript)?,
            result,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}
