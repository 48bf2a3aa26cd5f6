//! Data Access Layer
//!
//! PostgreSQL implementation of the core `TrainingStore` port. Every query is
//! scoped by owner id, and every state transition is a single statement so
//! that concurrent requests can never observe or produce a half-written row.

use async_trait::async_trait;
use godash_core::content::ModuleContent;
use godash_core::error::{CoreError, CoreResult};
use godash_core::profile::LearnerProfile;
use godash_core::simulation::{NewSimulation, Simulation, SimulationResult, TranscriptMessage};
use godash_core::store::{PathAdvance, TrainingStore};
use godash_core::syllabus::{LearningPath, NewLearningPath, StandardTrack};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::{LearningPathRecord, ProfileRecord, SimulationRecord, StandardTrackRecord};

macro_rules! path_columns {
    () => {
        "id, user_id, title, description, track_type, source_track_id, industry, syllabus_data, \
         current_module_index, total_modules, completed, created_at, updated_at"
    };
}

macro_rules! simulation_columns {
    () => {
        "id, user_id, path_id, channel, difficulty, client_persona, context, goal, transcript, \
         completed, outcome, score_overall, score_discovery, score_qualification, \
         score_objection_handling, score_closing, ai_feedback, created_at, updated_at"
    };
}

// JSON columns may hold a string-encoded document; normalize before editing in place.
macro_rules! native_json {
    ($column:literal) => {
        concat!(
            "(CASE jsonb_typeof(", $column, ") WHEN 'string' THEN (", $column,
            " #>> '{}')::jsonb ELSE ", $column, " END)"
        )
    };
}

fn persistence(err: sqlx::Error) -> CoreError {
    CoreError::Persistence(err.to_string())
}

fn to_json<T: Serialize>(entity: &str, value: &T) -> CoreResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| CoreError::Persistence(format!("could not encode {entity}: {e}")))
}

fn to_column(entity: &str, value: usize) -> CoreResult<i32> {
    i32::try_from(value)
        .map_err(|_| CoreError::Persistence(format!("{entity} {value} does not fit the column")))
}

/// A wrapper around the `PgPool` to provide a clear data access interface.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Creates a new `Db` instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn path_exists(&self, path_id: Uuid, user_id: Uuid) -> CoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM learning_paths WHERE id = $1 AND user_id = $2)",
        )
        .bind(path_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)
    }

    /// Explains why a guarded simulation update matched no row.
    async fn inactive_simulation(&self, simulation_id: Uuid, user_id: Uuid) -> CoreError {
        let completed = sqlx::query_scalar::<_, bool>(
            "SELECT completed FROM simulations WHERE id = $1 AND user_id = $2",
        )
        .bind(simulation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;

        match completed {
            Ok(Some(true)) => CoreError::SimulationCompleted(simulation_id),
            Ok(Some(false)) => CoreError::Persistence(format!(
                "simulation {simulation_id} changed during the update"
            )),
            Ok(None) => CoreError::NotFound(format!("simulation {simulation_id}")),
            Err(e) => persistence(e),
        }
    }
}

#[async_trait]
impl TrainingStore for Db {
    async fn get_profile(&self, user_id: Uuid) -> CoreResult<Option<LearnerProfile>> {
        sqlx::query_as::<_, ProfileRecord>(
            "SELECT user_id, experience_level, training_goal, industry, total_simulations \
             FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?
        .map(LearnerProfile::try_from)
        .transpose()
    }

    async fn increment_simulation_count(&self, user_id: Uuid) -> CoreResult<()> {
        let updated = sqlx::query(
            "UPDATE profiles SET total_simulations = total_simulations + 1, updated_at = NOW() \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        if updated.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("profile {user_id}")));
        }
        Ok(())
    }

    async fn create_learning_path(&self, path: NewLearningPath) -> CoreResult<LearningPath> {
        let total_modules = to_column("total_modules", path.modules.len())?;
        let record = sqlx::query_as::<_, LearningPathRecord>(concat!(
            "INSERT INTO learning_paths (id, user_id, title, description, track_type, \
             source_track_id, industry, syllabus_data, current_module_index, total_modules, completed) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10) RETURNING ",
            path_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(path.user_id)
        .bind(&path.title)
        .bind(&path.description)
        .bind(path.track_type.to_string())
        .bind(path.source_track_id)
        .bind(&path.industry)
        .bind(to_json("syllabus_data", &path.modules)?)
        .bind(total_modules)
        .bind(path.modules.is_empty())
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;

        LearningPath::try_from(record)
    }

    async fn get_learning_path(&self, path_id: Uuid, user_id: Uuid) -> CoreResult<LearningPath> {
        sqlx::query_as::<_, LearningPathRecord>(concat!(
            "SELECT ",
            path_columns!(),
            " FROM learning_paths WHERE id = $1 AND user_id = $2"
        ))
        .bind(path_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?
        .ok_or_else(|| CoreError::NotFound(format!("learning path {path_id}")))
        .and_then(LearningPath::try_from)
    }

    async fn advance_learning_path(&self, advance: PathAdvance) -> CoreResult<bool> {
        let updated = sqlx::query(concat!(
            "UPDATE learning_paths SET syllabus_data = jsonb_set(",
            native_json!("syllabus_data"),
            ", ARRAY[$4, 'completed'], 'true'::jsonb), \
             current_module_index = $5, completed = $6, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND current_module_index = $3"
        ))
        .bind(advance.path_id)
        .bind(advance.user_id)
        .bind(to_column("current_module_index", advance.expected_index)?)
        .bind(advance.completed_module.to_string())
        .bind(to_column("current_module_index", advance.new_index)?)
        .bind(advance.completed)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        if updated.rows_affected() == 1 {
            return Ok(true);
        }
        if !self.path_exists(advance.path_id, advance.user_id).await? {
            return Err(CoreError::NotFound(format!(
                "learning path {}",
                advance.path_id
            )));
        }
        debug!(path_id = %advance.path_id, "Advance guard did not match");
        Ok(false)
    }

    async fn set_module_content(
        &self,
        path_id: Uuid,
        user_id: Uuid,
        module_index: usize,
        content: ModuleContent,
    ) -> CoreResult<()> {
        let updated = sqlx::query(concat!(
            "UPDATE learning_paths SET syllabus_data = jsonb_set(",
            native_json!("syllabus_data"),
            ", ARRAY[$3, 'content'], $4, true), updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND $5 < total_modules"
        ))
        .bind(path_id)
        .bind(user_id)
        .bind(module_index.to_string())
        .bind(to_json("module content", &content)?)
        .bind(to_column("module index", module_index)?)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        if updated.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!(
                "module {module_index} of learning path {path_id}"
            )));
        }
        Ok(())
    }

    async fn get_standard_track(&self, track_id: Uuid) -> CoreResult<StandardTrack> {
        sqlx::query_as::<_, StandardTrackRecord>(
            "SELECT id, title, description, industry, difficulty, syllabus_template, is_active \
             FROM standard_tracks WHERE id = $1 AND is_active",
        )
        .bind(track_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?
        .ok_or_else(|| CoreError::NotFound(format!("standard track {track_id}")))
        .and_then(StandardTrack::try_from)
    }

    async fn create_simulation(&self, simulation: NewSimulation) -> CoreResult<Simulation> {
        let record = sqlx::query_as::<_, SimulationRecord>(concat!(
            "INSERT INTO simulations (id, user_id, path_id, channel, difficulty, client_persona, \
             context, goal, transcript, completed) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, '[]'::jsonb, FALSE) RETURNING ",
            simulation_columns!()
        ))
        .bind(Uuid::new_v4())
        .bind(simulation.user_id)
        .bind(simulation.path_id)
        .bind(simulation.channel.to_string())
        .bind(simulation.difficulty.to_string())
        .bind(to_json("client_persona", &simulation.client_persona)?)
        .bind(&simulation.context)
        .bind(&simulation.goal)
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;

        Simulation::try_from(record)
    }

    async fn get_simulation(&self, simulation_id: Uuid, user_id: Uuid) -> CoreResult<Simulation> {
        sqlx::query_as::<_, SimulationRecord>(concat!(
            "SELECT ",
            simulation_columns!(),
            " FROM simulations WHERE id = $1 AND user_id = $2"
        ))
        .bind(simulation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?
        .ok_or_else(|| CoreError::NotFound(format!("simulation {simulation_id}")))
        .and_then(Simulation::try_from)
    }

    async fn append_transcript_message(
        &self,
        simulation_id: Uuid,
        user_id: Uuid,
        message: TranscriptMessage,
    ) -> CoreResult<()> {
        let updated = sqlx::query(concat!(
            "UPDATE simulations SET transcript = ",
            native_json!("transcript"),
            " || $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND completed = FALSE"
        ))
        .bind(simulation_id)
        .bind(user_id)
        .bind(to_json("transcript message", &[message])?)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        if updated.rows_affected() == 0 {
            return Err(self.inactive_simulation(simulation_id, user_id).await);
        }
        Ok(())
    }

    async fn finish_simulation(
        &self,
        simulation_id: Uuid,
        user_id: Uuid,
        closing_message: Option<TranscriptMessage>,
        result: SimulationResult,
    ) -> CoreResult<()> {
        let closing: Vec<TranscriptMessage> = closing_message.into_iter().collect();
        let scores = result.scores;

        let updated = sqlx::query(concat!(
            "UPDATE simulations SET transcript = ",
            native_json!("transcript"),
            " || $3, completed = TRUE, outcome = $4, score_overall = $5, score_discovery = $6, \
             score_qualification = $7, score_objection_handling = $8, score_closing = $9, \
             ai_feedback = $10, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND completed = FALSE"
        ))
        .bind(simulation_id)
        .bind(user_id)
        .bind(to_json("transcript message", &closing)?)
        .bind(to_json("outcome", &result.outcome)?)
        .bind(i16::from(scores.overall))
        .bind(i16::from(scores.discovery))
        .bind(i16::from(scores.qualification))
        .bind(i16::from(scores.objection_handling))
        .bind(i16::from(scores.closing))
        .bind(to_json("ai_feedback", &result.feedback)?)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        if updated.rows_affected() == 0 {
            return Err(self.inactive_simulation(simulation_id, user_id).await);
        }
        Ok(())
    }
}
