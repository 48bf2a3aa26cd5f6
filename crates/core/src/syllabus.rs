//! Syllabi, learning paths and the module-progress state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::content::ModuleContent;
use crate::error::{CoreError, CoreResult};
use crate::simulation::Difficulty;

/// Smallest and largest syllabus the Architect may produce.
pub const MIN_MODULES: usize = 4;
pub const MAX_MODULES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Theory,
    Drill,
    Simulation,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Theory => write!(f, "theory"),
            ContentType::Drill => write!(f, "drill"),
            ContentType::Simulation => write!(f, "simulation"),
        }
    }
}

/// One unit of a syllabus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SyllabusModule {
    pub title: String,
    pub description: String,
    /// Ordered learning objectives.
    pub objectives: Vec<String>,
    #[schemars(range(min = 1))]
    pub duration_minutes: u32,
    pub content_type: ContentType,
    /// Narrower topic the module's generated content should focus on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub content: Option<ModuleContent>,
    #[serde(default)]
    #[schemars(skip)]
    pub completed: bool,
}

impl SyllabusModule {
    /// The topic generated content should be about.
    pub fn topic(&self) -> &str {
        self.focus_topic.as_deref().unwrap_or(&self.title)
    }
}

/// The Architect's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Syllabus {
    pub title: String,
    pub description: String,
    #[schemars(length(min = 4, max = 6))]
    pub modules: Vec<SyllabusModule>,
}

impl Syllabus {
    pub fn theory_count(&self) -> usize {
        self.modules
            .iter()
            .filter(|m| m.content_type == ContentType::Theory)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    Standard,
    AiGenerated,
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackType::Standard => write!(f, "standard"),
            TrackType::AiGenerated => write!(f, "ai_generated"),
        }
    }
}

/// A pre-authored track that learners clone into their own learning path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardTrack {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub industry: String,
    pub difficulty: Difficulty,
    pub syllabus_template: Vec<SyllabusModule>,
    pub is_active: bool,
}

/// The fields needed to create a learning path; the store assigns the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLearningPath {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub track_type: TrackType,
    pub source_track_id: Option<Uuid>,
    pub industry: Option<String>,
    pub modules: Vec<SyllabusModule>,
}

impl NewLearningPath {
    pub fn from_syllabus(user_id: Uuid, industry: Option<String>, syllabus: Syllabus) -> Self {
        Self {
            user_id,
            title: syllabus.title,
            description: Some(syllabus.description),
            track_type: TrackType::AiGenerated,
            source_track_id: None,
            industry,
            modules: syllabus.modules,
        }
    }

    pub fn from_track(user_id: Uuid, track: &StandardTrack) -> Self {
        Self {
            user_id,
            title: track.title.clone(),
            description: track.description.clone(),
            track_type: TrackType::Standard,
            source_track_id: Some(track.id),
            industry: Some(track.industry.clone()),
            modules: track.syllabus_template.clone(),
        }
    }
}

/// A learner's personal copy of a syllabus and their progress through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub track_type: TrackType,
    pub source_track_id: Option<Uuid>,
    pub industry: Option<String>,
    pub modules: Vec<SyllabusModule>,
    pub current_module_index: usize,
    pub total_modules: usize,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What completing a module would do to a path, decided without touching storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPlan {
    /// The module was already completed; nothing changes.
    AlreadyCompleted,
    Advance {
        expected_index: usize,
        new_index: usize,
        track_complete: bool,
        content_type: ContentType,
    },
}

/// The caller-facing result of completing a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleCompletion {
    pub next_module_index: Option<usize>,
    pub is_track_complete: bool,
}

impl ModuleCompletion {
    pub fn at(index: usize, total: usize) -> Self {
        let is_track_complete = index >= total;
        Self {
            next_module_index: (!is_track_complete).then_some(index),
            is_track_complete,
        }
    }
}

impl LearningPath {
    pub fn module(&self, index: usize) -> CoreResult<&SyllabusModule> {
        self.modules.get(index).ok_or_else(|| {
            CoreError::NotFound(format!(
                "module {index} of learning path {} ({} modules)",
                self.id, self.total_modules
            ))
        })
    }

    /// Decides how `index` may be completed.
    ///
    /// Only the module under the pointer advances the path. Modules behind it
    /// are idempotent no-ops, modules ahead of it are locked.
    pub fn plan_completion(&self, index: usize) -> CoreResult<CompletionPlan> {
        let module = self.module(index)?;
        let current = self.current_module_index;

        if index < current {
            return Ok(CompletionPlan::AlreadyCompleted);
        }
        if index > current {
            return Err(CoreError::ModuleLocked { index, current });
        }

        let new_index = (index + 1).min(self.total_modules);
        Ok(CompletionPlan::Advance {
            expected_index: current,
            new_index,
            track_complete: new_index >= self.total_modules,
            content_type: module.content_type,
        })
    }

    /// Indices of modules after the first that still need generated content.
    pub fn modules_to_prefetch(&self) -> Vec<usize> {
        self.modules
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, m)| m.content.is_none())
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn module(title: &str, content_type: ContentType) -> SyllabusModule {
        SyllabusModule {
            title: title.to_string(),
            description: format!("About {title}"),
            objectives: vec!["Practice".to_string()],
            duration_minutes: 10,
            content_type,
            focus_topic: None,
            content: None,
            completed: false,
        }
    }

    fn path(types: &[ContentType], current: usize) -> LearningPath {
        let modules: Vec<_> = types
            .iter()
            .enumerate()
            .map(|(i, t)| module(&format!("Module {i}"), *t))
            .collect();
        LearningPath {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Retail".to_string(),
            description: None,
            track_type: TrackType::AiGenerated,
            source_track_id: None,
            industry: Some("Retail".to_string()),
            total_modules: modules.len(),
            modules,
            current_module_index: current,
            completed: current == types.len(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_completion_advances_current_module() {
        let p = path(
            &[ContentType::Theory, ContentType::Simulation, ContentType::Drill],
            1,
        );
        assert_eq!(
            p.plan_completion(1).unwrap(),
            CompletionPlan::Advance {
                expected_index: 1,
                new_index: 2,
                track_complete: false,
                content_type: ContentType::Simulation,
            }
        );
    }

    #[test]
    fn test_plan_completion_of_last_module_completes_track() {
        let p = path(&[ContentType::Theory, ContentType::Theory], 1);
        assert!(matches!(
            p.plan_completion(1).unwrap(),
            CompletionPlan::Advance {
                new_index: 2,
                track_complete: true,
                ..
            }
        ));
    }

    #[test]
    fn test_plan_completion_edges() {
        let p = path(&[ContentType::Theory, ContentType::Theory, ContentType::Theory], 1);

        assert_eq!(p.plan_completion(0).unwrap(), CompletionPlan::AlreadyCompleted);
        assert!(matches!(
            p.plan_completion(2),
            Err(CoreError::ModuleLocked { index: 2, current: 1 })
        ));
        assert!(matches!(p.plan_completion(3), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_module_completion_at_end_has_no_next_index() {
        assert_eq!(
            ModuleCompletion::at(3, 3),
            ModuleCompletion {
                next_module_index: None,
                is_track_complete: true
            }
        );
        assert_eq!(ModuleCompletion::at(1, 3).next_module_index, Some(1));
    }

    #[test]
    fn test_prefetch_skips_first_and_static_modules() {
        let mut p = path(
            &[ContentType::Theory, ContentType::Theory, ContentType::Simulation],
            0,
        );
        p.modules[1].content = Some(ModuleContent::Lesson(crate::content::TheoryLesson {
            title: "Static".to_string(),
            concept_explanation: "c".to_string(),
            real_world_example: "e".to_string(),
            key_takeaways: vec![],
        }));
        assert_eq!(p.modules_to_prefetch(), vec![2]);
    }

    #[test]
    fn test_module_rejects_unknown_fields_and_defaults_flags() {
        let parsed: SyllabusModule = serde_json::from_value(json!({
            "title": "Opening",
            "description": "First contact",
            "objectives": ["Greet"],
            "duration_minutes": 5,
            "content_type": "theory"
        }))
        .unwrap();
        assert!(!parsed.completed);
        assert_eq!(parsed.topic(), "Opening");

        let err = serde_json::from_value::<SyllabusModule>(json!({
            "title": "Opening",
            "description": "First contact",
            "objectives": [],
            "duration_minutes": 5,
            "content_type": "quiz"
        }));
        assert!(err.is_err());
    }
}
