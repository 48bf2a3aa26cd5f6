//! Per-module learning content, either authored statically or produced on demand.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::simulation::{Channel, ClientPersona};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Hook {
    /// One provocative sentence that grabs attention.
    pub text: String,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Story {
    pub context: String,
    pub problem: String,
    pub solution: String,
    /// Name of the story's protagonist.
    pub character: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Versus {
    pub wrong_way: String,
    pub right_way: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct InteractiveChallenge {
    pub question: String,
    #[schemars(length(min = 2))]
    pub options: Vec<String>,
    /// Zero-based index into `options`.
    pub correct_option_index: usize,
}

/// A micro-learning story generated for a theory module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StoryContent {
    pub title: String,
    pub emoji: String,
    pub hook: Hook,
    pub story: Story,
    pub versus: Versus,
    pub interactive_challenge: InteractiveChallenge,
    pub key_takeaway: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ObjectionType {
    Price,
    Timing,
    Authority,
    Need,
    Trust,
    Competition,
}

impl fmt::Display for ObjectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectionType::Price => "price",
            ObjectionType::Timing => "timing",
            ObjectionType::Authority => "authority",
            ObjectionType::Need => "need",
            ObjectionType::Trust => "trust",
            ObjectionType::Competition => "competition",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DrillDifficulty {
    Easy,
    Medium,
    Hard,
}

/// A single objection to rehearse a response to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DrillContent {
    /// The objection exactly as the client would say it.
    pub objection_text: String,
    pub objection_type: ObjectionType,
    pub ideal_response: String,
    pub difficulty: DrillDifficulty,
}

/// Persona plus framing for a roleplay module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SimulationScenario {
    pub client_persona: ClientPersona,
    /// Situation brief for the learner.
    pub context: String,
    /// What the learner should achieve in the conversation.
    pub goal: String,
}

/// Hand-authored theory used by standard tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TheoryLesson {
    pub title: String,
    pub concept_explanation: String,
    pub real_world_example: String,
    pub key_takeaways: Vec<String>,
}

/// Content attached to a syllabus module, tagged by `kind` when stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleContent {
    Story(StoryContent),
    Drill(DrillContent),
    Lesson(TheoryLesson),
    Simulation {
        scenario: SimulationScenario,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel: Option<Channel>,
    },
}

impl ModuleContent {
    pub fn is_simulation(&self) -> bool {
        matches!(self, ModuleContent::Simulation { .. })
    }
}
