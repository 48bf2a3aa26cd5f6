use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Self-reported seniority of a learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Junior,
    Mid,
    Senior,
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperienceLevel::Junior => write!(f, "junior"),
            ExperienceLevel::Mid => write!(f, "mid"),
            ExperienceLevel::Senior => write!(f, "senior"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrainingGoal {
    LearnProduct,
    ImproveSkill,
    MasterChannel,
    PreparePitch,
}

impl fmt::Display for TrainingGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingGoal::LearnProduct => write!(f, "learn_product"),
            TrainingGoal::ImproveSkill => write!(f, "improve_skill"),
            TrainingGoal::MasterChannel => write!(f, "master_channel"),
            TrainingGoal::PreparePitch => write!(f, "prepare_pitch"),
        }
    }
}

/// The learner a training session is personalized for.
///
/// Written by onboarding (outside this crate); the core only reads it, apart
/// from the best-effort `total_simulations` counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub user_id: Uuid,
    pub experience_level: ExperienceLevel,
    pub training_goal: Option<TrainingGoal>,
    pub industry: Option<String>,
    pub total_simulations: u32,
}
