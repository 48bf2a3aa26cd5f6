//! Syllabus design.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{CoreError, CoreResult};
use crate::generation::{Generator, StructuredOutput};
use crate::profile::{ExperienceLevel, TrainingGoal};
use crate::prompts::{PromptBook, PromptKey};
use crate::syllabus::{MAX_MODULES, MIN_MODULES, Syllabus};

use super::temperature;

impl StructuredOutput for Syllabus {
    const NAME: &'static str = "Syllabus";

    fn validate(&self) -> CoreResult<()> {
        let count = self.modules.len();
        if !(MIN_MODULES..=MAX_MODULES).contains(&count) {
            return Err(CoreError::invalid_output(format!(
                "syllabus has {count} modules, expected {MIN_MODULES} to {MAX_MODULES}"
            )));
        }
        if let Some((i, _)) = self
            .modules
            .iter()
            .enumerate()
            .find(|(_, m)| m.title.trim().is_empty())
        {
            return Err(CoreError::invalid_output(format!("module {i} has no title")));
        }
        Ok(())
    }
}

/// Share of theory modules a syllabus should carry for an experience level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleMix {
    pub theory_ratio: f64,
}

impl ModuleMix {
    /// Largest accepted distance from the target theory count.
    pub const TOLERANCE: usize = 1;

    pub fn for_level(level: ExperienceLevel) -> Self {
        let theory_ratio = match level {
            ExperienceLevel::Junior => 0.6,
            ExperienceLevel::Mid => 0.3,
            ExperienceLevel::Senior => 0.1,
        };
        Self { theory_ratio }
    }

    /// Expected number of theory modules in a syllabus of `module_count` modules.
    pub fn target_theory(&self, module_count: usize) -> usize {
        (self.theory_ratio * module_count as f64).round() as usize
    }

    /// One line per allowed syllabus length, for the prompt.
    pub fn describe_targets(&self) -> String {
        (MIN_MODULES..=MAX_MODULES)
            .map(|n| format!("- {n} modules: exactly {} theory", self.target_theory(n)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn check(&self, syllabus: &Syllabus) -> CoreResult<()> {
        let total = syllabus.modules.len();
        let target = self.target_theory(total);
        let actual = syllabus.theory_count();
        if actual.abs_diff(target) > Self::TOLERANCE {
            return Err(CoreError::invalid_output(format!(
                "syllabus has {actual} theory modules out of {total}, expected about {target}"
            )));
        }
        Ok(())
    }
}

pub struct ArchitectAgent {
    generator: Generator,
    prompts: Arc<PromptBook>,
}

impl ArchitectAgent {
    pub fn new(generator: Generator, prompts: Arc<PromptBook>) -> Self {
        Self { generator, prompts }
    }

    /// Designs a syllabus whose module mix matches the learner's experience.
    #[instrument(skip(self))]
    pub async fn generate_syllabus(
        &self,
        experience_level: ExperienceLevel,
        training_goal: Option<TrainingGoal>,
        industry: &str,
    ) -> CoreResult<Syllabus> {
        let mix = ModuleMix::for_level(experience_level);
        let level = experience_level.to_string();
        let goal = training_goal.map_or_else(|| "not specified".to_string(), |g| g.to_string());
        let targets = mix.describe_targets();

        let instruction = self.prompts.render(
            PromptKey::Architect,
            &[
                ("experience_level", level.as_str()),
                ("training_goal", goal.as_str()),
                ("industry", industry),
                ("theory_targets", targets.as_str()),
            ],
        )?;

        let syllabus: Syllabus = self
            .generator
            .generate(instruction, temperature::ARCHITECT)
            .await?;
        mix.check(&syllabus)?;

        info!(
            modules = syllabus.modules.len(),
            theory = syllabus.theory_count(),
            "Syllabus generated"
        );
        Ok(syllabus)
    }
}
