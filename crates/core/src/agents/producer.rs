//! Module content generation.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::content::{DrillContent, SimulationScenario, StoryContent};
use crate::error::{CoreError, CoreResult};
use crate::generation::{Generator, StructuredOutput};
use crate::profile::ExperienceLevel;
use crate::prompts::{PromptBook, PromptKey};
use crate::simulation::Difficulty;

use super::temperature;

impl StructuredOutput for StoryContent {
    const NAME: &'static str = "StoryContent";

    fn validate(&self) -> CoreResult<()> {
        let challenge = &self.interactive_challenge;
        let options = challenge.options.len();
        if options < 2 {
            return Err(CoreError::invalid_output(format!(
                "interactive challenge has {options} options, expected at least 2"
            )));
        }
        if challenge.correct_option_index >= options {
            return Err(CoreError::invalid_output(format!(
                "correct_option_index {} is out of range for {options} options",
                challenge.correct_option_index
            )));
        }
        Ok(())
    }
}

impl StructuredOutput for DrillContent {
    const NAME: &'static str = "DrillContent";

    fn validate(&self) -> CoreResult<()> {
        if self.objection_text.trim().is_empty() {
            return Err(CoreError::invalid_output("drill has an empty objection"));
        }
        Ok(())
    }
}

impl StructuredOutput for SimulationScenario {
    const NAME: &'static str = "SimulationScenario";

    fn validate(&self) -> CoreResult<()> {
        if self.client_persona.objections.is_empty() {
            return Err(CoreError::invalid_output(
                "client persona declares no objections",
            ));
        }
        Ok(())
    }
}

pub struct ProducerAgent {
    generator: Generator,
    prompts: Arc<PromptBook>,
}

impl ProducerAgent {
    pub fn new(generator: Generator, prompts: Arc<PromptBook>) -> Self {
        Self { generator, prompts }
    }

    #[instrument(skip(self))]
    pub async fn generate_theory(
        &self,
        module_title: &str,
        industry: &str,
        level: ExperienceLevel,
    ) -> CoreResult<StoryContent> {
        let level = level.to_string();
        let instruction = self.prompts.render(
            PromptKey::ProducerTheory,
            &[
                ("topic", module_title),
                ("industry", industry),
                ("level", level.as_str()),
            ],
        )?;
        let story: StoryContent = self
            .generator
            .generate(instruction, temperature::PRODUCER)
            .await?;
        info!(title = %story.title, "Theory story generated");
        Ok(story)
    }

    #[instrument(skip(self))]
    pub async fn generate_drill(&self, topic: &str, industry: &str) -> CoreResult<DrillContent> {
        let instruction = self.prompts.render(
            PromptKey::ProducerDrill,
            &[("topic", topic), ("industry", industry)],
        )?;
        let drill: DrillContent = self
            .generator
            .generate(instruction, temperature::PRODUCER)
            .await?;
        info!(objection_type = %drill.objection_type, "Drill generated");
        Ok(drill)
    }

    #[instrument(skip(self))]
    pub async fn generate_simulation_scenario(
        &self,
        topic: &str,
        industry: &str,
        difficulty: Difficulty,
    ) -> CoreResult<SimulationScenario> {
        let difficulty = difficulty.to_string();
        let instruction = self.prompts.render(
            PromptKey::ProducerScenario,
            &[
                ("topic", topic),
                ("industry", industry),
                ("difficulty", difficulty.as_str()),
            ],
        )?;
        let scenario: SimulationScenario = self
            .generator
            .generate(instruction, temperature::PRODUCER)
            .await?;
        info!(persona = %scenario.client_persona.name, "Simulation scenario generated");
        Ok(scenario)
    }
}
