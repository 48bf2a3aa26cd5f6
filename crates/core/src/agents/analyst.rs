//! Post-hoc scoring of a finished simulation.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{CoreError, CoreResult};
use crate::generation::{Generator, StructuredOutput};
use crate::prompts::{PromptBook, PromptKey};
use crate::simulation::{
    Channel, ClientPersona, MessageRole, SimulationAnalysis, TranscriptMessage,
};

use super::temperature;

const MAX_SCORE: u8 = 100;

fn check_len(field: &str, items: &[String], expected: usize) -> CoreResult<()> {
    if items.len() != expected {
        return Err(CoreError::invalid_output(format!(
            "{field} has {} entries, expected exactly {expected}",
            items.len()
        )));
    }
    Ok(())
}

impl StructuredOutput for SimulationAnalysis {
    const NAME: &'static str = "SimulationAnalysis";

    fn validate(&self) -> CoreResult<()> {
        let scores = [
            ("overall_score", self.overall_score),
            ("discovery_score", self.discovery_score),
            ("qualification_score", self.qualification_score),
            ("objection_handling_score", self.objection_handling_score),
            ("closing_score", self.closing_score),
        ];
        let detailed = self.detailed_scores.values();
        if let Some((field, score)) = scores
            .into_iter()
            .chain(detailed.into_iter().map(|s| ("detailed_scores", s)))
            .find(|(_, score)| *score > MAX_SCORE)
        {
            return Err(CoreError::invalid_output(format!(
                "{field} is {score}, expected 0 to {MAX_SCORE}"
            )));
        }

        check_len("strengths", &self.strengths, 2)?;
        check_len("weaknesses", &self.weaknesses, 2)?;
        check_len("next_steps", &self.next_steps, 3)?;
        Ok(())
    }
}

/// Renders a transcript the way a coach would read it.
pub fn format_transcript(transcript: &[TranscriptMessage]) -> String {
    transcript
        .iter()
        .map(|m| {
            let speaker = match m.role {
                MessageRole::User => "Salesperson",
                MessageRole::Client => "Client",
            };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct AnalystAgent {
    generator: Generator,
    prompts: Arc<PromptBook>,
}

impl AnalystAgent {
    pub fn new(generator: Generator, prompts: Arc<PromptBook>) -> Self {
        Self { generator, prompts }
    }

    #[instrument(skip(self, transcript, persona), fields(turns = transcript.len()))]
    pub async fn analyze_simulation(
        &self,
        transcript: &[TranscriptMessage],
        persona: &ClientPersona,
        channel: Channel,
    ) -> CoreResult<SimulationAnalysis> {
        let channel = channel.to_string();
        let personality = persona.personality.to_string();
        let pain_level = persona.pain_level.to_string();
        let formatted = format_transcript(transcript);

        let instruction = self.prompts.render(
            PromptKey::Analyst,
            &[
                ("channel", channel.as_str()),
                ("client_name", persona.name.as_str()),
                ("client_role", persona.role.as_str()),
                ("personality", personality.as_str()),
                ("pain_level", pain_level.as_str()),
                ("transcript", formatted.as_str()),
            ],
        )?;

        let analysis: SimulationAnalysis = self
            .generator
            .generate(instruction, temperature::ANALYST)
            .await?;
        info!(overall = analysis.overall_score, "Simulation analyzed");
        Ok(analysis)
    }
}
