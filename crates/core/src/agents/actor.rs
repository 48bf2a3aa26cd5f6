//! The simulated client.

use schemars::schema_for;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{CoreError, CoreResult};
use crate::generation::Generator;
use crate::llm_client::{ChatRole, ChatTurn, LLMReply, ToolRequest, ToolSpec};
use crate::prompts::{PromptBook, PromptKey};
use crate::simulation::{
    Channel, ClientPersona, Difficulty, EndSimulation, MessageRole, TranscriptMessage,
};

use super::temperature;

pub const END_SIMULATION_TOOL: &str = "endSimulation";

const NO_CONTEXT: &str = "No specific context provided.";

/// A control signal the Actor emitted alongside (or instead of) its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    EndSimulation(EndSimulation),
}

/// One Actor turn. Text and signals are independent of each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorReply {
    pub text: Option<String>,
    pub signals: Vec<ToolInvocation>,
}

impl ActorReply {
    /// The first end signal, if the Actor decided the conversation is over.
    pub fn end_signal(&self) -> Option<&EndSimulation> {
        self.signals.iter().find_map(|signal| match signal {
            ToolInvocation::EndSimulation(end) => Some(end),
        })
    }

    fn from_llm(reply: LLMReply) -> CoreResult<Self> {
        let text = reply
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let mut signals = Vec::new();
        for call in reply.tool_calls {
            if call.name == END_SIMULATION_TOOL {
                let end: EndSimulation = serde_json::from_str(&call.arguments).map_err(|e| {
                    CoreError::invalid_output(format!("malformed {END_SIMULATION_TOOL} call: {e}"))
                })?;
                signals.push(ToolInvocation::EndSimulation(end));
            } else {
                warn!(tool = %call.name, "Ignoring unknown tool call from actor");
            }
        }

        Ok(Self { text, signals })
    }
}

pub struct ActorAgent {
    generator: Generator,
    prompts: Arc<PromptBook>,
}

impl ActorAgent {
    pub fn new(generator: Generator, prompts: Arc<PromptBook>) -> Self {
        Self { generator, prompts }
    }

    fn end_simulation_tool() -> CoreResult<ToolSpec> {
        let mut parameters = serde_json::to_value(schema_for!(EndSimulation))
            .map_err(|e| CoreError::Generation(format!("endSimulation schema: {e}")))?;
        if let Some(object) = parameters.as_object_mut() {
            object.remove("$schema");
            object.remove("title");
        }
        Ok(ToolSpec {
            name: END_SIMULATION_TOOL.to_string(),
            description: "Ends the simulation when the conversation reaches a natural conclusion (success or failure).".to_string(),
            parameters,
        })
    }

    fn system_prompt(
        &self,
        persona: &ClientPersona,
        difficulty: Difficulty,
        channel: Channel,
        context: Option<&str>,
    ) -> CoreResult<String> {
        let personality = persona.personality.to_string();
        let pain_level = persona.pain_level.to_string();
        let objections = persona.objections.join(", ");
        let difficulty = difficulty.to_string();
        let channel = channel.to_string();
        let decision_maker = if persona.decision_maker { "Yes" } else { "No" };

        self.prompts.render(
            PromptKey::ActorSystem,
            &[
                ("name", persona.name.as_str()),
                ("role", persona.role.as_str()),
                ("company", persona.company.as_str()),
                ("personality", personality.as_str()),
                ("pain_level", pain_level.as_str()),
                ("decision_maker", decision_maker),
                ("objections", objections.as_str()),
                ("context", context.unwrap_or(NO_CONTEXT)),
                ("difficulty", difficulty.as_str()),
                ("channel", channel.as_str()),
            ],
        )
    }

    /// Produces the client's next turn given the full persisted transcript.
    #[instrument(skip(self, persona, history, context), fields(persona = %persona.name, turns = history.len()))]
    pub async fn generate_response(
        &self,
        persona: &ClientPersona,
        history: &[TranscriptMessage],
        difficulty: Difficulty,
        channel: Channel,
        context: Option<&str>,
    ) -> CoreResult<ActorReply> {
        let request = ToolRequest {
            system: self.system_prompt(persona, difficulty, channel, context)?,
            history: history
                .iter()
                .map(|m| ChatTurn {
                    role: match m.role {
                        MessageRole::User => ChatRole::User,
                        MessageRole::Client => ChatRole::Assistant,
                    },
                    content: m.content.clone(),
                })
                .collect(),
            tools: vec![Self::end_simulation_tool()?],
            temperature: temperature::ACTOR,
        };

        let reply = ActorReply::from_llm(self.generator.converse(request).await?)?;
        debug!(
            has_text = reply.text.is_some(),
            signals = reply.signals.len(),
            "Actor replied"
        );
        Ok(reply)
    }
}
