//! The generative agents of a training session.
//!
//! The Architect designs syllabi, the Producer fills modules with content, the
//! Actor plays the client in a simulation and the Analyst scores the result.
//! Each agent owns a [`Generator`](crate::generation::Generator) bound to the
//! provider its role resolves to, plus the shared prompt book.

pub mod actor;
pub mod analyst;
pub mod architect;
pub mod producer;

use std::sync::Arc;
use std::time::Duration;

use crate::generation::Generator;
use crate::llm_client::LLMClient;
use crate::prompts::PromptBook;
use crate::resolver::{AgentRole, ModelResolver};

pub use actor::{ActorAgent, ActorReply, ToolInvocation};
pub use analyst::AnalystAgent;
pub use architect::{ArchitectAgent, ModuleMix};
pub use producer::ProducerAgent;

/// Sampling temperatures, per agent.
pub mod temperature {
    pub const ARCHITECT: f32 = 0.7;
    pub const PRODUCER: f32 = 0.8;
    pub const ACTOR: f32 = 0.7;
    pub const ANALYST: f32 = 0.3;
}

/// The four agents of a deployment, wired to their providers.
pub struct Agents {
    pub architect: ArchitectAgent,
    pub producer: Arc<ProducerAgent>,
    pub actor: ActorAgent,
    pub analyst: AnalystAgent,
}

impl Agents {
    /// The Actor talks to `actor_client`; every other agent uses `passive_client`.
    pub fn new(
        actor_client: Arc<dyn LLMClient>,
        passive_client: Arc<dyn LLMClient>,
        prompts: Arc<PromptBook>,
        timeout: Duration,
    ) -> Self {
        let passive = Generator::new(passive_client, timeout);
        Self {
            architect: ArchitectAgent::new(passive.clone(), prompts.clone()),
            producer: Arc::new(ProducerAgent::new(passive.clone(), prompts.clone())),
            actor: ActorAgent::new(Generator::new(actor_client, timeout), prompts.clone()),
            analyst: AnalystAgent::new(passive, prompts),
        }
    }

    pub fn from_resolver(
        resolver: &ModelResolver,
        prompts: Arc<PromptBook>,
        timeout: Duration,
    ) -> Self {
        Self::new(
            resolver.client_for(AgentRole::Actor),
            resolver.client_for(AgentRole::Passive),
            prompts,
            timeout,
        )
    }
}
