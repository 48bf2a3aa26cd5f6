//! Simulation records: the frozen client persona, the append-only transcript
//! and the all-or-nothing scoring result.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Whatsapp,
    Email,
    Phone,
    F2f,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Whatsapp => write!(f, "whatsapp"),
            Channel::Email => write!(f, "email"),
            Channel::Phone => write!(f, "phone"),
            Channel::F2f => write!(f, "f2f"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Extreme,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
            Difficulty::Extreme => write!(f, "extreme"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    Analytical,
    Driver,
    Amiable,
    Expressive,
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Personality::Analytical => write!(f, "analytical"),
            Personality::Driver => write!(f, "driver"),
            Personality::Amiable => write!(f, "amiable"),
            Personality::Expressive => write!(f, "expressive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PainLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for PainLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PainLevel::Low => write!(f, "low"),
            PainLevel::Medium => write!(f, "medium"),
            PainLevel::High => write!(f, "high"),
        }
    }
}

/// The character sheet the Actor plays. Frozen for the simulation's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClientPersona {
    pub name: String,
    /// Role of the client, e.g. "Undecided buyer" or "Operations director".
    pub role: String,
    /// Company or household the client belongs to ("N/A" for walk-in customers).
    pub company: String,
    pub personality: Personality,
    pub pain_level: PainLevel,
    /// Objections the client may raise when the conversation makes them relevant.
    pub objections: Vec<String>,
    pub decision_maker: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Client,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Client => write!(f, "client"),
        }
    }
}

/// One line of a simulation transcript. `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: i64,
}

impl TranscriptMessage {
    /// Builds the next message for `transcript`, keeping timestamps non-decreasing
    /// even if the wall clock stepped backwards.
    pub fn next(
        transcript: &[TranscriptMessage],
        role: MessageRole,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let floor = transcript.last().map(|m| m.timestamp).unwrap_or(i64::MIN);
        Self {
            role,
            content: content.into(),
            timestamp: now.timestamp_millis().max(floor),
        }
    }
}

/// How a simulation ended, as classified by the Actor's end signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SimulationOutcome {
    DealWon,
    DealLost,
    Hangup,
}

impl fmt::Display for SimulationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationOutcome::DealWon => write!(f, "deal_won"),
            SimulationOutcome::DealLost => write!(f, "deal_lost"),
            SimulationOutcome::Hangup => write!(f, "hangup"),
        }
    }
}

/// Arguments of the `endSimulation` tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EndSimulation {
    /// Why the conversation is over, e.g. "The salesperson closed the deal".
    pub reason: String,
    /// The final outcome of the interaction.
    pub outcome: SimulationOutcome,
    /// A brief hint for the learner on what went right or wrong.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_hint: Option<String>,
}

/// Sub-skill breakdown produced by the Analyst. Every score is within 0..=100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DetailedScores {
    #[schemars(range(min = 0, max = 100))]
    pub rapport_building: u8,
    #[schemars(range(min = 0, max = 100))]
    pub question_quality: u8,
    #[schemars(range(min = 0, max = 100))]
    pub active_listening: u8,
    #[schemars(range(min = 0, max = 100))]
    pub objection_handling: u8,
    #[schemars(range(min = 0, max = 100))]
    pub closing_technique: u8,
}

impl DetailedScores {
    pub fn values(&self) -> [u8; 5] {
        [
            self.rapport_building,
            self.question_quality,
            self.active_listening,
            self.objection_handling,
            self.closing_technique,
        ]
    }
}

/// The Analyst's raw output for one finished simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SimulationAnalysis {
    /// Weighted overall score.
    #[schemars(range(min = 0, max = 100))]
    pub overall_score: u8,
    /// Quality of needs discovery.
    #[schemars(range(min = 0, max = 100))]
    pub discovery_score: u8,
    /// Quality of prospect qualification (budget, authority, timing).
    #[schemars(range(min = 0, max = 100))]
    pub qualification_score: u8,
    #[schemars(range(min = 0, max = 100))]
    pub objection_handling_score: u8,
    #[schemars(range(min = 0, max = 100))]
    pub closing_score: u8,
    /// Two to three sentence summary of the performance.
    pub overall_summary: String,
    /// Exactly two specific strengths.
    #[schemars(length(min = 2, max = 2))]
    pub strengths: Vec<String>,
    /// Exactly two specific weaknesses.
    #[schemars(length(min = 2, max = 2))]
    pub weaknesses: Vec<String>,
    /// Exactly three concrete next steps.
    #[schemars(length(min = 3, max = 3))]
    pub next_steps: Vec<String>,
    pub detailed_scores: DetailedScores,
}

/// Top-level scores persisted on a completed simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationScores {
    pub overall: u8,
    pub discovery: u8,
    pub qualification: u8,
    pub objection_handling: u8,
    pub closing: u8,
}

/// Qualitative feedback persisted on a completed simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AIFeedback {
    pub overall_summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub next_steps: Vec<String>,
    pub detailed_scores: DetailedScores,
}

/// Everything a simulation gains when it ends. Present as a whole or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub outcome: EndSimulation,
    pub scores: SimulationScores,
    pub feedback: AIFeedback,
}

impl SimulationResult {
    pub fn new(outcome: EndSimulation, analysis: SimulationAnalysis) -> Self {
        Self {
            outcome,
            scores: SimulationScores {
                overall: analysis.overall_score,
                discovery: analysis.discovery_score,
                qualification: analysis.qualification_score,
                objection_handling: analysis.objection_handling_score,
                closing: analysis.closing_score,
            },
            feedback: AIFeedback {
                overall_summary: analysis.overall_summary,
                strengths: analysis.strengths,
                weaknesses: analysis.weaknesses,
                next_steps: analysis.next_steps,
                detailed_scores: analysis.detailed_scores,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Active,
    Ended,
}

/// A roleplay conversation between a learner and a simulated client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub id: Uuid,
    pub user_id: Uuid,
    /// `None` for free-practice simulations.
    pub path_id: Option<Uuid>,
    pub channel: Channel,
    pub difficulty: Difficulty,
    pub client_persona: ClientPersona,
    pub context: Option<String>,
    pub goal: Option<String>,
    pub transcript: Vec<TranscriptMessage>,
    /// Set exactly once, when the simulation ends.
    pub result: Option<SimulationResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Simulation {
    pub fn state(&self) -> SimulationState {
        if self.result.is_some() {
            SimulationState::Ended
        } else {
            SimulationState::Active
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state() == SimulationState::Ended
    }
}

/// The fields needed to create a simulation; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSimulation {
    pub user_id: Uuid,
    pub path_id: Option<Uuid>,
    pub channel: Channel,
    pub difficulty: Difficulty,
    pub client_persona: ClientPersona,
    pub context: Option<String>,
    pub goal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_next_message_never_goes_back_in_time() {
        let later = Utc.timestamp_millis_opt(2_000).unwrap();
        let earlier = Utc.timestamp_millis_opt(1_000).unwrap();

        let first = TranscriptMessage::next(&[], MessageRole::User, "Hola", later);
        assert_eq!(first.timestamp, 2_000);

        let second = TranscriptMessage::next(
            std::slice::from_ref(&first),
            MessageRole::Client,
            "Buenas",
            earlier,
        );
        assert_eq!(second.timestamp, 2_000);
        assert_eq!(second.role, MessageRole::Client);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_value(Channel::F2f).unwrap(), json!("f2f"));
        assert_eq!(
            serde_json::to_value(SimulationOutcome::DealWon).unwrap(),
            json!("deal_won")
        );
        assert_eq!(serde_json::to_value(MessageRole::Client).unwrap(), json!("client"));
        assert_eq!(Difficulty::Extreme.to_string(), "extreme");
    }

    #[test]
    fn test_persona_rejects_unknown_fields() {
        let persona = json!({
            "name": "Laura",
            "role": "Casual shopper",
            "company": "N/A",
            "personality": "amiable",
            "pain_level": "low",
            "objections": ["Just looking"],
            "decision_maker": true,
            "mood": "happy"
        });
        assert!(serde_json::from_value::<ClientPersona>(persona).is_err());
    }

    #[test]
    fn test_end_simulation_hint_is_optional() {
        let end: EndSimulation =
            serde_json::from_value(json!({ "reason": "Bought it", "outcome": "deal_won" }))
                .unwrap();
        assert_eq!(end.outcome, SimulationOutcome::DealWon);
        assert!(end.feedback_hint.is_none());
    }
}
