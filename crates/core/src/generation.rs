//! Deadline-bounded generation on top of an [`LLMClient`].
//!
//! Structured generation derives a JSON schema from the target type, asks the
//! model for a single document, parses it (unknown fields rejected by the type)
//! and runs the type's own validation. There is exactly one attempt; retrying
//! is the caller's decision.

use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::llm_client::{LLMClient, LLMReply, StructuredRequest, ToolRequest};

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// A type the model can be asked to produce.
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    /// Schema name sent to the provider.
    const NAME: &'static str;

    /// Checks the invariants a JSON schema cannot express.
    fn validate(&self) -> CoreResult<()> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct Generator {
    client: Arc<dyn LLMClient>,
    timeout: Duration,
}

impl Generator {
    pub fn new(client: Arc<dyn LLMClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Produces a validated `T` from `instruction`.
    pub async fn generate<T: StructuredOutput>(
        &self,
        instruction: String,
        temperature: f32,
    ) -> CoreResult<T> {
        let schema = serde_json::to_value(schema_for!(T))
            .map_err(|e| CoreError::Generation(format!("schema for {}: {e}", T::NAME)))?;
        let request = StructuredRequest {
            schema_name: T::NAME.to_string(),
            schema,
            instruction,
            temperature,
        };

        let raw = self
            .bounded(self.client.complete_structured(request))
            .await?;
        debug!(schema = T::NAME, bytes = raw.len(), "Structured output received");

        parse_structured(&raw)
    }

    /// Runs one freeform turn with tools.
    pub async fn converse(&self, request: ToolRequest) -> CoreResult<LLMReply> {
        self.bounded(self.client.complete_with_tools(request)).await
    }

    async fn bounded<F, T>(&self, call: F) -> CoreResult<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!(error = %e, "Generation provider call failed");
                Err(CoreError::Generation(e.to_string()))
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Generation call timed out");
                Err(CoreError::GenerationTimeout(self.timeout))
            }
        }
    }
}

/// Parses model output into `T` and validates it.
///
/// Tolerates a Markdown code fence around the document, which some
/// OpenAI-compatible providers add even in JSON mode.
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> CoreResult<T> {
    let value: T = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| CoreError::invalid_output(format!("{} did not parse: {e}", T::NAME)))?;
    value.validate()?;
    Ok(value)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.strip_prefix("json").unwrap_or(rest);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{MockLLMClient, ScriptedLLMClient, ScriptedReply};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct Pair {
        left: u8,
        right: u8,
    }

    impl StructuredOutput for Pair {
        const NAME: &'static str = "Pair";

        fn validate(&self) -> CoreResult<()> {
            if self.left > self.right {
                return Err(CoreError::invalid_output("left exceeds right"));
            }
            Ok(())
        }
    }

    fn generator(reply: ScriptedReply, timeout: Duration) -> Generator {
        Generator::new(Arc::new(ScriptedLLMClient::new([reply])), timeout)
    }

    #[tokio::test]
    async fn test_generate_parses_and_validates() {
        let g = generator(
            ScriptedReply::Structured("```json\n{\"left\":1,\"right\":2}\n```".to_string()),
            DEFAULT_GENERATION_TIMEOUT,
        );
        let pair: Pair = g.generate("make a pair".to_string(), 0.3).await.unwrap();
        assert_eq!(pair, Pair { left: 1, right: 2 });
    }

    #[tokio::test]
    async fn test_generate_rejects_unknown_fields_and_failed_validation() {
        let g = generator(
            ScriptedReply::Structured("{\"left\":1,\"right\":2,\"extra\":0}".to_string()),
            DEFAULT_GENERATION_TIMEOUT,
        );
        let err = g.generate::<Pair>("x".to_string(), 0.3).await.unwrap_err();
        assert!(matches!(err, CoreError::GenerationValidation(_)));

        let g = generator(
            ScriptedReply::Structured("{\"left\":3,\"right\":2}".to_string()),
            DEFAULT_GENERATION_TIMEOUT,
        );
        let err = g.generate::<Pair>("x".to_string(), 0.3).await.unwrap_err();
        assert!(matches!(err, CoreError::GenerationValidation(msg) if msg.contains("left")));
    }

    #[tokio::test]
    async fn test_generate_times_out() {
        let g = generator(ScriptedReply::Stall, Duration::from_millis(20));
        let err = g.generate::<Pair>("x".to_string(), 0.3).await.unwrap_err();
        assert!(matches!(err, CoreError::GenerationTimeout(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_is_generation_error() {
        let g = generator(
            ScriptedReply::Failure("401 invalid api key".to_string()),
            DEFAULT_GENERATION_TIMEOUT,
        );
        let err = g.generate::<Pair>("x".to_string(), 0.3).await.unwrap_err();
        assert!(matches!(err, CoreError::Generation(msg) if msg.contains("401")));
    }

    #[tokio::test]
    async fn test_generate_sends_schema_named_after_type() {
        let mut mock = MockLLMClient::new();
        mock.expect_complete_structured()
            .withf(|req| {
                req.schema_name == "Pair"
                    && req.schema["properties"]["left"].is_object()
                    && (req.temperature - 0.3).abs() < f32::EPSILON
            })
            .times(1)
            .returning(|_| Ok("{\"left\":0,\"right\":0}".to_string()));

        let g = Generator::new(Arc::new(mock), DEFAULT_GENERATION_TIMEOUT);
        assert!(g.generate::<Pair>("x".to_string(), 0.3).await.is_ok());
    }
}
