use anyhow::{Context, Result, anyhow};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
        CreateChatCompletionRequestArgs, FunctionObjectArgs, ResponseFormat,
        ResponseFormatJsonSchema,
    },
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One prior turn of a conversation, already mapped to model roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// A function the model may call, described by a JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool call exactly as the model emitted it; `arguments` is unparsed JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToolCall {
    pub name: String,
    pub arguments: String,
}

/// Text and tool calls from one freeform completion. Either may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LLMReply {
    pub text: Option<String>,
    pub tool_calls: Vec<RawToolCall>,
}

/// A request for a single JSON document conforming to `schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRequest {
    pub schema_name: String,
    pub schema: Value,
    pub instruction: String,
    pub temperature: f32,
}

/// A conversational request that may be answered with text, tool calls or both.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub system: String,
    pub history: Vec<ChatTurn>,
    pub tools: Vec<ToolSpec>,
    pub temperature: f32,
}

/// A generic client for interacting with an LLM.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Returns the raw JSON text the model produced for a schema-constrained request.
    async fn complete_structured(&self, request: StructuredRequest) -> Result<String>;

    /// Runs one conversational turn with the given tools available.
    async fn complete_with_tools(&self, request: ToolRequest) -> Result<LLMReply>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions (e.g., "gpt-4-turbo").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn history_messages(history: Vec<ChatTurn>) -> Result<Vec<ChatCompletionRequestMessage>> {
        history
            .into_iter()
            .map(|turn| {
                let message = match turn.role {
                    ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                        .content(turn.content)
                        .build()?
                        .into(),
                    ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                        .content(turn.content)
                        .build()?
                        .into(),
                };
                Ok(message)
            })
            .collect()
    }

    fn tools(specs: Vec<ToolSpec>) -> Result<Vec<ChatCompletionTool>> {
        specs
            .into_iter()
            .map(|spec| {
                let function = FunctionObjectArgs::default()
                    .name(spec.name)
                    .description(spec.description)
                    .parameters(spec.parameters)
                    .build()?;
                Ok(ChatCompletionToolArgs::default()
                    .r#type(ChatCompletionToolType::Function)
                    .function(function)
                    .build()?)
            })
            .collect()
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn complete_structured(&self, request: StructuredRequest) -> Result<String> {
        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: None,
                name: request.schema_name,
                schema: Some(request.schema),
                strict: Some(false),
            },
        };

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(request.temperature)
            .response_format(response_format)
            .messages(vec![
                ChatCompletionRequestUserMessageArgs::default()
                    .content(request.instruction)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(chat_request).await?;

        let content = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .clone()
            .context("No content in LLM response")?;

        Ok(content)
    }

    async fn complete_with_tools(&self, request: ToolRequest) -> Result<LLMReply> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(request.system)
                    .build()?
                    .into(),
            ];
        messages.extend(Self::history_messages(request.history)?);

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .temperature(request.temperature)
            .messages(messages);
        if !request.tools.is_empty() {
            builder.tools(Self::tools(request.tools)?);
        }
        let chat_request = builder.build()?;

        let response = self.client.chat().create(chat_request).await?;
        let message = &response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message;

        let tool_calls = message
            .tool_calls
            .iter()
            .flatten()
            .map(|call| RawToolCall {
                name: call.function.name.clone(),
                arguments: call.function.arguments.clone(),
            })
            .collect();

        Ok(LLMReply {
            text: message.content.clone(),
            tool_calls,
        })
    }
}

/// One queued answer for [`ScriptedLLMClient`].
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Structured(String),
    Tools(LLMReply),
    Failure(String),
    /// Never answers; used to exercise generation deadlines.
    Stall,
}

/// A deterministic `LLMClient` that replays queued replies in order.
///
/// Used for development and lifecycle testing without provider access. Every
/// request is recorded so callers can assert on what the agents sent.
#[derive(Default)]
pub struct ScriptedLLMClient {
    replies: Mutex<VecDeque<ScriptedReply>>,
    structured_requests: Mutex<Vec<StructuredRequest>>,
    tool_requests: Mutex<Vec<ToolRequest>>,
}

impl ScriptedLLMClient {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn push(&self, reply: ScriptedReply) {
        lock(&self.replies).push_back(reply);
    }

    pub fn structured_requests(&self) -> Vec<StructuredRequest> {
        lock(&self.structured_requests).clone()
    }

    pub fn tool_requests(&self) -> Vec<ToolRequest> {
        lock(&self.tool_requests).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }

    fn next_reply(&self) -> Result<ScriptedReply> {
        lock(&self.replies)
            .pop_front()
            .ok_or_else(|| anyhow!("Scripted LLM client has no replies left"))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LLMClient for ScriptedLLMClient {
    async fn complete_structured(&self, request: StructuredRequest) -> Result<String> {
        lock(&self.structured_requests).push(request);
        match self.next_reply()? {
            ScriptedReply::Structured(json) => Ok(json),
            ScriptedReply::Failure(message) => Err(anyhow!(message)),
            ScriptedReply::Stall => std::future::pending().await,
            ScriptedReply::Tools(_) => Err(anyhow!(
                "Scripted LLM client expected a structured request, got a tool request"
            )),
        }
    }

    async fn complete_with_tools(&self, request: ToolRequest) -> Result<LLMReply> {
        lock(&self.tool_requests).push(request);
        match self.next_reply()? {
            ScriptedReply::Tools(reply) => Ok(reply),
            ScriptedReply::Failure(message) => Err(anyhow!(message)),
            ScriptedReply::Stall => std::future::pending().await,
            ScriptedReply::Structured(_) => Err(anyhow!(
                "Scripted LLM client expected a tool request, got a structured request"
            )),
        }
    }
}
