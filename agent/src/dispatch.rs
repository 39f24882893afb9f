//! Tool selection, argument validation and execution for one conversation turn.
//!
//! ```text
//! Start → selection (completion with tools, choice=auto)
//!       ├─ no tool       → conversation unchanged
//!       └─ tool selected → lookup → argument validation → executor
//!                           ├─ unknown name       → UnknownTool
//!                           ├─ off-schema args    → InvalidArguments
//!                           └─ executor result    → system message + conversation
//!                              (executor errors included)
//! ```
//!
//! At most one tool runs per turn. When the model asks for several, only the
//! first call is honored.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::chat::{ChatMessage, ChatRequest, ToolInvocation};
use crate::completion::{CompletionClient, CompletionError};
use crate::tools::{RegisteredTool, ToolContext, ToolRegistry};

pub const TOOL_SELECTION_PROMPT: &str =
    "You are an extension of GitHub Copilot, built to interact with todo tasks";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("model selected unknown tool '{0}'")]
    UnknownTool(String),
    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub conversation: Vec<ChatMessage>,
    pub tool_invoked: bool,
}

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    model: String,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, model: impl Into<String>) -> Self {
        Self {
            registry,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn dispatch(
        &self,
        completion: &dyn CompletionClient,
        ctx: &ToolContext,
        conversation: Vec<ChatMessage>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let Some(invocation) = self.select(completion, &conversation).await? else {
            return Ok(DispatchOutcome {
                conversation,
                tool_invoked: false,
            });
        };

        let tool = self
            .registry
            .get(&invocation.name)
            .ok_or_else(|| DispatchError::UnknownTool(invocation.name.clone()))?;
        let args = parse_arguments(tool, &invocation)?;
        let name = tool.definition.name;
        tracing::info!(tool = name, "tool arguments validated");

        let started = Instant::now();
        let outcome = tool
            .definition
            .executor
            .execute(ctx, args, &conversation)
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let summary = match outcome {
            Ok(text) => {
                tracing::info!(tool = name, elapsed_ms, "tool executed");
                text
            }
            Err(err) => {
                tracing::warn!(tool = name, elapsed_ms, error = %err, "tool failed; reporting to model");
                format!("The {name} tool failed: {err}")
            }
        };

        let mut next = Vec::with_capacity(conversation.len() + 1);
        next.push(ChatMessage::system(summary));
        next.extend(conversation);
        Ok(DispatchOutcome {
            conversation: next,
            tool_invoked: true,
        })
    }

    async fn select(
        &self,
        completion: &dyn CompletionClient,
        conversation: &[ChatMessage],
    ) -> Result<Option<ToolInvocation>, CompletionError> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(ChatMessage::system(TOOL_SELECTION_PROMPT));
        messages.extend_from_slice(conversation);

        let request =
            ChatRequest::new(&self.model, messages).with_tools(self.registry.function_specs());
        let started = Instant::now();
        let response = completion.complete(request).await?;
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            tool_calls = response.tool_calls.len(),
            "tool selection finished"
        );

        if response.tool_calls.is_empty() {
            tracing::debug!(
                answered_directly = response.content.is_some(),
                "no tool selected"
            );
        } else if response.tool_calls.len() > 1 {
            tracing::info!(
                ignored = response.tool_calls.len() - 1,
                "model requested several tools; honoring the first"
            );
        }
        Ok(response.tool_calls.into_iter().next())
    }
}

fn parse_arguments(
    tool: &RegisteredTool,
    invocation: &ToolInvocation,
) -> Result<Value, DispatchError> {
    let invalid = |reason: String| DispatchError::InvalidArguments {
        tool: invocation.name.clone(),
        reason,
    };

    let raw = invocation.arguments.trim();
    let args: Value = if raw.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(raw).map_err(|e| invalid(format!("not valid JSON: {e}")))?
    };
    if !args.is_object() {
        return Err(invalid("arguments must be a JSON object".to_string()));
    }

    let errors = tool.schema_errors(&args);
    if !errors.is_empty() {
        tracing::warn!(tool = %invocation.name, errors = ?errors, "tool arguments rejected by schema");
        return Err(invalid(errors.join("; ")));
    }
    Ok(args)
}
