//! Conversation and completion wire types.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            name: None,
        }
    }

    #[cfg(test)]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            name: None,
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body posted to the agent. Callers send more fields than this; they are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentPayload {
    pub messages: Vec<ChatMessage>,
}

/// A tool as advertised to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Empty for plain completions. When present, tool choice is automatic.
    pub tools: Vec<FunctionSpec>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<FunctionSpec>) -> Self {
        self.tools = tools;
        self
    }
}

/// The model's choice to call a tool. `arguments` is the unparsed JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

/// One streamed completion chunk, kept as the JSON text the service sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionDelta(String);

impl CompletionDelta {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn payload_keeps_only_conversation_fields() {
        let payload: AgentPayload = serde_json::from_value(json!({
            "copilot_thread_id": "abc",
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "list my tasks", "copilot_references": [], "name": "octocat"},
                {"role": "assistant", "content": null}
            ]
        }))
        .expect("payload should parse");

        assert_eq!(payload.messages.len(), 3);
        assert_eq!(payload.messages[1].role, ChatRole::User);
        assert_eq!(payload.messages[1].name.as_deref(), Some("octocat"));
        assert_eq!(payload.messages[2].content, "");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result = serde_json::from_value::<ChatMessage>(json!({"role": "wizard", "content": "hi"}));
        assert!(result.is_err());
    }

    #[test]
    fn messages_serialize_without_absent_name() {
        let value = serde_json::to_value(ChatMessage::system("hello")).expect("serializes");
        assert_eq!(value, json!({"role": "system", "content": "hello"}));
    }
}
