//! OpenAI-compatible chat completion client.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::chat::{ChatRequest, ChatResponse, CompletionDelta, ToolInvocation};

pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<CompletionDelta, CompletionError>> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(String),
    #[error("completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed completion response: {0}")]
    Malformed(String),
}

/// Submit messages, get back either one full choice or a stream of deltas.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Non-streaming call. Tools in the request are offered with automatic
    /// tool choice.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, CompletionError>;

    /// Starts a streaming call. Errors before the first byte are returned
    /// here; the stream itself yields deltas lazily as they arrive.
    async fn stream(&self, request: ChatRequest) -> Result<DeltaStream, CompletionError>;
}

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    fn request_body(request: &ChatRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
            "stream": stream,
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = Value::String("auto".to_string());
        }

        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response, CompletionError> {
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCallBody>>,
}

#[derive(Deserialize)]
struct ToolCallBody {
    function: Option<FunctionCallBody>,
}

#[derive(Deserialize)]
struct FunctionCallBody {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

impl From<CompletionBody> for ChatResponse {
    fn from(body: CompletionBody) -> Self {
        let Some(message) = body.choices.into_iter().next().and_then(|c| c.message) else {
            return ChatResponse::default();
        };
        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|call| call.function)
            .map(|f| ToolInvocation {
                name: f.name,
                arguments: f.arguments.unwrap_or_default(),
            })
            .collect();
        ChatResponse {
            content: message.content,
            tool_calls,
        }
    }
}

enum SseLine {
    Skip,
    Done,
    Delta(CompletionDelta),
}

fn parse_sse_line(line: &str) -> Result<SseLine, CompletionError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(SseLine::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    serde_json::from_str::<Value>(data)
        .map_err(|e| CompletionError::Malformed(format!("stream chunk is not JSON: {e}")))?;
    Ok(SseLine::Delta(CompletionDelta::from_raw(data)))
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, CompletionError> {
        let body = Self::request_body(&request, false);
        let response = self.send(&body).await?;
        let parsed: CompletionBody = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;
        Ok(parsed.into())
    }

    async fn stream(&self, request: ChatRequest) -> Result<DeltaStream, CompletionError> {
        let body = Self::request_body(&request, true);
        let response = self.send(&body).await?;
        let mut bytes = response.bytes_stream();

        let stream = async_stream::try_stream! {
            let mut buffer: Vec<u8> = Vec::new();
            'read: while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| CompletionError::Transport(e.to_string()))?;
                buffer.extend_from_slice(&chunk);

                while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline).collect();
                    let line = String::from_utf8_lossy(&line);
                    match parse_sse_line(line.trim())? {
                        SseLine::Skip => {}
                        SseLine::Done => break 'read,
                        SseLine::Delta(delta) => yield delta,
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
