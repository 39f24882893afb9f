use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Router};
use taskpilot_auth::{SignatureAuthLayer, VerifiedRequest};

use crate::chat::{AgentPayload, ChatRequest};
use crate::error::AppError;
use crate::relay::{into_sse, relay};
use crate::state::AppState;

const GITHUB_TOKEN_HEADER: &str = "x-github-token";

/// `POST /` is signature-checked; `GET /` stays an unauthenticated liveness
/// probe. The layer is applied before `get` so it only wraps `post`.
pub fn router(state: &AppState) -> Router<AppState> {
    let auth = SignatureAuthLayer::new(state.authenticator.clone());
    Router::new().route("/", post(agent_turn).layer(auth).get(root))
}

async fn root() -> &'static str {
    "OK"
}

/// One conversational turn: pick and run at most one tool, then stream the
/// model's answer back as server-sent events.
async fn agent_turn(
    State(state): State<AppState>,
    Extension(verified): Extension<VerifiedRequest>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let token = headers
        .get(GITHUB_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation {
            message: "Missing caller token".to_string(),
            field: Some("X-GitHub-Token".to_string()),
            docs_hint: Some(
                "The caller's token is used for the completion service and the task API."
                    .to_string(),
            ),
        })?;

    let payload: AgentPayload =
        serde_json::from_slice(&body).map_err(|e| AppError::Validation {
            message: format!("Invalid request body: {e}"),
            field: Some("messages".to_string()),
            docs_hint: Some("Send {\"messages\": [{\"role\": ..., \"content\": ...}]}".to_string()),
        })?;

    tracing::info!(
        key_identifier = %verified.key_identifier,
        messages = payload.messages.len(),
        "agent turn started"
    );

    let completion = state.upstreams.completion(token);
    let ctx = state.upstreams.tool_context(token);

    let outcome = state
        .dispatcher
        .dispatch(completion.as_ref(), &ctx, payload.messages)
        .await?;
    tracing::info!(tool_invoked = outcome.tool_invoked, "dispatch finished");

    let request = ChatRequest::new(state.dispatcher.model(), outcome.conversation);
    let deltas = completion.stream(request).await?;
    Ok(into_sse(relay(deltas)).into_response())
}
