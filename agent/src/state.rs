use std::sync::Arc;

use taskpilot_auth::RequestAuthenticator;
use url::Url;

use crate::backend::TaskApiClient;
use crate::completion::{CompletionClient, OpenAiClient};
use crate::config::AgentConfig;
use crate::dispatch::ToolDispatcher;
use crate::tools::ToolContext;

/// Builds the outbound clients for one caller. Every upstream call is made
/// with the caller's own token.
pub trait Upstreams: Send + Sync {
    fn completion(&self, token: &str) -> Arc<dyn CompletionClient>;
    fn tool_context(&self, token: &str) -> ToolContext;
}

pub struct HttpUpstreams {
    http: reqwest::Client,
    completion_base_url: Url,
    tasks_api_url: Url,
}

impl HttpUpstreams {
    pub fn new(http: reqwest::Client, config: &AgentConfig) -> Self {
        Self {
            http,
            completion_base_url: config.completion_base_url.clone(),
            tasks_api_url: config.tasks_api_url.clone(),
        }
    }
}

impl Upstreams for HttpUpstreams {
    fn completion(&self, token: &str) -> Arc<dyn CompletionClient> {
        Arc::new(OpenAiClient::new(
            self.http.clone(),
            self.completion_base_url.clone(),
            token,
        ))
    }

    fn tool_context(&self, token: &str) -> ToolContext {
        let client = Arc::new(TaskApiClient::new(
            self.http.clone(),
            self.tasks_api_url.clone(),
            token,
        ));
        ToolContext {
            tasks: client.clone(),
            weather: client,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<RequestAuthenticator>,
    pub dispatcher: Arc<ToolDispatcher>,
    pub upstreams: Arc<dyn Upstreams>,
}
