use std::time::Duration;

use taskpilot_auth::{DEFAULT_KEY_TTL, DEFAULT_PUBLIC_KEYS_URL};
use url::Url;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TASKS_API_URL: &str = "http://localhost:5000";
const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.githubcopilot.com";
const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o";

/// Runtime configuration for the agent, read from the environment.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub port: u16,
    pub tasks_api_url: Url,
    pub completion_base_url: Url,
    pub completion_model: String,
    pub public_keys_url: String,
    pub signature_header: String,
    pub key_identifier_header: String,
    pub key_cache_ttl: Duration,
    pub require_https: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            tasks_api_url: default_url(DEFAULT_TASKS_API_URL),
            completion_base_url: default_url(DEFAULT_COMPLETION_BASE_URL),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            public_keys_url: DEFAULT_PUBLIC_KEYS_URL.to_string(),
            signature_header: "X-Signature".to_string(),
            key_identifier_header: "X-Key-Identifier".to_string(),
            key_cache_ttl: DEFAULT_KEY_TTL,
            require_https: false,
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Unset or unparsable values
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            port: non_empty("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            tasks_api_url: non_empty("TASKS_API_URL")
                .and_then(|v| parse_url("TASKS_API_URL", &v))
                .unwrap_or(defaults.tasks_api_url),
            completion_base_url: non_empty("COMPLETION_BASE_URL")
                .and_then(|v| parse_url("COMPLETION_BASE_URL", &v))
                .unwrap_or(defaults.completion_base_url),
            completion_model: non_empty("COMPLETION_MODEL").unwrap_or(defaults.completion_model),
            public_keys_url: non_empty("PUBLIC_KEYS_URL").unwrap_or(defaults.public_keys_url),
            signature_header: non_empty("SIGNATURE_HEADER").unwrap_or(defaults.signature_header),
            key_identifier_header: non_empty("KEY_IDENTIFIER_HEADER")
                .unwrap_or(defaults.key_identifier_header),
            key_cache_ttl: non_empty("KEY_CACHE_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.key_cache_ttl),
            require_https: non_empty("AGENT_REQUIRE_HTTPS")
                .map(|v| v == "true")
                .unwrap_or(defaults.require_https),
        }
    }
}

fn parse_url(name: &str, value: &str) -> Option<Url> {
    match Url::parse(value) {
        Ok(url) => Some(url),
        Err(err) => {
            tracing::warn!(variable = name, error = %err, "ignoring malformed URL");
            None
        }
    }
}

fn default_url(raw: &'static str) -> Url {
    Url::parse(raw).expect("built-in default URL is valid")
}
