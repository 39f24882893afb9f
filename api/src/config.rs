use std::time::Duration;

use taskpilot_auth::{DEFAULT_KEY_TTL, DEFAULT_PUBLIC_KEYS_URL};
use url::Url;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_OPENWEATHERMAP_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Runtime configuration for the task API, read from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    /// Absent means the in-memory store.
    pub database_url: Option<String>,
    pub github_api_url: Url,
    pub openweathermap_url: Url,
    pub openweathermap_api_key: Option<String>,
    pub skillset_require_signature: bool,
    pub public_keys_url: String,
    pub signature_header: String,
    pub key_identifier_header: String,
    pub key_cache_ttl: Duration,
    pub require_https: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            github_api_url: default_url(DEFAULT_GITHUB_API_URL),
            openweathermap_url: default_url(DEFAULT_OPENWEATHERMAP_URL),
            openweathermap_api_key: None,
            skillset_require_signature: true,
            public_keys_url: DEFAULT_PUBLIC_KEYS_URL.to_string(),
            signature_header: "X-Signature".to_string(),
            key_identifier_header: "X-Key-Identifier".to_string(),
            key_cache_ttl: DEFAULT_KEY_TTL,
            require_https: false,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let flag = |name: &str, default: bool| {
            non_empty(name)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(default)
        };

        Self {
            port: non_empty("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            database_url: non_empty("DATABASE_URL"),
            github_api_url: non_empty("GITHUB_API_URL")
                .and_then(|v| parse_url("GITHUB_API_URL", &v))
                .unwrap_or(defaults.github_api_url),
            openweathermap_url: non_empty("OPENWEATHERMAP_URL")
                .and_then(|v| parse_url("OPENWEATHERMAP_URL", &v))
                .unwrap_or(defaults.openweathermap_url),
            openweathermap_api_key: non_empty("OPENWEATHERMAP_API_KEY"),
            skillset_require_signature: flag(
                "SKILLSET_REQUIRE_SIGNATURE",
                defaults.skillset_require_signature,
            ),
            public_keys_url: non_empty("PUBLIC_KEYS_URL").unwrap_or(defaults.public_keys_url),
            signature_header: non_empty("SIGNATURE_HEADER").unwrap_or(defaults.signature_header),
            key_identifier_header: non_empty("KEY_IDENTIFIER_HEADER")
                .unwrap_or(defaults.key_identifier_header),
            key_cache_ttl: non_empty("KEY_CACHE_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.key_cache_ttl),
            require_https: flag("API_REQUIRE_HTTPS", defaults.require_https),
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
