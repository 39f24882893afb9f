use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};

use crate::error::KeyFetchError;
use crate::keys::{KeySet, PublicKeysDocument};

pub const DEFAULT_PUBLIC_KEYS_URL: &str = "https://api.github.com/meta/public_keys/copilot_api";

/// Remote authority publishing the currently trusted verification keys.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> Result<KeySet, KeyFetchError>;
}

/// Fetches `{"public_keys": [...]}` from a fixed URL.
#[derive(Clone)]
pub struct HttpKeySource {
    http: reqwest::Client,
    url: String,
}

impl HttpKeySource {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<KeySet, KeyFetchError> {
        let response = self
            .http
            .get(&self.url)
            .header(ACCEPT, "application/vnd.github.v3+json")
            .header(USER_AGENT, concat!("taskpilot/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|err| KeyFetchError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            tracing::warn!(
                url = %self.url,
                status = %response.status(),
                "public key endpoint returned non-success status"
            );
            return Err(KeyFetchError::Status {
                status: response.status().as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| KeyFetchError::Transport(err.to_string()))?;
        let document: PublicKeysDocument = serde_json::from_slice(&body)
            .map_err(|err| KeyFetchError::Malformed(err.to_string()))?;

        let keys = KeySet::new(document.public_keys.unwrap_or_default());
        tracing::info!(
            url = %self.url,
            key_count = keys.len(),
            current_key = keys.current().map(|k| k.identifier.as_str()).unwrap_or("<none>"),
            "fetched public key set"
        );
        Ok(keys)
    }
}
