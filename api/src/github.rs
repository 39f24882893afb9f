//! Resolves a caller's GitHub token to their login.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::identity::UserDirectory;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("GitHub rejected the token")]
    Rejected,
    #[error("could not reach GitHub: {0}")]
    Transport(String),
    #[error("GitHub answered HTTP {0}")]
    Status(u16),
    #[error("unexpected GitHub response: {0}")]
    Malformed(String),
}

#[derive(Deserialize)]
struct GitHubUser {
    login: String,
}

pub struct GitHubClient {
    http: reqwest::Client,
    api_url: Url,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, api_url: Url) -> Self {
        Self { http, api_url }
    }

    fn user_url(&self) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("user");
        }
        url
    }
}

#[async_trait]
impl UserDirectory for GitHubClient {
    async fn login_for(&self, token: &str) -> Result<String, DirectoryError> {
        let response = self
            .http
            .get(self.user_url())
            .bearer_auth(token)
            .header("accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(DirectoryError::Rejected),
            status if !status.is_success() => Err(DirectoryError::Status(status.as_u16())),
            _ => {
                let user = response
                    .json::<GitHubUser>()
                    .await
                    .map_err(|e| DirectoryError::Malformed(e.to_string()))?;
                Ok(user.login)
            }
        }
    }
}
