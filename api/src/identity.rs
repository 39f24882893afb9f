use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::github::DirectoryError;
use crate::state::AppState;

pub const GITHUB_TOKEN_HEADER: &str = "x-github-token";

/// Maps a caller token to a stable user id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn login_for(&self, token: &str) -> Result<String, DirectoryError>;
}

/// The caller, identified by their GitHub login.
///
/// Read from `X-GitHub-Token`, falling back to `Authorization: Bearer`.
/// Every task route requires it; there is no anonymous listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub login: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let token = caller_token(parts).ok_or_else(|| AppError::Unauthorized {
            message: "Missing X-GitHub-Token header".to_string(),
            docs_hint: Some(
                "Include 'X-GitHub-Token: <token>' or 'Authorization: Bearer <token>'."
                    .to_string(),
            ),
        })?;

        let login = state.users.login_for(&token).await?;
        tracing::debug!(user_id = %login, "caller resolved");

        let user = CurrentUser { login };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

fn caller_token(parts: &Parts) -> Option<String> {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header(GITHUB_TOKEN_HEADER)
        .or_else(|| header("authorization").and_then(|v| v.strip_prefix("Bearer ")))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/todos");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).expect("request should build").into_parts().0
    }

    #[test]
    fn github_header_wins_over_bearer() {
        let parts = parts(&[
            ("x-github-token", "ghu_header"),
            ("authorization", "Bearer ghu_bearer"),
        ]);
        assert_eq!(caller_token(&parts).as_deref(), Some("ghu_header"));
    }

    #[test]
    fn bearer_is_a_fallback() {
        let parts = parts(&[("authorization", "Bearer ghu_bearer")]);
        assert_eq!(caller_token(&parts).as_deref(), Some("ghu_bearer"));
    }

    #[test]
    fn blank_or_missing_tokens_are_absent() {
        assert_eq!(caller_token(&parts(&[("x-github-token", " ")])), None);
        assert_eq!(caller_token(&parts(&[("authorization", "Basic abc")])), None);
        assert_eq!(caller_token(&parts(&[])), None);
    }
}
