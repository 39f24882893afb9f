use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use taskpilot_core::error::{ApiError, codes};

use crate::completion::CompletionError;
use crate::dispatch::DispatchError;

#[derive(Debug)]
pub enum AppError {
    /// Malformed request (400)
    Validation {
        message: String,
        field: Option<String>,
        docs_hint: Option<String>,
    },
    /// Tool selection or argument failure (500)
    Dispatch(DispatchError),
    /// Completion service failure before streaming began (500)
    Completion(CompletionError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received: None,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Dispatch(DispatchError::Completion(err)) | AppError::Completion(err) => {
                tracing::error!(request_id = %request_id, error = %err, "completion service failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new(
                        codes::INTERNAL_ERROR,
                        "The completion service could not answer",
                        request_id,
                    ),
                )
            }
            AppError::Dispatch(err) => {
                tracing::error!(request_id = %request_id, error = %err, "tool dispatch failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new(codes::INTERNAL_ERROR, "An internal error occurred", request_id),
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        AppError::Dispatch(err)
    }
}

impl From<CompletionError> for AppError {
    fn from(err: CompletionError) -> Self {
        AppError::Completion(err)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        (status, serde_json::from_slice(&body).expect("body should be JSON"))
    }

    #[tokio::test]
    async fn unknown_tool_does_not_leak_detail() {
        let (status, body) = render(DispatchError::UnknownTool("rm_rf".to_string()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert!(!body["message"].as_str().unwrap_or_default().contains("rm_rf"));
    }

    #[tokio::test]
    async fn completion_failure_hides_upstream_body() {
        let err = CompletionError::Status {
            status: 502,
            body: "secret upstream detail".to_string(),
        };
        let (status, body) = render(DispatchError::Completion(err).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "The completion service could not answer");
    }

    #[tokio::test]
    async fn validation_is_bad_request_with_field() {
        let (status, body) = render(AppError::Validation {
            message: "missing token".to_string(),
            field: Some("X-GitHub-Token".to_string()),
            docs_hint: None,
        })
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "X-GitHub-Token");
    }
}
