use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use taskpilot_core::error::{ApiError, codes};

use crate::github::DirectoryError;
use crate::store::StoreError;
use crate::weather::WeatherError;

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Missing or unresolvable caller identity (401)
    Unauthorized {
        message: String,
        docs_hint: Option<String>,
    },
    /// The task exists but belongs to someone else (403)
    Forbidden { message: String },
    /// Resource not found (404)
    NotFound { resource: String, id: String },
    /// Storage failure (500)
    Store(StoreError),
    /// An upstream provider failed (502)
    Upstream { service: &'static str, detail: String },
    /// Internal error (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Unauthorized { message, docs_hint } => (
                StatusCode::UNAUTHORIZED,
                ApiError {
                    error: codes::UNAUTHORIZED.to_string(),
                    message,
                    field: None,
                    received: None,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Forbidden { message } => (
                StatusCode::FORBIDDEN,
                ApiError::new(codes::FORBIDDEN, message, request_id),
            ),
            AppError::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                ApiError::new(
                    codes::NOT_FOUND,
                    format!("{resource} '{id}' not found"),
                    request_id,
                )
                .with_field("id"),
            ),
            AppError::Store(err) => {
                tracing::error!(request_id = %request_id, error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new(codes::INTERNAL_ERROR, "An internal error occurred", request_id),
                )
            }
            AppError::Upstream { service, detail } => {
                tracing::warn!(request_id = %request_id, service, detail = %detail, "upstream failure");
                (
                    StatusCode::BAD_GATEWAY,
                    ApiError::new(
                        codes::UPSTREAM_UNAVAILABLE,
                        format!("The {service} service is unavailable"),
                        request_id,
                    ),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = %request_id, "Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new(codes::INTERNAL_ERROR, "An internal error occurred", request_id),
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<WeatherError> for AppError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::NotConfigured => {
                AppError::Internal("OPENWEATHERMAP_API_KEY is not set".to_string())
            }
            WeatherError::UnknownLocation(location) => AppError::NotFound {
                resource: "Location".to_string(),
                id: location,
            },
            other => AppError::Upstream {
                service: "weather",
                detail: other.to_string(),
            },
        }
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Rejected => AppError::Unauthorized {
                message: "The GitHub token was not accepted".to_string(),
                docs_hint: Some("Send a valid token in the X-GitHub-Token header.".to_string()),
            },
            other => AppError::Upstream {
                service: "GitHub",
                detail: other.to_string(),
            },
        }
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
    async fn not_found_names_the_resource() {
        let (status, body) = render(AppError::NotFound {
            resource: "Task".to_string(),
            id: "t-9".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "Task 't-9' not found");
    }

    #[tokio::test]
    async fn weather_failures_map_to_bad_gateway_without_detail() {
        let err = WeatherError::Status {
            status: 500,
            message: "owm exploded at line 4".to_string(),
        };
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "upstream_unavailable");
        assert!(!body["message"].as_str().unwrap_or_default().contains("line 4"));
    }

    #[tokio::test]
    async fn rejected_token_is_unauthorized() {
        let (status, body) = render(DirectoryError::Rejected.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }
}
