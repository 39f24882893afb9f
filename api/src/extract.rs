//! `AppJson<T>`: a drop-in for `axum::Json<T>` whose rejections are
//! structured `AppError` responses instead of axum's plain-text 422.

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

pub fn map_json_rejection(rejection: JsonRejection) -> AppError {
    let body_text = rejection.body_text();
    let field_hint = extract_field_from_serde_message(&body_text);

    AppError::Validation {
        message: format!("Invalid request body: {body_text}"),
        field: Some(field_hint.unwrap_or_else(|| "body".to_string())),
        received: None,
        docs_hint: Some(
            "Check the request body against the endpoint's schema (GET /api-doc/openapi.json)."
                .to_string(),
        ),
    }
}

/// "missing field `title`" → `title`
fn extract_field_from_serde_message(msg: &str) -> Option<String> {
    ["missing field `", "unknown field `", "duplicate field `"]
        .iter()
        .find_map(|pattern| {
            let start = msg.find(pattern)? + pattern.len();
            let after = &msg[start..];
            after.find('`').map(|end| after[..end].to_string())
        })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::Router;
    use taskpilot_core::tasks::NewTask;
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn extracts_missing_field_name() {
        let msg = "Failed to deserialize: missing field `title` at line 1 column 2";
        assert_eq!(extract_field_from_serde_message(msg), Some("title".to_string()));
    }

    #[test]
    fn returns_none_for_generic_error() {
        assert_eq!(
            extract_field_from_serde_message("invalid type: string, expected a boolean"),
            None
        );
    }

    #[tokio::test]
    async fn malformed_body_is_structured_bad_request() {
        let app = Router::new().route(
            "/",
            post(|AppJson(task): AppJson<NewTask>| async move { task.title.into_response() }),
        );
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"description":"no title"}"#))
                    .expect("request should build"),
            )
            .await
            .expect("service is infallible");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let body: serde_json::Value = serde_json::from_slice(&body).expect("body should be JSON");
        assert_eq!(body["field"], "title");
        assert_eq!(body["error"], "validation_failed");
    }
}
