//! Access to task storage and weather, as seen from inside a tool.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use taskpilot_core::tasks::{NewTask, Task, TaskUpdate};
use taskpilot_core::weather::WeatherReport;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("could not reach the task service: {0}")]
    Transport(String),
    #[error("the task service answered HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("the task service sent an unexpected response: {0}")]
    Malformed(String),
}

/// CRUD over the caller's own tasks. The caller is implied by whoever
/// built the backend.
#[async_trait]
pub trait TaskBackend: Send + Sync {
    async fn list(&self) -> Result<Vec<Task>, BackendError>;
    async fn get(&self, id: &str) -> Result<Option<Task>, BackendError>;
    async fn create(&self, task: NewTask) -> Result<Task, BackendError>;
    async fn update(&self, update: TaskUpdate) -> Result<Option<Task>, BackendError>;
    async fn delete(&self, id: &str) -> Result<bool, BackendError>;
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current(
        &self,
        location: &str,
        country: Option<&str>,
    ) -> Result<WeatherReport, BackendError>;
}

/// REST client for the task API, acting on behalf of one caller token.
pub struct TaskApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl TaskApiClient {
    pub fn new(http: reqwest::Client, base_url: Url, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            token: token.into(),
        }
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("x-github-token", &self.token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, BackendError> {
        builder
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))
    }

    async fn expect_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))
    }

    async fn optional_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Option<T>, BackendError> {
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::expect_json(response).await.map(Some)
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<reqwest::Response, BackendError> {
        self.send(self.request(method, segments).json(body)).await
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> BackendError {
    let body = response.text().await.unwrap_or_default();
    // The API answers with an ApiError body; prefer its message.
    let message = serde_json::from_str::<taskpilot_core::error::ApiError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    BackendError::Status {
        status: status.as_u16(),
        message,
    }
}

const TODOS: [&str; 2] = ["api", "todos"];

fn task_path(id: &str) -> [&str; 3] {
    ["api", "todos", id]
}

#[async_trait]
impl TaskBackend for TaskApiClient {
    async fn list(&self) -> Result<Vec<Task>, BackendError> {
        let response = self.send(self.request(Method::GET, &TODOS)).await?;
        Self::expect_json(response).await
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, BackendError> {
        let response = self.send(self.request(Method::GET, &task_path(id))).await?;
        Self::optional_json(response).await
    }

    async fn create(&self, task: NewTask) -> Result<Task, BackendError> {
        let response = self.send_json(Method::POST, &TODOS, &task).await?;
        Self::expect_json(response).await
    }

    async fn update(&self, update: TaskUpdate) -> Result<Option<Task>, BackendError> {
        let response = self
            .send_json(Method::PUT, &task_path(&update.id), &update.patch)
            .await?;
        Self::optional_json(response).await
    }

    async fn delete(&self, id: &str) -> Result<bool, BackendError> {
        let response = self.send(self.request(Method::DELETE, &task_path(id))).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }
        Ok(true)
    }
}

#[async_trait]
impl WeatherSource for TaskApiClient {
    async fn current(
        &self,
        location: &str,
        country: Option<&str>,
    ) -> Result<WeatherReport, BackendError> {
        let mut query = vec![("city", location)];
        if let Some(country) = country {
            query.push(("country", country));
        }
        let response = self
            .send(self.request(Method::GET, &["api", "weather"]).query(&query))
            .await?;
        Self::expect_json(response).await
    }
}
