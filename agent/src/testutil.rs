use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{TimeZone, Utc};
use futures::stream;
use p256::ecdsa::signature::Signer as _;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::{EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use taskpilot_auth::{
    DEFAULT_KEY_TTL, KeyCache, KeyFetchError, KeySet, KeySource, RequestAuthenticator,
    SignatureHeaders, VerificationKey,
};
use taskpilot_core::tasks::{NewTask, Task, TaskUpdate};
use taskpilot_core::weather::WeatherReport;

use crate::backend::{BackendError, TaskBackend, WeatherSource};
use crate::chat::{ChatRequest, ChatResponse, CompletionDelta, ToolInvocation};
use crate::completion::{CompletionClient, CompletionError, DeltaStream};
use crate::state::Upstreams;
use crate::tools::ToolContext;

/// In-memory task backend for one user, with a switch to simulate outages.
#[derive(Default)]
pub(crate) struct FakeTasks {
    tasks: Mutex<Vec<Task>>,
    failing: AtomicBool,
    next_id: AtomicUsize,
}

impl FakeTasks {
    pub fn with(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            ..Self::default()
        }
    }

    pub fn set_failing(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                status: 500,
                message: "database unavailable".to_string(),
            });
        }
        Ok(())
    }
}

pub(crate) fn task(id: &str, title: &str) -> Task {
    Task {
        id: id.to_string(),
        user_id: "octocat".to_string(),
        title: title.to_string(),
        description: String::new(),
        due_date: None,
        completed: Some(false),
    }
}

#[async_trait]
impl TaskBackend for FakeTasks {
    async fn list(&self) -> Result<Vec<Task>, BackendError> {
        self.check()?;
        Ok(self.snapshot())
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, BackendError> {
        self.check()?;
        Ok(self.snapshot().into_iter().find(|t| t.id == id))
    }

    async fn create(&self, new_task: NewTask) -> Result<Task, BackendError> {
        self.check()?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = new_task.into_task(format!("new-{n}"), "octocat".to_string());
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(created.clone());
        Ok(created)
    }

    async fn update(&self, update: TaskUpdate) -> Result<Option<Task>, BackendError> {
        self.check()?;
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        let Some(existing) = tasks.iter_mut().find(|t| t.id == update.id) else {
            return Ok(None);
        };
        *existing = update.patch.apply(existing);
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool, BackendError> {
        self.check()?;
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        Ok(tasks.len() != before)
    }
}

pub(crate) struct FakeWeather;

#[async_trait]
impl WeatherSource for FakeWeather {
    async fn current(
        &self,
        location: &str,
        country: Option<&str>,
    ) -> Result<WeatherReport, BackendError> {
        Ok(WeatherReport {
            location: location.to_string(),
            country: country.unwrap_or("PT").to_string(),
            condition: "Clear".to_string(),
            description: "clear sky".to_string(),
            icon: "01d".to_string(),
            temperature_c: 21.5,
            humidity_percent: 40,
            wind_speed_ms: 3.2,
            sunrise: Utc.with_ymd_and_hms(2026, 6, 1, 5, 12, 0).unwrap(),
            sunset: Utc.with_ymd_and_hms(2026, 6, 1, 20, 1, 0).unwrap(),
        })
    }
}

pub(crate) fn context(tasks: Arc<FakeTasks>) -> ToolContext {
    ToolContext {
        tasks,
        weather: Arc::new(FakeWeather),
    }
}

/// Completion service with scripted answers that records what it was sent.
#[derive(Default)]
pub(crate) struct ScriptedCompletion {
    selections: Mutex<VecDeque<ChatResponse>>,
    chunks: Vec<String>,
    /// Status every `complete` call answers with instead of a selection.
    failure: Option<u16>,
    pub completed: Mutex<Vec<ChatRequest>>,
    pub streamed: Mutex<Vec<ChatRequest>>,
}

impl ScriptedCompletion {
    pub fn selecting(tool_calls: Vec<(&str, &str)>) -> Self {
        let response = ChatResponse {
            content: None,
            tool_calls: tool_calls
                .into_iter()
                .map(|(name, arguments)| ToolInvocation {
                    name: name.to_string(),
                    arguments: arguments.to_string(),
                })
                .collect(),
        };
        Self {
            selections: Mutex::new(VecDeque::from([response])),
            ..Self::default()
        }
    }

    pub fn no_tool() -> Self {
        Self::selecting(Vec::new())
    }

    /// Tool selection fails with the given upstream status.
    pub fn failing(status: u16) -> Self {
        Self {
            failure: Some(status),
            ..Self::default()
        }
    }

    pub fn streaming(mut self, chunks: &[&str]) -> Self {
        self.chunks = chunks.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn completed_requests(&self) -> Vec<ChatRequest> {
        self.completed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn streamed_requests(&self) -> Vec<ChatRequest> {
        self.streamed.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, CompletionError> {
        self.completed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        if let Some(status) = self.failure {
            return Err(CompletionError::Status {
                status,
                body: "upstream unavailable".to_string(),
            });
        }
        Ok(self
            .selections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default())
    }

    async fn stream(&self, request: ChatRequest) -> Result<DeltaStream, CompletionError> {
        self.streamed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        let chunks: Vec<Result<CompletionDelta, CompletionError>> = self
            .chunks
            .iter()
            .map(|c| Ok(CompletionDelta::from_raw(c.clone())))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// A published key plus its private half, for signing test requests.
pub(crate) struct Signer {
    key_id: String,
    signing: SigningKey,
}

impl Signer {
    pub fn generate(key_id: &str) -> Self {
        Self {
            key_id: key_id.to_string(),
            signing: SigningKey::random(&mut OsRng),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn sign(&self, body: &[u8]) -> String {
        let signature: Signature = self.signing.sign(body);
        STANDARD.encode(signature.to_der().as_bytes())
    }

    pub fn authenticator(&self) -> Arc<RequestAuthenticator> {
        let pem = self
            .signing
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .expect("public key should encode as PEM");
        let keys = KeySet::new(vec![VerificationKey {
            identifier: self.key_id.clone(),
            material: pem,
            is_current: true,
        }]);
        let cache = KeyCache::new(Arc::new(StaticKeys(keys)), DEFAULT_KEY_TTL);
        Arc::new(RequestAuthenticator::new(
            Arc::new(cache),
            SignatureHeaders::default(),
        ))
    }
}

struct StaticKeys(KeySet);

#[async_trait]
impl KeySource for StaticKeys {
    async fn fetch(&self) -> Result<KeySet, KeyFetchError> {
        Ok(self.0.clone())
    }
}

/// Hands every caller the same scripted completion and task fakes.
pub(crate) struct FixedUpstreams {
    pub completion: Arc<ScriptedCompletion>,
    pub tasks: Arc<FakeTasks>,
}

impl FixedUpstreams {
    pub fn new(completion: ScriptedCompletion, tasks: FakeTasks) -> Arc<Self> {
        Arc::new(Self {
            completion: Arc::new(completion),
            tasks: Arc::new(tasks),
        })
    }
}

impl Upstreams for FixedUpstreams {
    fn completion(&self, _token: &str) -> Arc<dyn CompletionClient> {
        self.completion.clone()
    }

    fn tool_context(&self, _token: &str) -> ToolContext {
        context(self.tasks.clone())
    }
}
