//! Fake record sinks and completion clients

use std::collections::VecDeque;
use std::sync::Mutex;
use async_trait::async_trait;
use RegBot::services::{CompletionClient, CompletionRequest, RecordSink};
use RegBot::state::{FieldValue, MemorySessionStore, RegistrationRecord, Session, SessionStore};
use RegBot::utils::errors::{
    BotError, CompletionError, CompletionResult, Result, SheetsError, SheetsResult,
};

/// Record sink that remembers every append attempt
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<RegistrationRecord>>,
    attempts: Mutex<usize>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every append fails like an unavailable Sheets API
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    /// Records that were stored successfully
    pub fn records(&self) -> Vec<RegistrationRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl RecordSink for RecordingSink {
    async fn append_record(&self, record: &RegistrationRecord) -> SheetsResult<()> {
        *self.attempts.lock().unwrap() += 1;

        if self.fail {
            return Err(SheetsError::Api("HTTP 503 Service Unavailable: backend error".to_string()));
        }

        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// How a scripted completion call should end
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    ApiError(u16),
    Timeout,
    Empty,
}

/// Completion client that plays back scripted results and records requests
#[derive(Debug)]
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<Script>>,
    fallback: Script,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    /// Always reply with the same text
    pub fn replying(text: &str) -> Self {
        Self::with_fallback(Script::Reply(text.to_string()))
    }

    /// Always fail
    pub fn failing() -> Self {
        Self::with_fallback(Script::ApiError(500))
    }

    pub fn with_fallback(fallback: Script) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a result used before the fallback
    pub fn then(self, step: Script) -> Self {
        self.script.lock().unwrap().push_back(step);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, request: &CompletionRequest) -> CompletionResult<String> {
        self.requests.lock().unwrap().push(request.clone());

        let step = self.script.lock().unwrap().pop_front().unwrap_or_else(|| self.fallback.clone());
        match step {
            Script::Reply(text) => Ok(text),
            Script::ApiError(status) => Err(CompletionError::Api {
                status,
                message: "The server had an error while processing your request".to_string(),
            }),
            Script::Timeout => Err(CompletionError::Timeout),
            Script::Empty => Err(CompletionError::EmptyResponse),
        }
    }
}

/// Session store whose `end` fails like a dropped Redis connection
#[derive(Debug)]
pub struct StickySessionStore {
    inner: MemorySessionStore,
}

impl StickySessionStore {
    pub fn new() -> Self {
        Self { inner: MemorySessionStore::new(0) }
    }
}

#[async_trait]
impl SessionStore for StickySessionStore {
    async fn begin(&self, user_id: i64) -> Result<Session> {
        self.inner.begin(user_id).await
    }

    async fn get(&self, user_id: i64) -> Result<Option<Session>> {
        self.inner.get(user_id).await
    }

    async fn set_field(&self, user_id: i64, value: FieldValue) -> Result<Session> {
        self.inner.set_field(user_id, value).await
    }

    async fn end(&self, _user_id: i64) -> Result<()> {
        Err(BotError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection reset by peer",
        ))))
    }
}
