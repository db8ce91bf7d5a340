//! Test context setup
//!
//! Builds the bot's services over an in-memory session store and fakes.

use std::path::PathBuf;
use std::sync::{Arc, Once};
use RegBot::config::Settings;
use RegBot::handlers::{dispatch, Inbound, Outcome};
use RegBot::services::ServiceFactory;
use RegBot::state::{MemorySessionStore, Session, SessionStore};
use RegBot::utils::errors::Result;
use super::fakes::{RecordingSink, ScriptedCompletion};

static INIT: Once = Once::new();

/// Initialize test environment
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Test user ids
pub fn test_user_id() -> i64 {
    987654321
}

pub fn other_user_id() -> i64 {
    123456789
}

/// Username the bot answers to in group mentions
pub fn test_bot_username() -> &'static str {
    "RegBot"
}

/// Settings with the credentials validation expects
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.bot.token = "12345:test_token".to_string();
    settings.openai.api_key = "sk-test".to_string();
    settings
}

/// PEM-encoded RSA key used to sign test service-account assertions
pub fn test_private_key() -> String {
    std::fs::read_to_string(fixture_path("service_account_key.pem")).expect("test key fixture is readable")
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// Services wired to fakes, with handles to inspect them
pub struct TestContext {
    pub services: ServiceFactory,
    pub sessions: Arc<MemorySessionStore>,
    pub sink: Arc<RecordingSink>,
    pub completion: Arc<ScriptedCompletion>,
    pub settings: Settings,
}

impl TestContext {
    /// Context with a working sink and an assistant that always answers "ok"
    pub fn new() -> Self {
        Self::with(RecordingSink::new(), ScriptedCompletion::replying("ok"))
    }

    pub fn with(sink: RecordingSink, completion: ScriptedCompletion) -> Self {
        init_test_env();

        let settings = test_settings();
        let sessions = Arc::new(MemorySessionStore::new(settings.session.ttl_seconds));
        let sink = Arc::new(sink);
        let completion = Arc::new(completion);
        let services = ServiceFactory::from_parts(
            sessions.clone(),
            sink.clone(),
            completion.clone(),
            &settings,
        );

        Self { services, sessions, sink, completion, settings }
    }

    /// Dispatch raw text the way the Telegram handlers classify it
    pub async fn send(&self, user_id: i64, text: &str) -> Result<Outcome> {
        dispatch(&self.services, user_id, Inbound::from_text(text, test_bot_username())).await
    }

    pub async fn session(&self, user_id: i64) -> Option<Session> {
        self.sessions.get(user_id).await.expect("memory store never fails")
    }
}
