//! Services module
//!
//! This module contains business logic services

pub mod assistant;
pub mod registration;
pub mod sheets;

// Re-export commonly used services
pub use assistant::{AssistantService, ChatMessage, CompletionClient, CompletionRequest, OpenAiClient, Role};
pub use registration::{FormProgress, RegistrationService};
pub use sheets::{RecordSink, ServiceAccountKey, SheetsService};

use std::sync::Arc;
use tracing::info;
use crate::config::{SessionBackend, Settings};
use crate::state::{MemorySessionStore, RedisSessionStore, SessionStore};
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub registration: RegistrationService,
    pub assistant: AssistantService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory backed by the real external services
    pub async fn new(settings: &Settings) -> Result<Self> {
        let sessions: Arc<dyn SessionStore> = match settings.session.backend {
            SessionBackend::Memory => {
                info!("Using in-memory session store");
                Arc::new(MemorySessionStore::new(settings.session.ttl_seconds))
            }
            SessionBackend::Redis => {
                info!("Using Redis session store");
                Arc::new(RedisSessionStore::new(&settings.session).await?)
            }
        };
        let sink: Arc<dyn RecordSink> = Arc::new(SheetsService::new(settings.google.clone()).await?);
        let completion: Arc<dyn CompletionClient> = Arc::new(OpenAiClient::new(&settings.openai)?);

        Ok(Self::from_parts(sessions, sink, completion, settings))
    }

    /// Assemble services from already constructed collaborators
    pub fn from_parts(
        sessions: Arc<dyn SessionStore>,
        sink: Arc<dyn RecordSink>,
        completion: Arc<dyn CompletionClient>,
        settings: &Settings,
    ) -> Self {
        Self {
            registration: RegistrationService::new(sessions, sink),
            assistant: AssistantService::new(completion, &settings.openai),
        }
    }

    /// Session store shared by all handlers
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        self.registration.sessions()
    }
}
