//! Session storage implementation
//!
//! `SessionStore` is the seam handlers talk to. Two backends exist: an
//! in-process map for single-instance deployments and Redis for sessions
//! that must survive restarts.

use std::collections::HashMap;
use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};
use crate::config::SessionConfig;
use crate::utils::errors::{BotError, Result};
use super::session::{FieldValue, Session};

/// Keyed storage for registration sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create an empty session, replacing any existing one for this user
    async fn begin(&self, user_id: i64) -> Result<Session>;

    /// Get the user's active session
    async fn get(&self, user_id: i64) -> Result<Option<Session>>;

    /// Fill the field the session currently expects and return the updated session
    async fn set_field(&self, user_id: i64, value: FieldValue) -> Result<Session>;

    /// Remove the session; a missing session is not an error
    async fn end(&self, user_id: i64) -> Result<()>;

    /// Check if the user is mid-registration
    async fn is_active(&self, user_id: i64) -> Result<bool> {
        Ok(self.get(user_id).await?.is_some())
    }
}

/// In-process session storage
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<i64, Session>>,
    ttl_seconds: u64,
}

impl MemorySessionStore {
    /// Create a store whose sessions expire after `ttl_seconds` (0 disables expiry)
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl_seconds,
        }
    }

    /// Number of sessions currently held, expired ones included
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn begin(&self, user_id: i64) -> Result<Session> {
        let session = Session::new(user_id, self.ttl_seconds);
        let replaced = self.sessions.write().await.insert(user_id, session.clone());

        if replaced.is_some() {
            debug!(user_id = user_id, "Replaced existing session");
        }
        Ok(session)
    }

    async fn get(&self, user_id: i64) -> Result<Option<Session>> {
        let mut sessions = self.sessions.write().await;

        match sessions.get(&user_id) {
            Some(session) if session.is_expired() => {
                warn!(user_id = user_id, expires_at = ?session.expires_at, "Session has expired, removing");
                sessions.remove(&user_id);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    async fn set_field(&self, user_id: i64, value: FieldValue) -> Result<Session> {
        let mut sessions = self.sessions.write().await;

        let session = match sessions.get_mut(&user_id) {
            Some(session) if !session.is_expired() => session,
            _ => return Err(BotError::SessionNotFound { user_id }),
        };

        session.apply(value)?;
        debug!(user_id = user_id, step = %session.step, "Session advanced");
        Ok(session.clone())
    }

    async fn end(&self, user_id: i64) -> Result<()> {
        if self.sessions.write().await.remove(&user_id).is_some() {
            debug!("Deleted session for user {}", user_id);
        } else {
            debug!("No session to delete for user {}", user_id);
        }
        Ok(())
    }
}

/// Redis-based session storage
#[derive(Clone)]
pub struct RedisSessionStore {
    connection_manager: redis::aio::ConnectionManager,
    prefix: String,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    /// Connect to Redis using the session configuration
    pub async fn new(config: &SessionConfig) -> Result<Self> {
        let url = config.redis_url.as_deref().ok_or_else(|| {
            BotError::Config("Redis URL is required for the redis session backend".to_string())
        })?;
        let client = redis::Client::open(url)?;
        let connection_manager = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            connection_manager,
            prefix: config.prefix.clone(),
            ttl_seconds: config.ttl_seconds,
        })
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let key = session_key(&self.prefix, session.user_id);
        let serialized = serde_json::to_string(session)?;
        let mut conn = self.connection_manager.clone();

        let result = if self.ttl_seconds > 0 {
            conn.set_ex::<_, _, ()>(&key, serialized, self.ttl_seconds).await
        } else {
            conn.set::<_, _, ()>(&key, serialized).await
        };

        result.map_err(|e| {
            error!(user_id = session.user_id, error = %e, "Failed to save session to Redis");
            e.into()
        })
    }

    async fn load(&self, user_id: i64) -> Result<Option<Session>> {
        let key = session_key(&self.prefix, user_id);
        let mut conn = self.connection_manager.clone();

        let serialized: Option<String> = conn.get(&key).await?;
        match serialized {
            Some(data) => {
                let session: Session = serde_json::from_str(&data).map_err(|e| {
                    error!(user_id = user_id, error = %e, "Failed to deserialize session");
                    e
                })?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn begin(&self, user_id: i64) -> Result<Session> {
        let session = Session::new(user_id, self.ttl_seconds);
        self.save(&session).await?;
        Ok(session)
    }

    async fn get(&self, user_id: i64) -> Result<Option<Session>> {
        match self.load(user_id).await? {
            Some(session) if session.is_expired() => {
                warn!(user_id = user_id, "Session has expired, removing");
                self.end(user_id).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn set_field(&self, user_id: i64, value: FieldValue) -> Result<Session> {
        let mut session = self
            .get(user_id)
            .await?
            .ok_or(BotError::SessionNotFound { user_id })?;

        session.apply(value)?;
        self.save(&session).await?;
        Ok(session)
    }

    async fn end(&self, user_id: i64) -> Result<()> {
        let key = session_key(&self.prefix, user_id);
        let mut conn = self.connection_manager.clone();

        let deleted: u32 = conn.del(&key).await?;
        debug!(user_id = user_id, deleted = deleted, "Deleted session from Redis");
        Ok(())
    }
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("prefix", &self.prefix)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

/// Get the Redis key for a user's session
fn session_key(prefix: &str, user_id: i64) -> String {
    format!("{}session:{}", prefix, user_id)
}
