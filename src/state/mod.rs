//! State management module
//!
//! This module handles registration sessions and where they are stored

pub mod session;
pub mod storage;

// Re-export commonly used state components
pub use session::{FieldValue, FormField, FormStep, RegistrationRecord, Session};
pub use storage::{MemorySessionStore, RedisSessionStore, SessionStore};
