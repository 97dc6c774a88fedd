// Core MedQuery chat functionality:
// - Chat data structures and wire types
// - Backend client for the `/ask` endpoint
// - Session id storage
// - Conversation dispatcher
// - Placeholder rotation and terminal rendering

// Export types module - Chat items and request/response structures
pub mod types;
pub use types::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export client module - HTTP client for the backend
pub mod client;
pub use client::{AskBackend, HttpBackend};

// Export session module - Persisted session id
pub mod session;
pub use session::{
    FileStore, KeyValueStore, MemoryStore, PendingWrite, SessionManager, SESSION_KEY,
};

// Export dispatcher module - Conversation state and the ask operation
pub mod dispatcher;
pub use dispatcher::{AskOutcome, Dispatcher};

pub mod placeholder;
pub use placeholder::{PlaceholderRotator, PlaceholderTicker, TIPS};

pub mod render;
