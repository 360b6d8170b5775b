//! Session state persistence.
//!
//! This module provides:
//! - `SessionStorage`: the narrow key/value capability the agent persists
//!   session state through
//! - `InMemoryStorage`: process-lifetime storage for tests and short-lived
//!   clients
//! - `FileStorage`: disk-persisted storage so a session survives restarts
//!
//! The agent mirrors the four session fields 1:1 into four well-known keys
//! and is the only writer; storage implementations carry no session
//! semantics of their own.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::InMemoryStorage;

/// Storage key for the session cookie name/label.
pub const SESSION_NAME_KEY: &str = "sessionguard.sessionName";

/// Storage key for the server-issued session identifier.
pub const SESSION_ID_KEY: &str = "sessionguard.sessionId";

/// Storage key for the session resource href.
pub const SESSION_HREF_KEY: &str = "sessionguard.sessionHref";

/// Storage key for the anti-forgery token.
pub const CSRF_TOKEN_KEY: &str = "sessionguard.csrfToken";

/// Key/value persistence for session state.
///
/// `set_item` and `remove_item` are total: a backend that can fail must
/// handle the failure itself (log, degrade) rather than signal it through
/// this interface.
pub trait SessionStorage {
    /// The stored value, or `None` if the key was never set or was removed.
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&mut self, key: &str, value: &str);

    fn remove_item(&mut self, key: &str);
}
