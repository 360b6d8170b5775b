//! The session service capability consumed by the agent.

use async_trait::async_trait;

use crate::models::{Session, SessionCreateStruct};

use super::ServiceError;

/// Remote session operations the agent depends on.
///
/// Implementations own the transport; the agent only sequences the calls
/// and persists their results. Errors are returned as-is so callers keep
/// the original backend detail.
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Create a new session from a create struct.
    async fn create_session(
        &self,
        create_struct: &SessionCreateStruct,
    ) -> Result<Session, ServiceError>;

    /// Refresh an existing session by id, returning the live session
    /// document.
    async fn refresh_session(&self, session_id: &str) -> Result<Session, ServiceError>;

    /// Delete the session at the given href.
    async fn delete_session(&self, session_href: &str) -> Result<(), ServiceError>;

    /// Build the create-session payload for a login/password pair.
    fn new_session_create_struct(&self, login: &str, password: &str) -> SessionCreateStruct {
        SessionCreateStruct::new(login, password)
    }
}
