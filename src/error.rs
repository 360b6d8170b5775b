use thiserror::Error;

use crate::api::ServiceError;

/// Errors surfaced by the session authentication agent.
///
/// The lifecycle variants carry the collaborator's error untouched as
/// their source, so callers keep the original backend detail.
#[derive(Error, Debug)]
pub enum Error {
    /// Neither a full login/password pair nor a complete session
    /// descriptor was supplied.
    #[error("invalid auth info - supply a full credential pair or a complete session descriptor")]
    InvalidAuthInfo,

    #[error("session create failed")]
    SessionCreate(#[source] ServiceError),

    /// The stored session was cleared before this error was returned.
    #[error("session refresh failed")]
    SessionRefresh(#[source] ServiceError),

    /// The stored session was retained, so the delete can be retried.
    #[error("session delete failed")]
    SessionDelete(#[source] ServiceError),
}
