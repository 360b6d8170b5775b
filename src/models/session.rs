//! Session document types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One authenticated server-side session as issued by the backend.
///
/// All four fields are present together or absent together - a partial
/// session is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session cookie name/label.
    pub name: String,
    /// Resource locator used to refresh or delete this session.
    #[serde(rename = "_href")]
    pub href: String,
    /// Unique session id issued by the server.
    pub identifier: String,
    /// Anti-forgery token valid only for this session's lifetime.
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

impl Session {
    /// All four fields are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty()
            && !self.href.is_empty()
            && !self.identifier.is_empty()
            && !self.csrf_token.is_empty()
    }
}

/// Payload for creating a new session from a login/password pair.
#[derive(Clone, Serialize)]
pub struct SessionCreateStruct {
    pub login: String,
    pub password: String,
}

impl SessionCreateStruct {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

// Password kept out of logs and panic output
impl fmt::Debug for SessionCreateStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCreateStruct")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}
