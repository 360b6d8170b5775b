//! Credential types and OS keychain storage.

use std::fmt;

use anyhow::{Context, Result};
use keyring::Entry;

use crate::models::Session;

/// Keychain service name for stored credentials
const SERVICE_NAME: &str = "sessionguard";

/// A login/password pair.
///
/// Held in agent memory for the lifetime of the process; never written to
/// session storage.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

// Password kept out of logs and panic output
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What a `SessionAuthAgent` is constructed with: either a full credential
/// pair or a complete descriptor of an existing session.
#[derive(Debug, Clone)]
pub enum AuthInfo {
    Credentials(Credentials),
    Session(Session),
}

/// Optional OS-keychain persistence for credentials, so interactive
/// applications do not have to store passwords themselves.
///
/// Entirely separate from session storage; the agent never touches it.
pub struct CredentialStore;

impl CredentialStore {
    /// Store a credential pair in the OS keychain
    pub fn store(credentials: &Credentials) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, &credentials.login)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(&credentials.password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Retrieve the stored credentials for a login from the OS keychain
    pub fn load(login: &str) -> Result<Credentials> {
        let entry =
            Entry::new(SERVICE_NAME, login).context("Failed to create keyring entry")?;
        let password = entry
            .get_password()
            .context("Failed to retrieve password from keychain")?;
        Ok(Credentials::new(login, password))
    }

    /// Delete stored credentials for a login
    pub fn delete(login: &str) -> Result<()> {
        let entry =
            Entry::new(SERVICE_NAME, login).context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }

    /// Check if credentials exist for a login
    pub fn has_credentials(login: &str) -> bool {
        if let Ok(entry) = Entry::new(SERVICE_NAME, login) {
            entry.get_password().is_ok()
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let credentials = Credentials::new("admin", "publish");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("publish"));
    }
}
