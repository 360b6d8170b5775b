//! Session lifecycle management.
//!
//! This module provides:
//! - `SessionAuthAgent`: the session-authentication state machine
//! - `AuthInfo` / `Credentials`: what the agent authenticates with
//! - `CredentialStore`: secure OS-level credential storage via keyring
//!
//! One agent instance owns one logical session. Lifecycle operations take
//! `&mut self`, so a single agent never runs two of them concurrently;
//! callers that share storage across agents must serialize access
//! themselves.

pub mod agent;
pub mod credentials;

pub use agent::{SessionAuthAgent, CSRF_TOKEN_HEADER};
pub use credentials::{AuthInfo, CredentialStore, Credentials};
