//! Client-side session authentication agent for stateless REST backends.
//!
//! `sessionguard` obtains and maintains a server-side session on behalf of
//! a caller holding only a login/password pair (or a pre-existing session
//! descriptor), attaches the anti-forgery token to outgoing mutating
//! requests, and tears the session down on logout - without
//! re-authenticating needlessly across requests.
//!
//! The crate is organized around one stateful component and two seams:
//!
//! - [`SessionAuthAgent`]: the session lifecycle state machine
//! - [`SessionStorage`]: key/value persistence for the session fields
//!   ([`InMemoryStorage`], [`FileStorage`])
//! - [`SessionService`]: the remote create/refresh/delete capability
//!   ([`HttpSessionService`])
//!
//! ```no_run
//! use sessionguard::{HttpSessionService, InMemoryStorage, SessionAuthAgent};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = HttpSessionService::new("https://api.example.net")?;
//! let mut agent = SessionAuthAgent::with_credentials(
//!     "admin",
//!     "publish",
//!     service,
//!     InMemoryStorage::new(),
//! )?;
//!
//! agent.ensure_authentication().await?;
//!
//! // Mutating requests get the anti-forgery token attached.
//! let mut request = reqwest::Request::new(
//!     reqwest::Method::POST,
//!     "https://api.example.net/content".parse()?,
//! );
//! agent.authenticate_request(&mut request);
//!
//! agent.log_out().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod error;
pub mod models;
pub mod storage;

pub use api::{HttpSessionService, ServiceError, SessionService};
pub use auth::{AuthInfo, CredentialStore, Credentials, SessionAuthAgent, CSRF_TOKEN_HEADER};
pub use error::Error;
pub use models::{Session, SessionCreateStruct};
pub use storage::{FileStorage, InMemoryStorage, SessionStorage};
