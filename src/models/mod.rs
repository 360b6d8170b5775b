//! Wire documents exchanged with the backend's session endpoints.

pub mod session;

pub use session::{Session, SessionCreateStruct};
