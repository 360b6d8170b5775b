//! Session service seam and its HTTP implementation.
//!
//! The agent consumes remote session operations through the
//! `SessionService` trait; `HttpSessionService` implements it against a
//! REST backend over JSON.

pub mod client;
pub mod error;
pub mod service;

pub use client::HttpSessionService;
pub use error::ServiceError;
pub use service::SessionService;
