//! `cardkey-core`: wire protocol foundation for the console client.
//!
//! This crate contains **pure protocol** primitives (no IO): the response
//! envelope every endpoint returns, the classification of raw HTTP responses
//! and the uniform error shape surfaced to callers.

pub mod envelope;
pub mod error;

pub use envelope::{classify, BodyClass, Envelope, Inbound, RetLine};
pub use error::{ApiError, ApiResult, ApplicationError};
