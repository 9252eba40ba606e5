//! HTTP request handlers.
//!
//! - [`analyze`]: the contract upload relay endpoint
//!
//! Handlers return [`crate::errors::Error`] which converts to the structured
//! JSON error envelope with the appropriate HTTP status code.

pub mod analyze;
