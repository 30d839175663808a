//! Common types and utilities.

/// Runner error type.
pub use crate::error::Error;

/// Runner result type.
pub type Result<T> = core::result::Result<T, Error>;
