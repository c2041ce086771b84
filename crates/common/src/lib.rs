//! Shared error definitions and helpers used across all quire crates.

pub mod error;

pub use error::{FromMessage, ResolveError, Result};
