//! Error types for the chipfield engine.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the engine.
///
/// The error surface is deliberately narrow. Degenerate geometry falls back
/// to plain text, and removing an unknown chip is a no-op, so the only
/// fallible operation is structural configuration.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    /// A configuration argument was structurally invalid.
    #[error("invalid")]
    Invalid(String),
}
