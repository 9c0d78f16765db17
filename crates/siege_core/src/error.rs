//! Error types for the game simulation.
//!
//! The tick loop itself never fails; these errors cover data loading,
//! persistence and state (de)serialization.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Unknown unit definition identifier.
    #[error("Unknown unit definition: {0}")]
    UnknownUnit(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Roster or config validation failed.
    #[error("Validation failed: {0:?}")]
    ValidationError(Vec<String>),

    /// Reading or writing persisted player stats failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),
}
