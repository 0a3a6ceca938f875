//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Navigating past the first or last scene is not an error; the sequencer
/// clamps silently.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A scene script failed validation.
    #[error("invalid scene script: {0}")]
    InvalidScript(String),

    /// The completion affordance was requested away from the terminal scene.
    #[error("scene {index} is not the terminal scene {terminal}")]
    NotAtTerminalScene {
        /// The scene that was active.
        index: usize,
        /// Index of the terminal scene.
        terminal: usize,
    },

    /// An intro session was not found.
    #[error("intro session not found: {0}")]
    SessionNotFound(Uuid),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
