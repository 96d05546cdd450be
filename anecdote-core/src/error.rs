//! Errors shared across the engine.

use thiserror::Error;

/// Input rejected before any request is made or any state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a topic")]
    EmptyTopic,

    #[error("Please enter your name")]
    EmptyName,

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}
