//! Error types for the dice engine.

/// Errors that can occur while parsing dice notation.
#[derive(Debug, thiserror::Error)]
pub enum DiceError {
    /// The input does not match the `NdM` / `NdM±K` pattern.
    #[error("invalid dice notation: {0:?}")]
    InvalidNotation(String),
}
