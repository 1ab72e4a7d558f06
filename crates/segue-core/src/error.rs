//! Error types for segue-core

use thiserror::Error;

/// Core data-model error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Track format violates an engine invariant
    #[error("invalid track format: {0}")]
    InvalidFormat(String),

    /// Edit range or cut set is malformed
    #[error("invalid edit range: {0}")]
    InvalidRange(String),

    /// Gain factor outside the accepted domain
    #[error("invalid gain factor: {0} (must be finite and > 0)")]
    InvalidGain(f32),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
