//! Common error types for ClarityForge

use thiserror::Error;

/// Common result type for ClarityForge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across ClarityForge services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
