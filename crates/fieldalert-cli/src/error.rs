//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// REDCap error
    #[error("REDCap error: {0}")]
    Redcap(#[from] fieldalert_redcap::RedcapError),

    /// Sweeper error
    #[error(transparent)]
    Sweep(#[from] fieldalert_sweeper::SweepError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Blocking task failed to complete
    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
