//! Error types for sweeper operations

use fieldalert_domain::GatewayError;
use fieldalert_rules::EvaluationError;
use thiserror::Error;

/// Errors that can occur outside the per-participant isolation of a run
#[derive(Error, Debug)]
pub enum SweepError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record gateway error
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The participant history could not be classified
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
}
