//! Evaluation error types

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while classifying a participant
///
/// Any of these means the record cannot be classified safely; the caller must
/// leave the stored flag untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// A dose is recorded without an administration date
    #[error("Dose {sequence} has no administration date")]
    MissingDoseDate {
        /// Dose sequence number
        sequence: u32,
    },

    /// Two doses share a sequence number
    #[error("Dose sequence {0} is recorded more than once")]
    DuplicateDose(u32),

    /// A dose or visit is dated after the evaluation day
    #[error("{what} dated {date} is after the evaluation day {as_of}")]
    FutureDate {
        /// Which record carries the date
        what: String,
        /// The offending date
        date: NaiveDate,
        /// Evaluation day
        as_of: NaiveDate,
    },

    /// A visit marked done has no completion date
    #[error("Visit scheduled on {scheduled_on} is done but has no completion date")]
    MissingCompletionDate {
        /// Scheduled date of the visit
        scheduled_on: NaiveDate,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
