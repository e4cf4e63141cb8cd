//! Trait definitions for external interactions
//!
//! The system of record is reached only through [`RecordGateway`].
//! Implementations live in other crates (REDCap client, in-memory fake).

use crate::{AlertKind, ParticipantHistory, ParticipantId};
use serde::Serialize;
use thiserror::Error;

/// Partial write request for the alert field of one record
///
/// This is the whole write surface of the engine: a request can only name the
/// participant, the new alert value and the value it expects to replace.
/// No other field of the record is representable, so a write can never
/// overwrite concurrent edits made by staff elsewhere in the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertUpdate {
    /// Record to update
    pub participant_id: ParticipantId,

    /// Value to store (`None` clears the field)
    pub new_value: Option<AlertKind>,

    /// Value the engine read before deciding; the write must fail with
    /// [`GatewayError::Conflict`] if the store holds something else
    pub expected_previous: Option<AlertKind>,
}

/// Errors reported by a record gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The participant does not exist (anymore)
    #[error("Participant not found: {0}")]
    NotFound(ParticipantId),

    /// Network hiccup or timeout; the next run may succeed
    #[error("Transient gateway error: {0}")]
    Transient(String),

    /// The record could not be decoded into a participant history
    #[error("Malformed record {participant}: {reason}")]
    Malformed {
        /// Participant whose record is malformed
        participant: ParticipantId,
        /// What was wrong with it
        reason: String,
    },

    /// The stored value changed since it was read
    #[error("Write conflict on {participant}: expected {expected}, found {found}")]
    Conflict {
        /// Participant whose flag changed
        participant: ParticipantId,
        /// Value the writer expected
        expected: String,
        /// Value actually stored
        found: String,
    },

    /// The gateway cannot be used at all (unreachable, authentication failure)
    #[error("Fatal gateway error: {0}")]
    Fatal(String),
}

impl GatewayError {
    /// Whether this error must abort the remaining run
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatewayError::Fatal(_))
    }
}

/// Trait for reading participant records and writing the alert flag
///
/// Implemented by the infrastructure layer (fieldalert-redcap) and by the
/// in-memory gateway used in tests.
pub trait RecordGateway {
    /// Identifiers of every participant currently under follow-up
    fn list_active_participants(&self) -> Result<Vec<ParticipantId>, GatewayError>;

    /// Full dosing/visit history plus the current alert flag
    fn fetch_participant_history(
        &self,
        id: &ParticipantId,
    ) -> Result<ParticipantHistory, GatewayError>;

    /// Write the alert field only, if it still holds `expected_previous`
    fn update_alert_flag(&mut self, update: &AlertUpdate) -> Result<(), GatewayError>;
}

/// Render an optional alert for error messages and logs
pub fn describe_flag(flag: Option<AlertKind>) -> String {
    match flag {
        Some(kind) => kind.to_string(),
        None => "none".to_string(),
    }
}
