//! FieldAlert Domain Layer
//!
//! Core vocabulary of the household-visit alert engine. This crate defines the
//! participant record as the engine sees it, the two alert kinds and their
//! precedence, and the trait boundary to the external system of record.
//!
//! ## Key Concepts
//!
//! - **Participant history**: enrollment status, dose events, scheduled visits
//!   and the alert flag currently stored on the record
//! - **Alert kind**: household visit after a dose, or non-compliant visit after
//!   a missed scheduled visit
//! - **Stored flag**: either a value the engine manages or a custom status
//!   typed in by staff, which the engine never touches
//! - **Record gateway**: read/partial-write access to the system of record
//!
//! ## Architecture
//!
//! Pure domain types only. No I/O happens here; the REDCap client and the
//! in-memory fake implement [`traits::RecordGateway`] in other crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alert;
pub mod history;
pub mod participant;
pub mod traits;

// Re-exports for convenience
pub use alert::AlertKind;
pub use history::{DoseEvent, ScheduledVisit, VisitStatus, VisitType};
pub use participant::{EnrollmentStatus, ParticipantHistory, ParticipantId, StoredFlag};
pub use traits::{describe_flag, AlertUpdate, GatewayError, RecordGateway};
