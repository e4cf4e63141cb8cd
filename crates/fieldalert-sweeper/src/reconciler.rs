//! Alert reconciliation
//!
//! Turns "what is stored" and "what is required" into the smallest write.

use fieldalert_domain::{AlertKind, AlertUpdate, ParticipantId};
use serde::Serialize;
use std::fmt;

/// Update to apply to a stored alert flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "action", content = "kind")]
pub enum ReconcileAction {
    /// Store this alert (flag was empty or held the other kind)
    SetTo(AlertKind),

    /// Empty the flag
    Clear,

    /// Flag already matches; nothing is written
    NoOp,
}

/// Decide how to move the stored flag to the classification
///
/// Never yields a write for unchanged inputs, so repeated sweeps over the
/// same data are silent.
///
/// # Examples
///
/// ```
/// use fieldalert_domain::AlertKind;
/// use fieldalert_sweeper::{reconcile, ReconcileAction};
///
/// let hh = Some(AlertKind::HouseholdVisit);
/// assert_eq!(reconcile(None, hh), ReconcileAction::SetTo(AlertKind::HouseholdVisit));
/// assert_eq!(reconcile(hh, hh), ReconcileAction::NoOp);
/// assert_eq!(reconcile(hh, None), ReconcileAction::Clear);
/// ```
pub fn reconcile(stored: Option<AlertKind>, classification: Option<AlertKind>) -> ReconcileAction {
    match (stored, classification) {
        (s, c) if s == c => ReconcileAction::NoOp,
        (_, None) => ReconcileAction::Clear,
        (_, Some(kind)) => ReconcileAction::SetTo(kind),
    }
}

impl ReconcileAction {
    /// Whether the action requires a write
    pub fn is_write(&self) -> bool {
        !matches!(self, ReconcileAction::NoOp)
    }

    /// Partial write request for this action, `None` for `NoOp`
    ///
    /// The request only ever names the alert flag, with `stored` as the value
    /// the gateway must still find before writing.
    pub fn to_update(
        &self,
        participant_id: ParticipantId,
        stored: Option<AlertKind>,
    ) -> Option<AlertUpdate> {
        let new_value = match self {
            ReconcileAction::SetTo(kind) => Some(*kind),
            ReconcileAction::Clear => None,
            ReconcileAction::NoOp => return None,
        };
        Some(AlertUpdate {
            participant_id,
            new_value,
            expected_previous: stored,
        })
    }
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileAction::SetTo(kind) => write!(f, "set {}", kind),
            ReconcileAction::Clear => f.write_str("clear"),
            ReconcileAction::NoOp => f.write_str("no-op"),
        }
    }
}
