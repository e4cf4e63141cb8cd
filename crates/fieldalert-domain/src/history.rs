//! Dosing and visit history of a participant

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One administration of the investigational product
///
/// Dose events are immutable once recorded and ordered by `sequence`.
/// `administered_on` is optional because the system of record can hold a dose
/// flagged as given with a blank date; the evaluator rejects such records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseEvent {
    /// Dose sequence number (1 = first dose)
    pub sequence: u32,

    /// Administration date
    pub administered_on: Option<NaiveDate>,
}

impl DoseEvent {
    /// Create a dose event with a known administration date
    pub fn new(sequence: u32, administered_on: NaiveDate) -> Self {
        Self {
            sequence,
            administered_on: Some(administered_on),
        }
    }
}

/// Type of visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisitType {
    /// Scheduled study visit at the health facility
    Scheduled,

    /// Household follow-up after a dose
    PostDoseCheck,

    /// Household visit triggered by non-compliance
    NonComplianceCheck,
}

/// Completion status of a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisitStatus {
    /// The visit took place
    Done,

    /// The visit was recorded as missed
    Missed,

    /// Not yet done and not recorded as missed
    Pending,
}

/// A visit known to the system of record
///
/// Mutated externally as visits occur; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledVisit {
    /// Type of visit
    pub visit_type: VisitType,

    /// Date the visit was due
    pub scheduled_on: NaiveDate,

    /// Completion status
    pub status: VisitStatus,

    /// Date the visit took place (required when `status` is `Done`)
    pub completed_on: Option<NaiveDate>,

    /// Grace period overriding the configured default, in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_days: Option<u32>,
}

impl ScheduledVisit {
    /// A visit due on `scheduled_on` that has not happened yet
    pub fn pending(visit_type: VisitType, scheduled_on: NaiveDate) -> Self {
        Self {
            visit_type,
            scheduled_on,
            status: VisitStatus::Pending,
            completed_on: None,
            grace_period_days: None,
        }
    }

    /// A visit due on `scheduled_on` that took place on `completed_on`
    pub fn done(visit_type: VisitType, scheduled_on: NaiveDate, completed_on: NaiveDate) -> Self {
        Self {
            visit_type,
            scheduled_on,
            status: VisitStatus::Done,
            completed_on: Some(completed_on),
            grace_period_days: None,
        }
    }

    /// A visit explicitly recorded as missed
    pub fn missed(visit_type: VisitType, scheduled_on: NaiveDate) -> Self {
        Self {
            visit_type,
            scheduled_on,
            status: VisitStatus::Missed,
            completed_on: None,
            grace_period_days: None,
        }
    }

    /// Override the default grace period for this visit
    pub fn with_grace_period(mut self, days: u32) -> Self {
        self.grace_period_days = Some(days);
        self
    }

    /// Completion date, if the visit is done
    pub fn completion(&self) -> Option<NaiveDate> {
        match self.status {
            VisitStatus::Done => self.completed_on,
            _ => None,
        }
    }
}
