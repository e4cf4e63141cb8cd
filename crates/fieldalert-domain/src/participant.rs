//! Participant module - the record the engine classifies

use crate::{AlertKind, DoseEvent, ScheduledVisit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a participant in the system of record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wrap a record identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Enrollment status of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrollmentStatus {
    /// Under active follow-up
    Active,

    /// Withdrawn from the study
    Withdrawn,

    /// Follow-up completed
    Completed,
}

impl EnrollmentStatus {
    /// Whether the participant is still followed up (alerts can apply)
    pub fn is_active(&self) -> bool {
        matches!(self, EnrollmentStatus::Active)
    }
}

/// Value found in the alert field of a participant record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoredFlag {
    /// Empty, or a value written by the engine
    Managed(Option<AlertKind>),

    /// Free-text status entered by staff; the engine never overwrites it
    Custom(String),
}

impl StoredFlag {
    /// An empty alert field
    pub fn empty() -> Self {
        StoredFlag::Managed(None)
    }

    /// The managed alert, or `None` for custom values
    pub fn managed(&self) -> Option<Option<AlertKind>> {
        match self {
            StoredFlag::Managed(kind) => Some(*kind),
            StoredFlag::Custom(_) => None,
        }
    }
}

impl From<Option<AlertKind>> for StoredFlag {
    fn from(kind: Option<AlertKind>) -> Self {
        StoredFlag::Managed(kind)
    }
}

/// Everything the engine knows about one participant
///
/// Produced by a [`crate::RecordGateway`] fetch. Only `stored_flag` is ever
/// written back, and only through a partial update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantHistory {
    /// Participant identifier
    pub id: ParticipantId,

    /// Enrollment status at fetch time
    pub enrollment: EnrollmentStatus,

    /// Current value of the alert field
    pub stored_flag: StoredFlag,

    /// Last modification of the alert field, if the store tracks it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_modified_at: Option<DateTime<Utc>>,

    /// Community the participant lives in (used for alert labels)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,

    /// Doses administered so far
    #[serde(default)]
    pub doses: Vec<DoseEvent>,

    /// Visits known to the system of record
    #[serde(default)]
    pub visits: Vec<ScheduledVisit>,
}

impl ParticipantHistory {
    /// Create an active participant with no history and an empty flag
    pub fn new(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            enrollment: EnrollmentStatus::Active,
            stored_flag: StoredFlag::empty(),
            flag_modified_at: None,
            community: None,
            doses: Vec::new(),
            visits: Vec::new(),
        }
    }

    /// Set the enrollment status
    pub fn with_enrollment(mut self, enrollment: EnrollmentStatus) -> Self {
        self.enrollment = enrollment;
        self
    }

    /// Set the stored alert flag
    pub fn with_flag(mut self, flag: impl Into<StoredFlag>) -> Self {
        self.stored_flag = flag.into();
        self
    }

    /// Set the community label
    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = Some(community.into());
        self
    }

    /// Append a dose event
    pub fn with_dose(mut self, dose: DoseEvent) -> Self {
        self.doses.push(dose);
        self
    }

    /// Append a visit
    pub fn with_visit(mut self, visit: ScheduledVisit) -> Self {
        self.visits.push(visit);
        self
    }

    /// The most recent dose by sequence number
    pub fn latest_dose(&self) -> Option<&DoseEvent> {
        self.doses.iter().max_by_key(|d| d.sequence)
    }
}
