//! In-memory record gateway
//!
//! Stands in for the system of record in tests and local dry runs. Supports
//! injecting fetch failures, an unreachable store, and staff edits that land
//! between a fetch and the following write.

use fieldalert_domain::{
    describe_flag, AlertKind, AlertUpdate, GatewayError, ParticipantHistory, ParticipantId,
    RecordGateway, StoredFlag,
};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Record gateway backed by a map
///
/// Listing follows the same rule as the REDCap gateway: participants under
/// active follow-up, plus anyone still holding a managed alert so that it can
/// be cleared after withdrawal or completion.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    records: BTreeMap<ParticipantId, ParticipantHistory>,
    fetch_failures: HashMap<ParticipantId, GatewayError>,
    concurrent_edits: HashMap<ParticipantId, VecDeque<StoredFlag>>,
    writes: Vec<AlertUpdate>,
    unreachable: bool,
}

impl MemoryGateway {
    /// Create an empty gateway
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a participant record
    pub fn insert(&mut self, history: ParticipantHistory) {
        self.records.insert(history.id.clone(), history);
    }

    /// Current record of a participant
    pub fn history(&self, id: &ParticipantId) -> Option<&ParticipantHistory> {
        self.records.get(id)
    }

    /// Current managed flag, `None` if the participant is unknown or holds a
    /// custom status
    pub fn managed_flag(&self, id: &ParticipantId) -> Option<Option<AlertKind>> {
        self.records.get(id).and_then(|h| h.stored_flag.managed())
    }

    /// Every successful write, in order
    pub fn writes(&self) -> &[AlertUpdate] {
        &self.writes
    }

    /// Make every fetch of a participant fail
    pub fn fail_fetch(&mut self, id: impl Into<ParticipantId>, error: GatewayError) {
        self.fetch_failures.insert(id.into(), error);
    }

    /// Simulate a staff edit of the flag right before the next write
    ///
    /// Edits queue up: each write attempt for the participant consumes one.
    pub fn concurrent_edit(&mut self, id: impl Into<ParticipantId>, flag: StoredFlag) {
        self.concurrent_edits
            .entry(id.into())
            .or_default()
            .push_back(flag);
    }

    /// Make every call fail with a fatal error
    pub fn set_unreachable(&mut self, unreachable: bool) {
        self.unreachable = unreachable;
    }

    fn check_reachable(&self) -> Result<(), GatewayError> {
        if self.unreachable {
            return Err(GatewayError::Fatal("record store unreachable".to_string()));
        }
        Ok(())
    }
}

impl RecordGateway for MemoryGateway {
    fn list_active_participants(&self) -> Result<Vec<ParticipantId>, GatewayError> {
        self.check_reachable()?;
        Ok(self
            .records
            .values()
            .filter(|h| {
                h.enrollment.is_active() || matches!(h.stored_flag, StoredFlag::Managed(Some(_)))
            })
            .map(|h| h.id.clone())
            .collect())
    }

    fn fetch_participant_history(
        &self,
        id: &ParticipantId,
    ) -> Result<ParticipantHistory, GatewayError> {
        self.check_reachable()?;
        if let Some(error) = self.fetch_failures.get(id) {
            return Err(error.clone());
        }
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id.clone()))
    }

    fn update_alert_flag(&mut self, update: &AlertUpdate) -> Result<(), GatewayError> {
        self.check_reachable()?;
        let id = &update.participant_id;

        let edit = self
            .concurrent_edits
            .get_mut(id)
            .and_then(|queue| queue.pop_front());

        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(id.clone()))?;

        if let Some(flag) = edit {
            record.stored_flag = flag;
        }

        match &record.stored_flag {
            StoredFlag::Managed(current) if *current == update.expected_previous => {}
            StoredFlag::Managed(current) => {
                return Err(GatewayError::Conflict {
                    participant: id.clone(),
                    expected: describe_flag(update.expected_previous),
                    found: describe_flag(*current),
                });
            }
            StoredFlag::Custom(value) => {
                return Err(GatewayError::Conflict {
                    participant: id.clone(),
                    expected: describe_flag(update.expected_previous),
                    found: value.clone(),
                });
            }
        }

        record.stored_flag = StoredFlag::Managed(update.new_value);
        self.writes.push(update.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldalert_domain::EnrollmentStatus;

    fn update(id: &str, new: Option<AlertKind>, expected: Option<AlertKind>) -> AlertUpdate {
        AlertUpdate {
            participant_id: ParticipantId::new(id),
            new_value: new,
            expected_previous: expected,
        }
    }

    #[test]
    fn test_write_with_matching_expectation() {
        let mut gateway = MemoryGateway::new();
        gateway.insert(ParticipantHistory::new("1"));
        gateway
            .update_alert_flag(&update("1", Some(AlertKind::HouseholdVisit), None))
            .unwrap();
        assert_eq!(
            gateway.managed_flag(&ParticipantId::new("1")),
            Some(Some(AlertKind::HouseholdVisit))
        );
        assert_eq!(gateway.writes().len(), 1);
    }

    #[test]
    fn test_write_conflicts_on_stale_expectation() {
        let mut gateway = MemoryGateway::new();
        gateway.insert(ParticipantHistory::new("1").with_flag(Some(AlertKind::NonCompliantVisit)));
        let err = gateway
            .update_alert_flag(&update("1", None, Some(AlertKind::HouseholdVisit)))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict { .. }));
        assert!(gateway.writes().is_empty());
    }

    #[test]
    fn test_concurrent_edit_applies_before_write() {
        let mut gateway = MemoryGateway::new();
        gateway.insert(ParticipantHistory::new("1"));
        gateway.concurrent_edit("1", StoredFlag::Custom("Travelling".into()));

        let err = gateway
            .update_alert_flag(&update("1", Some(AlertKind::HouseholdVisit), None))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict { ref found, .. } if found == "Travelling"));
        // edit consumed, record keeps the staff value
        assert_eq!(gateway.managed_flag(&ParticipantId::new("1")), None);
    }

    #[test]
    fn test_listing_includes_inactive_with_alert() {
        let mut gateway = MemoryGateway::new();
        gateway.insert(ParticipantHistory::new("1"));
        gateway.insert(
            ParticipantHistory::new("2")
                .with_enrollment(EnrollmentStatus::Withdrawn)
                .with_flag(Some(AlertKind::HouseholdVisit)),
        );
        gateway.insert(ParticipantHistory::new("3").with_enrollment(EnrollmentStatus::Completed));

        let ids = gateway.list_active_participants().unwrap();
        assert_eq!(ids, vec![ParticipantId::new("1"), ParticipantId::new("2")]);
    }

    #[test]
    fn test_unknown_participant() {
        let mut gateway = MemoryGateway::new();
        assert!(matches!(
            gateway.fetch_participant_history(&ParticipantId::new("9")),
            Err(GatewayError::NotFound(_))
        ));
        assert!(matches!(
            gateway.update_alert_flag(&update("9", None, None)),
            Err(GatewayError::NotFound(_))
        ));
    }
}
