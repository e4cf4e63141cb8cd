//! Alert classification logic

use crate::{EvaluationError, RuleConfig};
use chrono::{Days, NaiveDate};
use fieldalert_domain::{
    AlertKind, EnrollmentStatus, ParticipantHistory, ScheduledVisit, VisitStatus, VisitType,
};
use serde::Serialize;
use std::collections::HashSet;

/// Facts gathered while classifying one participant
///
/// `classification()` is what the reconciler acts on; the other fields explain
/// how it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    /// Enrollment status at evaluation time
    pub enrollment: EnrollmentStatus,

    /// Administration date of the most recent dose
    pub last_dose_on: Option<NaiveDate>,

    /// Whole days between the most recent dose and the evaluation day
    pub days_since_last_dose: Option<i64>,

    /// Whether a post-dose check was completed on or after the last dose
    pub post_dose_check_done: bool,

    /// Household-visit candidate
    pub household_due: bool,

    /// Number of missed scheduled visits not superseded by a
    /// non-compliance visit
    pub unresolved_missed_visits: usize,

    /// Days since the oldest unresolved missed visit was due
    pub days_overdue: Option<i64>,
}

impl Assessment {
    fn new(enrollment: EnrollmentStatus) -> Self {
        Self {
            enrollment,
            last_dose_on: None,
            days_since_last_dose: None,
            post_dose_check_done: false,
            household_due: false,
            unresolved_missed_visits: 0,
            days_overdue: None,
        }
    }

    /// Non-compliance candidate
    pub fn non_compliant(&self) -> bool {
        self.unresolved_missed_visits > 0
    }

    /// The alert the participant requires, after precedence
    pub fn classification(&self) -> Option<AlertKind> {
        if !self.enrollment.is_active() {
            return None;
        }
        let household = self.household_due.then_some(AlertKind::HouseholdVisit);
        let non_compliant = self.non_compliant().then_some(AlertKind::NonCompliantVisit);
        AlertKind::prevailing(household, non_compliant)
    }
}

/// Rule evaluator: maps a participant history to the alert it requires
///
/// Pure and deterministic. The evaluation day is always passed in.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: RuleConfig,
}

impl Evaluator {
    /// Create a new evaluator with the given thresholds
    pub fn new(config: RuleConfig) -> Self {
        Self { config }
    }

    /// Classify a participant as of the given day
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] when the history of an active participant
    /// is incomplete or inconsistent. No classification is guessed in that case.
    pub fn classify(
        &self,
        history: &ParticipantHistory,
        as_of: NaiveDate,
    ) -> Result<Option<AlertKind>, EvaluationError> {
        self.explain(history, as_of).map(|a| a.classification())
    }

    /// Classify a participant and return the supporting facts
    pub fn explain(
        &self,
        history: &ParticipantHistory,
        as_of: NaiveDate,
    ) -> Result<Assessment, EvaluationError> {
        let mut assessment = Assessment::new(history.enrollment);

        // No alerts outside active follow-up, whatever the history says
        if !history.enrollment.is_active() {
            return Ok(assessment);
        }

        validate(history, as_of)?;
        self.assess_household_window(history, as_of, &mut assessment);
        self.assess_non_compliance(history, as_of, &mut assessment);

        Ok(assessment)
    }

    fn assess_household_window(
        &self,
        history: &ParticipantHistory,
        as_of: NaiveDate,
        assessment: &mut Assessment,
    ) {
        let Some(dosed_on) = history.latest_dose().and_then(|d| d.administered_on) else {
            return;
        };
        let elapsed = (as_of - dosed_on).num_days();

        let followed_up = history.visits.iter().any(|v| {
            v.visit_type == VisitType::PostDoseCheck
                && v.completion().is_some_and(|done_on| done_on >= dosed_on)
        });

        let window = i64::from(self.config.household_window_start_days)
            ..=i64::from(self.config.household_window_end_days);

        assessment.last_dose_on = Some(dosed_on);
        assessment.days_since_last_dose = Some(elapsed);
        assessment.post_dose_check_done = followed_up;
        // Past the window end the visit is handled through other channels
        assessment.household_due = !followed_up && window.contains(&elapsed);
    }

    fn assess_non_compliance(
        &self,
        history: &ParticipantHistory,
        as_of: NaiveDate,
        assessment: &mut Assessment,
    ) {
        let follow_ups: Vec<NaiveDate> = history
            .visits
            .iter()
            .filter(|v| v.visit_type == VisitType::NonComplianceCheck)
            .filter_map(ScheduledVisit::completion)
            .collect();

        let mut oldest_due: Option<NaiveDate> = None;
        let mut unresolved = 0;

        for visit in history
            .visits
            .iter()
            .filter(|v| v.visit_type == VisitType::Scheduled && v.scheduled_on < as_of)
        {
            if !self.is_missed(visit, as_of) {
                continue;
            }
            if follow_ups.iter().any(|done_on| *done_on >= visit.scheduled_on) {
                continue;
            }
            unresolved += 1;
            oldest_due = Some(oldest_due.map_or(visit.scheduled_on, |d| d.min(visit.scheduled_on)));
        }

        assessment.unresolved_missed_visits = unresolved;
        assessment.days_overdue = oldest_due.map(|due| (as_of - due).num_days());
    }

    /// A visit is missed when recorded so, or still pending past its grace period
    fn is_missed(&self, visit: &ScheduledVisit, as_of: NaiveDate) -> bool {
        match visit.status {
            VisitStatus::Done => false,
            VisitStatus::Missed => true,
            VisitStatus::Pending => {
                let grace = visit
                    .grace_period_days
                    .unwrap_or(self.config.visit_grace_period_days);
                visit
                    .scheduled_on
                    .checked_add_days(Days::new(u64::from(grace)))
                    .is_some_and(|deadline| as_of > deadline)
            }
        }
    }
}

/// Reject histories that cannot be classified safely
fn validate(history: &ParticipantHistory, as_of: NaiveDate) -> Result<(), EvaluationError> {
    let mut sequences = HashSet::new();
    for dose in &history.doses {
        if !sequences.insert(dose.sequence) {
            return Err(EvaluationError::DuplicateDose(dose.sequence));
        }
        let dosed_on = dose.administered_on.ok_or(EvaluationError::MissingDoseDate {
            sequence: dose.sequence,
        })?;
        if dosed_on > as_of {
            return Err(EvaluationError::FutureDate {
                what: format!("Dose {}", dose.sequence),
                date: dosed_on,
                as_of,
            });
        }
    }

    for visit in &history.visits {
        if visit.status != VisitStatus::Done {
            continue;
        }
        let done_on = visit.completed_on.ok_or(EvaluationError::MissingCompletionDate {
            scheduled_on: visit.scheduled_on,
        })?;
        if done_on > as_of {
            return Err(EvaluationError::FutureDate {
                what: "Visit completion".to_string(),
                date: done_on,
                as_of,
            });
        }
    }

    Ok(())
}
