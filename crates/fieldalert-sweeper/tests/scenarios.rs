//! End-to-end sweeps over an in-memory record store

use chrono::{Days, NaiveDate};
use fieldalert_domain::{
    AlertKind, AlertUpdate, DoseEvent, EnrollmentStatus, GatewayError, ParticipantHistory,
    ParticipantId, RecordGateway, ScheduledVisit, StoredFlag, VisitType,
};
use fieldalert_rules::RuleConfig;
use fieldalert_sweeper::{
    CancelToken, FailureKind, MemoryGateway, RunOutcome, SweepConfig, Sweeper,
};
use proptest::prelude::*;

const HH: Option<AlertKind> = Some(AlertKind::HouseholdVisit);
const NC: Option<AlertKind> = Some(AlertKind::NonCompliantVisit);

fn day(n: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + Days::new(n)
}

fn sweeper() -> Sweeper {
    Sweeper::new(RuleConfig::new(3, 7, 5), SweepConfig::default()).unwrap()
}

fn id(s: &str) -> ParticipantId {
    ParticipantId::new(s)
}

fn run(gateway: &mut MemoryGateway, as_of: NaiveDate) -> fieldalert_sweeper::RunReport {
    sweeper().run_once(gateway, as_of, &CancelToken::new())
}

#[test]
fn dose_inside_window_sets_household_alert() {
    let mut gateway = MemoryGateway::new();
    gateway.insert(ParticipantHistory::new("A").with_dose(DoseEvent::new(1, day(0))));

    let report = run(&mut gateway, day(5));

    assert_eq!(report.set_count(AlertKind::HouseholdVisit), 1);
    assert_eq!(gateway.managed_flag(&id("A")), Some(HH));
}

#[test]
fn window_closed_clears_household_alert() {
    let mut gateway = MemoryGateway::new();
    gateway.insert(
        ParticipantHistory::new("A")
            .with_dose(DoseEvent::new(1, day(0)))
            .with_flag(HH),
    );

    let report = run(&mut gateway, day(8));

    assert_eq!(report.cleared, 1);
    assert_eq!(gateway.managed_flag(&id("A")), Some(None));
}

#[test]
fn missed_visit_with_existing_alert_is_left_alone() {
    let mut gateway = MemoryGateway::new();
    gateway.insert(
        ParticipantHistory::new("B")
            .with_visit(ScheduledVisit::missed(VisitType::Scheduled, day(10)).with_grace_period(5))
            .with_flag(NC),
    );

    let report = run(&mut gateway, day(16));

    assert_eq!(report.unchanged, 1);
    assert!(gateway.writes().is_empty());
    assert_eq!(gateway.managed_flag(&id("B")), Some(NC));
}

#[test]
fn withdrawal_clears_open_household_alert() {
    let mut gateway = MemoryGateway::new();
    gateway.insert(
        ParticipantHistory::new("C")
            .with_enrollment(EnrollmentStatus::Withdrawn)
            .with_dose(DoseEvent::new(1, day(0)))
            .with_flag(HH),
    );

    let report = run(&mut gateway, day(5));

    assert_eq!(report.cleared, 1);
    assert_eq!(gateway.managed_flag(&id("C")), Some(None));
}

#[test]
fn missing_dose_date_is_reported_without_write() {
    let mut gateway = MemoryGateway::new();
    gateway.insert(
        ParticipantHistory::new("D")
            .with_dose(DoseEvent {
                sequence: 1,
                administered_on: None,
            })
            .with_flag(HH),
    );

    let report = run(&mut gateway, day(5));

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].participant, id("D"));
    assert_eq!(report.failures[0].kind, FailureKind::Validation);
    assert!(gateway.writes().is_empty());
    assert_eq!(gateway.managed_flag(&id("D")), Some(HH));
}

#[test]
fn second_run_writes_nothing() {
    let mut gateway = MemoryGateway::new();
    gateway.insert(ParticipantHistory::new("1").with_dose(DoseEvent::new(1, day(0))));
    gateway.insert(
        ParticipantHistory::new("2")
            .with_visit(ScheduledVisit::pending(VisitType::Scheduled, day(0))),
    );
    gateway.insert(ParticipantHistory::new("3").with_flag(NC));

    let first = run(&mut gateway, day(6));
    assert_eq!(first.total_writes(), 3);

    let second = run(&mut gateway, day(6));
    assert_eq!(second.total_writes(), 0);
    assert_eq!(second.unchanged, 3);
    assert_eq!(gateway.writes().len(), 3);
}

#[test]
fn concurrent_edit_is_retried_once() {
    let mut gateway = MemoryGateway::new();
    gateway.insert(ParticipantHistory::new("E").with_dose(DoseEvent::new(1, day(0))));
    gateway.concurrent_edit("E", StoredFlag::Managed(NC));

    let report = run(&mut gateway, day(5));

    assert_eq!(report.retried, 1);
    assert!(report.failures.is_empty());
    assert_eq!(gateway.managed_flag(&id("E")), Some(HH));
    let write = &gateway.writes()[0];
    assert_eq!(write.expected_previous, NC);
}

#[test]
fn repeated_conflict_becomes_failure() {
    let mut gateway = MemoryGateway::new();
    gateway.insert(ParticipantHistory::new("E").with_dose(DoseEvent::new(1, day(0))));
    gateway.concurrent_edit("E", StoredFlag::Managed(NC));
    gateway.concurrent_edit("E", StoredFlag::Managed(None));

    let report = run(&mut gateway, day(5));

    assert_eq!(report.failures_of(FailureKind::Conflict), 1);
    assert!(gateway.writes().is_empty());
    assert_eq!(gateway.managed_flag(&id("E")), Some(None));
}

#[test]
fn staff_status_entered_mid_run_survives() {
    let mut gateway = MemoryGateway::new();
    gateway.insert(ParticipantHistory::new("F").with_dose(DoseEvent::new(1, day(0))));
    gateway.concurrent_edit("F", StoredFlag::Custom("Visited by nurse".into()));

    let report = run(&mut gateway, day(5));

    // retry sees the custom status and backs off
    assert_eq!(report.retried, 1);
    assert_eq!(report.skipped_custom, 1);
    assert_eq!(
        gateway.history(&id("F")).unwrap().stored_flag,
        StoredFlag::Custom("Visited by nurse".into())
    );
}

#[test]
fn fatal_error_aborts_but_keeps_earlier_writes() {
    let mut gateway = MemoryGateway::new();
    for name in ["1", "2", "3"] {
        gateway.insert(ParticipantHistory::new(name).with_dose(DoseEvent::new(1, day(0))));
    }
    gateway.fail_fetch("2", GatewayError::Fatal("401 Unauthorized".into()));

    let report = run(&mut gateway, day(5));

    assert!(report.outcome.is_aborted());
    assert_eq!(report.processed, 1);
    assert_eq!(gateway.managed_flag(&id("1")), Some(HH));
    assert_eq!(gateway.managed_flag(&id("3")), Some(None));
}

#[test]
fn cancellation_returns_partial_report() {
    let mut gateway = MemoryGateway::new();
    gateway.insert(ParticipantHistory::new("1").with_dose(DoseEvent::new(1, day(0))));
    let cancel = CancelToken::new();
    cancel.cancel();

    let report = sweeper().run_once(&mut gateway, day(5), &cancel);

    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert!(gateway.writes().is_empty());
}

/// Gateway that requests cancellation once a write has gone through,
/// the way Ctrl+C lands while a sweep is under way
struct CancelAfterWrite {
    inner: MemoryGateway,
    cancel: CancelToken,
}

impl RecordGateway for CancelAfterWrite {
    fn list_active_participants(&self) -> Result<Vec<ParticipantId>, GatewayError> {
        self.inner.list_active_participants()
    }

    fn fetch_participant_history(
        &self,
        id: &ParticipantId,
    ) -> Result<ParticipantHistory, GatewayError> {
        self.inner.fetch_participant_history(id)
    }

    fn update_alert_flag(&mut self, update: &AlertUpdate) -> Result<(), GatewayError> {
        self.inner.update_alert_flag(update)?;
        self.cancel.cancel();
        Ok(())
    }
}

#[test]
fn cancellation_between_participants_keeps_finished_work() {
    let cancel = CancelToken::new();
    let mut gateway = CancelAfterWrite {
        inner: MemoryGateway::new(),
        cancel: cancel.clone(),
    };
    gateway
        .inner
        .insert(ParticipantHistory::new("1").with_dose(DoseEvent::new(1, day(0))));
    gateway
        .inner
        .insert(ParticipantHistory::new("2").with_dose(DoseEvent::new(1, day(0))));

    let report = sweeper().run_once(&mut gateway, day(5), &cancel);

    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert_eq!(report.processed, 1);
    assert_eq!(report.set_count(AlertKind::HouseholdVisit), 1);
    assert_eq!(gateway.inner.writes().len(), 1);
    assert_eq!(gateway.inner.managed_flag(&id("1")), Some(HH));
    assert_eq!(gateway.inner.managed_flag(&id("2")), Some(None));
}

#[test]
fn writes_only_touch_the_alert_flag() {
    let mut gateway = MemoryGateway::new();
    let before = ParticipantHistory::new("G")
        .with_community("Manhiça")
        .with_dose(DoseEvent::new(1, day(0)))
        .with_visit(ScheduledVisit::done(VisitType::Scheduled, day(1), day(1)));
    gateway.insert(before.clone());

    run(&mut gateway, day(4));

    let after = gateway.history(&id("G")).unwrap();
    assert_eq!(after.stored_flag, StoredFlag::Managed(HH));
    assert_eq!(after.community, before.community);
    assert_eq!(after.doses, before.doses);
    assert_eq!(after.visits, before.visits);
}

fn history_strategy() -> impl Strategy<Value = ParticipantHistory> {
    let flag = prop_oneof![Just(None), Just(HH), Just(NC)];
    let enrollment = prop_oneof![
        4 => Just(EnrollmentStatus::Active),
        1 => Just(EnrollmentStatus::Withdrawn),
        1 => Just(EnrollmentStatus::Completed),
    ];
    (
        flag,
        enrollment,
        proptest::option::of(0u64..30),
        proptest::option::of((0u64..30, any::<bool>())),
    )
        .prop_map(|(flag, enrollment, dose_day, visit)| {
            let mut history = ParticipantHistory::new("P")
                .with_enrollment(enrollment)
                .with_flag(flag);
            if let Some(d) = dose_day {
                history = history.with_dose(DoseEvent::new(1, day(d)));
            }
            if let Some((v, missed)) = visit {
                let visit = if missed {
                    ScheduledVisit::missed(VisitType::Scheduled, day(v))
                } else {
                    ScheduledVisit::pending(VisitType::Scheduled, day(v))
                };
                history = history.with_visit(visit);
            }
            history
        })
}

proptest! {
    #[test]
    fn prop_sweep_is_idempotent(history in history_strategy(), as_of in 30u64..60) {
        let mut gateway = MemoryGateway::new();
        gateway.insert(history);

        run(&mut gateway, day(as_of));
        let writes_after_first = gateway.writes().len();
        let second = run(&mut gateway, day(as_of));

        prop_assert_eq!(second.total_writes(), 0);
        prop_assert_eq!(gateway.writes().len(), writes_after_first);
    }
}
