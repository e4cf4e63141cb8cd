//! Batch runner: fetch, evaluate, reconcile and write for every participant

use crate::{
    reconcile, FailureKind, ReconcileAction, RunOutcome, RunReport, SweepConfig, SweepError,
};
use chrono::NaiveDate;
use fieldalert_domain::{
    describe_flag, AlertKind, GatewayError, ParticipantId, RecordGateway, StoredFlag,
};
use fieldalert_rules::{Assessment, Evaluator, RuleConfig};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative cancellation flag shared with the caller
///
/// Checked between participants; a participant already being processed is
/// always finished.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a run would do for a single participant
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    /// Participant examined
    pub participant: ParticipantId,

    /// Value currently stored
    pub stored: StoredFlag,

    /// Facts behind the classification
    pub assessment: Assessment,

    /// Action a run would take, `None` when the stored value is a custom status
    pub action: Option<ReconcileAction>,
}

/// How one participant ended when the runner may continue
enum Processed {
    Done,
    RetryAfterConflict,
}

/// Alert sweeper
///
/// Owns the evaluator and the operational switches; the gateway is passed to
/// each run so one sweeper can serve several projects.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use fieldalert_rules::RuleConfig;
/// use fieldalert_sweeper::{CancelToken, MemoryGateway, RunOutcome, SweepConfig, Sweeper};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sweeper = Sweeper::new(RuleConfig::default(), SweepConfig::dry_run())?;
/// let mut gateway = MemoryGateway::new();
/// let as_of = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
///
/// let report = sweeper.run_once(&mut gateway, as_of, &CancelToken::new());
/// assert_eq!(report.outcome, RunOutcome::Completed);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Sweeper {
    evaluator: Evaluator,
    config: SweepConfig,
}

impl Sweeper {
    /// Create a sweeper after validating the rule thresholds
    pub fn new(rules: RuleConfig, config: SweepConfig) -> Result<Self, SweepError> {
        rules
            .validate()
            .map_err(|e| SweepError::Config(e.to_string()))?;
        Ok(Self {
            evaluator: Evaluator::new(rules),
            config,
        })
    }

    /// Get the operational configuration
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Perform one sweep over every participant the gateway lists
    ///
    /// Never fails as a whole: per-participant problems end up in
    /// `RunReport::failures`, a fatal gateway error ends the run with
    /// [`RunOutcome::Aborted`].
    pub fn run_once<G: RecordGateway>(
        &self,
        gateway: &mut G,
        as_of: NaiveDate,
        cancel: &CancelToken,
    ) -> RunReport {
        let start = Instant::now();
        let mut report = RunReport::new(as_of, self.config.dry_run);

        tracing::info!(
            "Starting alert sweep {} (as of {}, dry run: {})",
            report.run_id,
            as_of,
            self.config.dry_run
        );

        let participants = match gateway.list_active_participants() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!("Cannot list participants, aborting sweep: {}", e);
                report.outcome = RunOutcome::Aborted(e.to_string());
                report.elapsed_ms = start.elapsed().as_millis() as u64;
                return report;
            }
        };

        for id in &participants {
            if cancel.is_cancelled() {
                tracing::warn!(
                    "Sweep cancelled after {} of {} participants",
                    report.processed,
                    participants.len()
                );
                report.outcome = RunOutcome::Cancelled;
                break;
            }

            if let Err(e) = self.process_with_retry(gateway, id, as_of, &mut report) {
                tracing::error!("Fatal gateway error at participant {}, aborting: {}", id, e);
                report.outcome = RunOutcome::Aborted(e.to_string());
                break;
            }
            report.processed += 1;
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Sweep {} {}: {} set, {} cleared, {} unchanged, {} custom, {} failed",
            report.run_id,
            report.outcome,
            report.total_set(),
            report.cleared,
            report.unchanged,
            report.skipped_custom,
            report.failures.len()
        );
        report
    }

    /// Compute what a run would do for one participant, without writing
    pub fn preview<G: RecordGateway>(
        &self,
        gateway: &G,
        id: &ParticipantId,
        as_of: NaiveDate,
    ) -> Result<Preview, SweepError> {
        let history = gateway.fetch_participant_history(id)?;
        let assessment = self.evaluator.explain(&history, as_of)?;
        let action = history
            .stored_flag
            .managed()
            .map(|stored| reconcile(stored, assessment.classification()));

        Ok(Preview {
            participant: history.id,
            stored: history.stored_flag,
            assessment,
            action,
        })
    }

    /// Clear every managed flag holding `kind`, whatever the classification
    ///
    /// Uses the same conflict-checked partial update as a sweep. Custom
    /// statuses and flags of the other kind are left alone.
    pub fn purge<G: RecordGateway>(
        &self,
        gateway: &mut G,
        kind: AlertKind,
        as_of: NaiveDate,
        cancel: &CancelToken,
    ) -> RunReport {
        let start = Instant::now();
        let mut report = RunReport::new(as_of, self.config.dry_run);
        tracing::info!("Starting purge {} of {} flags", report.run_id, kind);

        let participants = match gateway.list_active_participants() {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!("Cannot list participants, aborting purge: {}", e);
                report.outcome = RunOutcome::Aborted(e.to_string());
                report.elapsed_ms = start.elapsed().as_millis() as u64;
                return report;
            }
        };

        for id in &participants {
            if cancel.is_cancelled() {
                report.outcome = RunOutcome::Cancelled;
                break;
            }

            if let Err(e) = self.purge_one(gateway, id, kind, &mut report) {
                tracing::error!("Fatal gateway error at participant {}, aborting: {}", id, e);
                report.outcome = RunOutcome::Aborted(e.to_string());
                break;
            }
            report.processed += 1;
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Purge {} {}: {} cleared, {} failed",
            report.run_id,
            report.outcome,
            report.cleared,
            report.failures.len()
        );
        report
    }

    fn process_with_retry<G: RecordGateway>(
        &self,
        gateway: &mut G,
        id: &ParticipantId,
        as_of: NaiveDate,
        report: &mut RunReport,
    ) -> Result<(), GatewayError> {
        let attempts = self.config.write_attempts();
        for attempt in 1..=attempts {
            let last_attempt = attempt == attempts;
            match self.process_participant(gateway, id, as_of, report, last_attempt)? {
                Processed::Done => return Ok(()),
                Processed::RetryAfterConflict => {
                    report.retried += 1;
                    tracing::warn!("Flag of {} changed concurrently, re-evaluating", id);
                }
            }
        }
        Ok(())
    }

    /// Returns `Err` only for fatal gateway errors
    fn process_participant<G: RecordGateway>(
        &self,
        gateway: &mut G,
        id: &ParticipantId,
        as_of: NaiveDate,
        report: &mut RunReport,
        last_attempt: bool,
    ) -> Result<Processed, GatewayError> {
        let history = match gateway.fetch_participant_history(id) {
            Ok(history) => history,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", id, e);
                report.record_failure(id, FailureKind::from_gateway(&e), e.to_string());
                return Ok(Processed::Done);
            }
        };

        let stored = match &history.stored_flag {
            StoredFlag::Managed(stored) => *stored,
            StoredFlag::Custom(value) => {
                tracing::debug!("Skipping {}: custom status {:?}", id, value);
                report.record_custom_skip();
                return Ok(Processed::Done);
            }
        };

        let classification = match self.evaluator.classify(&history, as_of) {
            Ok(classification) => classification,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", id, e);
                report.record_failure(id, FailureKind::Validation, e.to_string());
                return Ok(Processed::Done);
            }
        };

        let action = reconcile(stored, classification);
        let Some(update) = action.to_update(id.clone(), stored) else {
            tracing::debug!("{}: {} already current", id, describe_flag(stored));
            report.record_action(action);
            return Ok(Processed::Done);
        };

        if self.config.dry_run {
            tracing::info!(
                "DRY RUN: Would {} for {} (stored {})",
                action,
                id,
                describe_flag(stored)
            );
            report.record_action(action);
            return Ok(Processed::Done);
        }

        match gateway.update_alert_flag(&update) {
            Ok(()) => {
                tracing::debug!("{}: {} (was {})", id, action, describe_flag(stored));
                report.record_action(action);
                Ok(Processed::Done)
            }
            Err(GatewayError::Conflict { .. }) if !last_attempt => {
                Ok(Processed::RetryAfterConflict)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!("Write for {} failed: {}", id, e);
                report.record_failure(id, FailureKind::from_gateway(&e), e.to_string());
                Ok(Processed::Done)
            }
        }
    }

    fn purge_one<G: RecordGateway>(
        &self,
        gateway: &mut G,
        id: &ParticipantId,
        kind: AlertKind,
        report: &mut RunReport,
    ) -> Result<(), GatewayError> {
        let history = match gateway.fetch_participant_history(id) {
            Ok(history) => history,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                report.record_failure(id, FailureKind::from_gateway(&e), e.to_string());
                return Ok(());
            }
        };

        match history.stored_flag {
            StoredFlag::Custom(_) => {
                report.record_custom_skip();
                Ok(())
            }
            StoredFlag::Managed(stored) if stored != Some(kind) => {
                report.record_action(ReconcileAction::NoOp);
                Ok(())
            }
            StoredFlag::Managed(stored) => {
                let action = ReconcileAction::Clear;
                if self.config.dry_run {
                    tracing::info!("DRY RUN: Would clear {} for {}", kind, id);
                    report.record_action(action);
                    return Ok(());
                }
                let Some(update) = action.to_update(id.clone(), stored) else {
                    return Ok(());
                };
                match gateway.update_alert_flag(&update) {
                    Ok(()) => {
                        report.record_action(action);
                        Ok(())
                    }
                    Err(e) if e.is_fatal() => Err(e),
                    Err(e) => {
                        tracing::warn!("Purge of {} failed: {}", id, e);
                        report.record_failure(id, FailureKind::from_gateway(&e), e.to_string());
                        Ok(())
                    }
                }
            }
        }
    }
}
