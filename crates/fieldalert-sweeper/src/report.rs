//! Run report for sweep operations

use crate::ReconcileAction;
use chrono::NaiveDate;
use fieldalert_domain::{AlertKind, GatewayError, ParticipantId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Why a single participant could not be processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// History contradicts itself or could not be decoded
    Validation,

    /// Participant disappeared between listing and fetching
    NotFound,

    /// Network hiccup; retried on the next run
    Transient,

    /// Flag kept changing underneath the write
    Conflict,
}

impl FailureKind {
    /// Classify a non-fatal gateway error
    pub fn from_gateway(error: &GatewayError) -> Self {
        match error {
            GatewayError::NotFound(_) => FailureKind::NotFound,
            GatewayError::Malformed { .. } => FailureKind::Validation,
            GatewayError::Conflict { .. } => FailureKind::Conflict,
            GatewayError::Transient(_) | GatewayError::Fatal(_) => FailureKind::Transient,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Validation => "validation",
            FailureKind::NotFound => "not-found",
            FailureKind::Transient => "transient",
            FailureKind::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

/// One participant that was left untouched because of an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantFailure {
    /// Affected participant
    pub participant: ParticipantId,
    /// Failure category
    pub kind: FailureKind,
    /// Human-readable reason
    pub reason: String,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "status", content = "reason")]
pub enum RunOutcome {
    /// Every listed participant was visited
    Completed,

    /// Stopped between participants on request
    Cancelled,

    /// Stopped by a fatal gateway error
    Aborted(String),
}

impl RunOutcome {
    /// Whether the run stopped because of a fatal error
    pub fn is_aborted(&self) -> bool {
        matches!(self, RunOutcome::Aborted(_))
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => f.write_str("completed"),
            RunOutcome::Cancelled => f.write_str("cancelled"),
            RunOutcome::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// Summary of one sweep or purge
///
/// Counts are what was written, or what would have been written in dry-run
/// mode.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique run identifier (UUIDv7, sortable by start time)
    pub run_id: String,

    /// Reference date the rules were evaluated against
    pub as_of: NaiveDate,

    /// Whether writes were suppressed
    pub dry_run: bool,

    /// Participants examined
    pub processed: usize,

    /// Flags set, per alert kind
    pub set: BTreeMap<AlertKind, usize>,

    /// Flags cleared
    pub cleared: usize,

    /// Participants whose flag already matched
    pub unchanged: usize,

    /// Participants holding a custom staff status
    pub skipped_custom: usize,

    /// Writes repeated after a concurrent edit
    pub retried: usize,

    /// Participants left untouched because of errors
    pub failures: Vec<ParticipantFailure>,

    /// How the run ended
    pub outcome: RunOutcome,

    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Create an empty report for a run starting now
    pub fn new(as_of: NaiveDate, dry_run: bool) -> Self {
        Self {
            run_id: uuid::Uuid::now_v7().to_string(),
            as_of,
            dry_run,
            processed: 0,
            set: BTreeMap::new(),
            cleared: 0,
            unchanged: 0,
            skipped_custom: 0,
            retried: 0,
            failures: Vec::new(),
            outcome: RunOutcome::Completed,
            elapsed_ms: 0,
        }
    }

    /// Record an applied (or planned) reconciliation
    pub fn record_action(&mut self, action: ReconcileAction) {
        match action {
            ReconcileAction::SetTo(kind) => *self.set.entry(kind).or_insert(0) += 1,
            ReconcileAction::Clear => self.cleared += 1,
            ReconcileAction::NoOp => self.unchanged += 1,
        }
    }

    /// Record a participant skipped because of a custom status
    pub fn record_custom_skip(&mut self) {
        self.skipped_custom += 1;
    }

    /// Record a participant that could not be processed
    pub fn record_failure(
        &mut self,
        participant: &ParticipantId,
        kind: FailureKind,
        reason: impl Into<String>,
    ) {
        self.failures.push(ParticipantFailure {
            participant: participant.clone(),
            kind,
            reason: reason.into(),
        });
    }

    /// Flags set across all kinds
    pub fn total_set(&self) -> usize {
        self.set.values().sum()
    }

    /// Flags set to one kind
    pub fn set_count(&self, kind: AlertKind) -> usize {
        self.set.get(&kind).copied().unwrap_or(0)
    }

    /// Writes issued (or planned)
    pub fn total_writes(&self) -> usize {
        self.total_set() + self.cleared
    }

    /// Failures of one category
    pub fn failures_of(&self, kind: FailureKind) -> usize {
        self.failures.iter().filter(|f| f.kind == kind).count()
    }

    /// Generate a human-readable summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Alert Sweep {}", self.run_id),
            "======================".to_string(),
            format!("As of: {}", self.as_of),
            format!("Outcome: {}", self.outcome),
            format!("Elapsed: {}ms", self.elapsed_ms),
        ];
        if self.dry_run {
            lines.push("Dry run: no flags were written".to_string());
        }
        lines.push(String::new());

        lines.push(format!("Participants processed: {}", self.processed));
        if !self.set.is_empty() {
            lines.push("Flags set:".to_string());
            for (kind, count) in &self.set {
                lines.push(format!("  {}: {}", kind, count));
            }
            lines.push(format!("  Total: {}", self.total_set()));
        }
        lines.push(format!("Flags cleared: {}", self.cleared));
        lines.push(format!("Unchanged: {}", self.unchanged));
        lines.push(format!("Custom status skipped: {}", self.skipped_custom));
        if self.retried > 0 {
            lines.push(format!("Retried after conflict: {}", self.retried));
        }

        if !self.failures.is_empty() {
            lines.push(String::new());
            lines.push(format!("Failures: {}", self.failures.len()));
            for failure in &self.failures {
                lines.push(format!(
                    "  {} [{}] {}",
                    failure.participant, failure.kind, failure.reason
                ));
            }
        }

        lines.join("\n")
    }
}
