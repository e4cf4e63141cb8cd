//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use fieldalert_domain::{describe_flag, AlertKind, StoredFlag};
use fieldalert_sweeper::{Preview, RunOutcome, RunReport};
use serde::Serialize;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Report of one project, as printed.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectReport {
    /// Project name
    pub project: String,
    /// Run report
    pub report: RunReport,
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the reports of a run or purge.
    pub fn format_reports(&self, reports: &[ProjectReport]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(reports)?),
            OutputFormat::Table => Ok(self.format_reports_table(reports)),
        }
    }

    fn format_reports_table(&self, reports: &[ProjectReport]) -> String {
        if reports.is_empty() {
            return self.colorize("No projects swept.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record([
            "Project", "Outcome", "Processed", "Set HH", "Set NC", "Cleared", "Unchanged",
            "Custom", "Failed", "Elapsed",
        ]);
        for ProjectReport { project, report } in reports {
            builder.push_record([
                project.clone(),
                self.outcome(&report.outcome),
                report.processed.to_string(),
                report.set_count(AlertKind::HouseholdVisit).to_string(),
                report.set_count(AlertKind::NonCompliantVisit).to_string(),
                report.cleared.to_string(),
                report.unchanged.to_string(),
                report.skipped_custom.to_string(),
                report.failures.len().to_string(),
                format!("{}ms", report.elapsed_ms),
            ]);
        }

        let mut output = vec![self.table(builder)];

        let failures: Vec<_> = reports
            .iter()
            .flat_map(|r| r.report.failures.iter().map(move |f| (&r.project, f)))
            .collect();
        if !failures.is_empty() {
            let mut builder = Builder::default();
            builder.push_record(["Project", "Participant", "Kind", "Reason"]);
            for (project, failure) in failures {
                builder.push_record([
                    project.clone(),
                    failure.participant.to_string(),
                    failure.kind.to_string(),
                    failure.reason.clone(),
                ]);
            }
            output.push(self.table(builder));
        }

        if reports.iter().any(|r| r.report.dry_run) {
            output.push(self.info("Dry run: no alert flags were written"));
        }

        output.join("\n")
    }

    /// Format the preview of one participant.
    pub fn format_preview(&self, project: &str, preview: &Preview) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Ok(serde_json::to_string_pretty(&serde_json::json!({
                "project": project,
                "preview": preview,
            }))?);
        }

        let assessment = &preview.assessment;
        let stored = match &preview.stored {
            StoredFlag::Managed(kind) => describe_flag(*kind),
            StoredFlag::Custom(value) => format!("custom: {}", value),
        };
        let action = match preview.action {
            Some(action) => action.to_string(),
            None => "skipped (custom status)".to_string(),
        };
        let optional = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        builder.push_record(["Project".to_string(), project.to_string()]);
        builder.push_record(["Participant".to_string(), preview.participant.to_string()]);
        builder.push_record(["Enrollment".to_string(), format!("{:?}", assessment.enrollment)]);
        builder.push_record(["Stored flag".to_string(), stored]);
        builder.push_record([
            "Last dose".to_string(),
            optional(assessment.last_dose_on.map(|d| d.to_string())),
        ]);
        builder.push_record([
            "Days since dose".to_string(),
            optional(assessment.days_since_last_dose.map(|d| d.to_string())),
        ]);
        builder.push_record([
            "Post-dose check".to_string(),
            yes_no(assessment.post_dose_check_done).to_string(),
        ]);
        builder.push_record([
            "Household due".to_string(),
            yes_no(assessment.household_due).to_string(),
        ]);
        builder.push_record([
            "Missed visits".to_string(),
            assessment.unresolved_missed_visits.to_string(),
        ]);
        builder.push_record([
            "Days overdue".to_string(),
            optional(assessment.days_overdue.map(|d| d.to_string())),
        ]);
        builder.push_record([
            "Classification".to_string(),
            describe_flag(assessment.classification()),
        ]);
        builder.push_record(["Action".to_string(), action]);

        Ok(self.table(builder))
    }

    fn table(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    fn outcome(&self, outcome: &RunOutcome) -> String {
        match outcome {
            RunOutcome::Completed => self.colorize("completed", "green"),
            RunOutcome::Cancelled => self.colorize("cancelled", "yellow"),
            RunOutcome::Aborted(_) => self.colorize(&outcome.to_string(), "red"),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
