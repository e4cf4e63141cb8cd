//! Command implementations.

pub mod check;
pub mod purge;
pub mod run;

pub use self::check::execute_check;
pub use self::purge::execute_purge;
pub use self::run::execute_run;

use crate::error::Result;
use crate::output::{Formatter, ProjectReport};
use chrono::NaiveDate;
use fieldalert_redcap::{ProjectConfig, RedcapConfig, RedcapGateway};
use fieldalert_sweeper::{RunOutcome, RunReport};

/// Evaluation day: the given date, or today in local time.
pub fn resolve_as_of(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| chrono::Local::now().date_naive())
}

/// Run a sweep over each project in turn, one blocking task per project.
///
/// A project that cannot be reached gets an aborted report; the remaining
/// projects still run.
pub(crate) async fn sweep_projects<F>(
    redcap: &RedcapConfig,
    projects: Vec<ProjectConfig>,
    as_of: NaiveDate,
    dry_run: bool,
    sweep: F,
) -> Result<Vec<ProjectReport>>
where
    F: Fn(&mut RedcapGateway) -> RunReport + Clone + Send + 'static,
{
    let mut reports = Vec::with_capacity(projects.len());

    for project in projects {
        let redcap = redcap.clone();
        let sweep = sweep.clone();
        let name = project.name.clone();

        let report = tokio::task::spawn_blocking(move || {
            match RedcapGateway::for_project(&redcap, &project, as_of) {
                Ok(mut gateway) => sweep(&mut gateway),
                Err(e) => {
                    tracing::error!("Project {}: cannot connect: {}", project.name, e);
                    unreachable_report(as_of, dry_run, e.to_string())
                }
            }
        })
        .await?;

        reports.push(ProjectReport {
            project: name,
            report,
        });
    }

    Ok(reports)
}

fn unreachable_report(as_of: NaiveDate, dry_run: bool, reason: String) -> RunReport {
    let mut report = RunReport::new(as_of, dry_run);
    report.outcome = RunOutcome::Aborted(reason);
    report
}

/// One-line verdict on a set of project reports.
///
/// Returns `None` when a run was aborted; the caller reports that as an error.
pub fn status_line(formatter: &Formatter, reports: &[ProjectReport]) -> Option<String> {
    if any_aborted(reports) {
        return None;
    }
    let failed: usize = reports.iter().map(|r| r.report.failures.len()).sum();
    let cancelled = reports
        .iter()
        .any(|r| r.report.outcome == RunOutcome::Cancelled);

    Some(if cancelled {
        formatter.warning("Run cancelled, remaining participants were not processed")
    } else if failed > 0 {
        formatter.warning(&format!("{} participant(s) could not be processed", failed))
    } else {
        formatter.success(&format!("{} project(s) swept", reports.len()))
    })
}

/// Print the verdict to stderr, keeping stdout for the report itself.
pub(crate) fn report_status(formatter: &Formatter, reports: &[ProjectReport]) {
    if let Some(line) = status_line(formatter, reports) {
        eprintln!("{}", line);
    }
}

/// Whether any project run was aborted.
pub fn any_aborted(reports: &[ProjectReport]) -> bool {
    reports.iter().any(|r| r.report.outcome.is_aborted())
}
