//! Purge command implementation.

use super::{any_aborted, report_status, resolve_as_of, sweep_projects};
use crate::cli::PurgeArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use fieldalert_domain::AlertKind;
use fieldalert_sweeper::{CancelToken, Sweeper};
use std::io::{self, Write};

/// Execute the purge command.
///
/// Returns whether any project run was aborted.
pub async fn execute_purge(
    args: PurgeArgs,
    config: &Config,
    formatter: &Formatter,
    cancel: CancelToken,
) -> Result<bool> {
    let kind = AlertKind::from(args.kind);
    let as_of = resolve_as_of(None);
    let mut sweep = config.sweep.clone();
    sweep.dry_run |= args.dry_run;

    let redcap = config.redcap()?;
    let projects: Vec<_> = config
        .projects(args.project.as_deref())?
        .into_iter()
        .cloned()
        .collect();

    // Confirm unless --yes is specified or nothing will be written
    if !args.yes && !sweep.dry_run {
        println!("About to clear every {} alert in:", kind);
        for project in &projects {
            println!("  - {}", project.name);
        }
        print!("Continue? [y/N] ");
        io::stdout().flush()?;

        let mut response = String::new();
        io::stdin().read_line(&mut response)?;

        if !confirmed(&response) {
            println!("{}", formatter.info("Operation cancelled"));
            return Ok(false);
        }
    }

    let sweeper = Sweeper::new(config.rules.clone(), sweep)?;
    let dry_run = sweeper.config().dry_run;
    tracing::info!("Purging {} alerts from {} project(s)", kind, projects.len());

    let reports = sweep_projects(redcap, projects, as_of, dry_run, move |gateway| {
        sweeper.purge(gateway, kind, as_of, &cancel)
    })
    .await?;

    println!("{}", formatter.format_reports(&reports)?);
    report_status(formatter, &reports);
    Ok(any_aborted(&reports))
}

fn confirmed(response: &str) -> bool {
    response.trim().eq_ignore_ascii_case("y")
}
