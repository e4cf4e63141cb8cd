//! Run command implementation.

use super::{any_aborted, report_status, resolve_as_of, sweep_projects};
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use fieldalert_sweeper::{CancelToken, Sweeper};

/// Execute the run command.
///
/// Returns whether any project run was aborted.
pub async fn execute_run(
    args: RunArgs,
    config: &Config,
    formatter: &Formatter,
    cancel: CancelToken,
) -> Result<bool> {
    let as_of = resolve_as_of(args.as_of);
    let mut sweep = config.sweep.clone();
    sweep.dry_run |= args.dry_run;

    let redcap = config.redcap()?;
    let projects: Vec<_> = config
        .projects(args.project.as_deref())?
        .into_iter()
        .cloned()
        .collect();

    let sweeper = Sweeper::new(config.rules.clone(), sweep)?;
    let dry_run = sweeper.config().dry_run;
    tracing::info!(
        "Sweeping {} project(s) as of {}{}",
        projects.len(),
        as_of,
        if dry_run { " (dry run)" } else { "" }
    );

    let reports = sweep_projects(redcap, projects, as_of, dry_run, move |gateway| {
        sweeper.run_once(gateway, as_of, &cancel)
    })
    .await?;

    println!("{}", formatter.format_reports(&reports)?);
    report_status(formatter, &reports);
    Ok(any_aborted(&reports))
}
