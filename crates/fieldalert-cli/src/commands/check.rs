//! Check command implementation.

use super::resolve_as_of;
use crate::cli::CheckArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use fieldalert_domain::ParticipantId;
use fieldalert_redcap::RedcapGateway;
use fieldalert_sweeper::Sweeper;

/// Execute the check command.
pub async fn execute_check(args: CheckArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let record = args.record.trim().to_string();
    if record.is_empty() {
        return Err(CliError::InvalidInput("Record id is empty".to_string()));
    }

    let as_of = resolve_as_of(args.as_of);
    let redcap = config.redcap()?.clone();
    let project = config
        .projects(args.project.as_deref())?
        .into_iter()
        .next()
        .cloned()
        .ok_or_else(|| CliError::Config("No REDCap projects configured".into()))?;
    let sweeper = Sweeper::new(config.rules.clone(), config.sweep.clone())?;
    let name = project.name.clone();

    let preview = tokio::task::spawn_blocking(move || -> Result<_> {
        let gateway = RedcapGateway::for_project(&redcap, &project, as_of)?;
        Ok(sweeper.preview(&gateway, &ParticipantId::new(record), as_of)?)
    })
    .await??;

    println!("{}", formatter.format_preview(&name, &preview)?);
    Ok(())
}
