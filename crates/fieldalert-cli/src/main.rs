//! FieldAlert CLI - keeps REDCap follow-up alerts in line with trial data.

use clap::Parser;
use fieldalert_cli::commands;
use fieldalert_cli::{Cli, Command, Config, Formatter};
use fieldalert_sweeper::CancelToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `false` when a project run was aborted.
async fn run() -> fieldalert_cli::Result<bool> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    // Ctrl-C stops the sweep between participants
    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing current participant");
            on_signal.cancel();
        }
    });

    let aborted = match cli.command {
        Command::Run(args) => commands::execute_run(args, &config, &formatter, cancel).await?,
        Command::Check(args) => {
            commands::execute_check(args, &config, &formatter).await?;
            false
        }
        Command::Purge(args) => {
            commands::execute_purge(args, &config, &formatter, cancel).await?
        }
    };

    if aborted {
        eprintln!("{}", formatter.error("At least one project run was aborted"));
    }
    Ok(!aborted)
}
