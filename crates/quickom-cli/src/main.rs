//! quickom CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use quickom_cli::cli::{Cli, Command, ConfigAction};
use quickom_cli::commands::{self, Context};
use quickom_cli::config::ClientConfig;
use quickom_cli::error::ClientResult;
use quickom_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing = match cli.command {
        Command::Watch { .. } if !cli.debug => TracingConfig::daemon(),
        _ => TracingConfig::cli(cli.debug),
    };
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path)?,
        None => ClientConfig::load()?,
    };

    if let Command::Config { action } = cli.command {
        return match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        };
    }

    let ctx = Context::open(config, cli.store)?;
    match cli.command {
        Command::Sync { deadline_secs } => commands::sync::run(&ctx, deadline_secs).await,
        Command::Watch { interval_secs } => commands::watch::run(&ctx, interval_secs).await,
        Command::Check {
            meeting_id,
            webinar,
        } => commands::check::run(&ctx, &meeting_id, webinar).await,
        Command::Meetings { action } => commands::meetings::run(&ctx, action).await,
        Command::Import { from, to, users } => commands::import::run(&ctx, from, to, users).await,
        Command::Privacy { action } => commands::privacy::run(&ctx, action),
        Command::Config { .. } => Ok(()),
    }
}
