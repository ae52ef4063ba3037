//! prpsmith CLI entry point.
//!
//! Binary name: `prpsmith`
//!
//! Parses CLI arguments, initializes tracing, the credential store and the
//! provider registry, then dispatches to the command handlers.

mod cli;
mod state;

use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;

use prpsmith_observe::tracing_setup::{default_filter, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "prpsmith", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    let data_dir = prpsmith_infra::config::resolve_data_dir();
    let config = prpsmith_infra::config::load_config(&data_dir).await;

    let enable_otel = std::env::var("PRPSMITH_OTEL").is_ok_and(|v| v == "1" || v == "true");
    if let Err(e) = init_tracing(
        default_filter(cli.verbose, cli.quiet),
        config.log_format,
        enable_otel,
    ) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let result = run(cli, AppState::with_config(data_dir, config).await).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli, state: anyhow::Result<AppState>) -> anyhow::Result<ExitCode> {
    let state = state?;
    let default = state.factory.registry().read().await.default_provider();
    let session = cli.session(default)?;

    match cli.command {
        Commands::Provider { action } => {
            let ok =
                cli::provider::handle_provider_command(action, &state, &session, cli.json).await?;
            if !ok {
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Key { action } => {
            cli::key::handle_key_command(action, &state, cli.json).await?;
        }

        Commands::Ask { prompt } => {
            cli::generate::ask(&state, &prompt, &session, cli.json, cli.quiet).await?;
        }

        Commands::Form { description } => {
            cli::generate::form(&state, &description, &session, cli.json, cli.quiet).await?;
        }

        Commands::Prp(args) => {
            cli::generate::prp(&state, args, &session, cli.json, cli.quiet).await?;
        }

        // handled before state init
        Commands::Completions { .. } => {}
    }

    Ok(ExitCode::SUCCESS)
}
