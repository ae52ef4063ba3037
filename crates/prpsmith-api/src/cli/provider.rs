//! Provider CLI commands: list, status, check, use.
//!
//! `list` shows the registry overview, `status` the factory's view (which
//! also catches adapter construction failures), `check` answers whether a
//! provider is usable right now and `use` persists the default.

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use prpsmith_infra::config::save_config;
use prpsmith_types::provider::{ProviderId, ProviderStatus, SessionOverrides};

use crate::state::AppState;

#[derive(Subcommand)]
pub enum ProviderCommand {
    /// Show every registered provider with its model and limits.
    List,

    /// Show which providers can be used right now.
    Status,

    /// Check that one provider has a usable API key (exit code 1 if not).
    Check {
        /// Provider name (openai, gemini, anthropic, openrouter, deepseek, mock).
        name: String,
    },

    /// Make a provider the default and save it to config.toml.
    Use {
        /// Provider name.
        name: String,
    },
}

/// Handle a provider subcommand. Returns `false` when `check` fails.
pub async fn handle_provider_command(
    cmd: ProviderCommand,
    state: &AppState,
    session: &SessionOverrides,
    json: bool,
) -> Result<bool> {
    match cmd {
        ProviderCommand::List => provider_list(state, json).await.map(|()| true),
        ProviderCommand::Status => provider_status(state, session, json).await.map(|()| true),
        ProviderCommand::Check { name } => provider_check(state, &name, session, json).await,
        ProviderCommand::Use { name } => provider_use(state, &name, json).await.map(|()| true),
    }
}

fn status_cell(status: &ProviderStatus) -> Cell {
    match status {
        ProviderStatus::Available => Cell::new("available").fg(Color::Green),
        ProviderStatus::MissingApiKey => Cell::new("no api key").fg(Color::Yellow),
        ProviderStatus::Error(reason) => Cell::new(format!("error: {reason}")).fg(Color::Red),
    }
}

async fn provider_list(state: &AppState, json: bool) -> Result<()> {
    let info = state.factory.registry().read().await.provider_info();

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Provider").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Model").fg(Color::White),
        Cell::new("RPM").fg(Color::White),
        Cell::new("Max tokens").fg(Color::White),
        Cell::new("Status").fg(Color::White),
    ]);

    for summary in &info.providers {
        let id_cell = if summary.id == info.default_provider {
            Cell::new(format!("{} *", summary.id)).fg(Color::Cyan)
        } else {
            Cell::new(summary.id.as_str()).fg(Color::Cyan)
        };
        table.add_row(vec![
            id_cell,
            Cell::new(&summary.name),
            Cell::new(&summary.model).fg(Color::DarkGrey),
            Cell::new(summary.rpm_limit),
            Cell::new(summary.max_tokens),
            status_cell(&summary.status),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} of {} providers available, default: {}",
        style(info.available_providers).bold(),
        info.total_providers,
        style(info.default_provider).cyan()
    );
    println!();
    Ok(())
}

async fn provider_status(state: &AppState, session: &SessionOverrides, json: bool) -> Result<()> {
    let statuses = state.factory.get_available_providers(session).await;

    if json {
        let entries: Vec<_> = statuses
            .iter()
            .map(|(id, status)| {
                serde_json::json!({
                    "provider": id,
                    "available": status.is_available(),
                    "status": status,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Provider").fg(Color::White),
        Cell::new("Status").fg(Color::White),
    ]);
    for (id, status) in &statuses {
        table.add_row(vec![Cell::new(id.as_str()).fg(Color::Cyan), status_cell(status)]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

async fn provider_check(
    state: &AppState,
    name: &str,
    session: &SessionOverrides,
    json: bool,
) -> Result<bool> {
    let ok = state.factory.validate_provider(name, session).await;

    if json {
        println!("{}", serde_json::json!({"provider": name, "valid": ok}));
    } else if ok {
        println!(
            "  {} {} is ready",
            style("✓").green().bold(),
            style(name).cyan()
        );
    } else {
        println!(
            "  {} {} is not usable (unknown provider or no API key). Set one with: {}",
            style("✗").red().bold(),
            style(name).cyan(),
            style(format!("prpsmith key set {name}")).yellow()
        );
    }
    Ok(ok)
}

async fn provider_use(state: &AppState, name: &str, json: bool) -> Result<()> {
    let id: ProviderId = name.parse()?;

    let mut config = state.config.clone();
    config.default_provider = Some(id.as_str().to_string());
    save_config(&state.data_dir, &config)
        .await
        .context("failed to write config.toml")?;
    state.factory.registry().write().await.set_default_provider(id);

    let has_key = state.factory.registry().read().await.has_api_key(id);

    if json {
        println!(
            "{}",
            serde_json::json!({"default_provider": id, "has_api_key": has_key})
        );
        return Ok(());
    }

    println!(
        "  {} Default provider set to {}",
        style("✓").green().bold(),
        style(id.display_name()).cyan()
    );
    if !has_key {
        println!(
            "  {} No API key yet. Set one with: {}",
            style("!").yellow().bold(),
            style(format!("prpsmith key set {id}")).yellow()
        );
    }
    Ok(())
}
