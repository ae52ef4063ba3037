//! API key CLI commands: set, list, clear.
//!
//! Keys are stored encrypted in the credential store. Every change re-syncs
//! the registry so the next request sees it.

use anyhow::{Result, bail};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Password;

use prpsmith_types::credential::mask_secret;
use prpsmith_types::provider::ProviderId;

use crate::state::AppState;

#[derive(Subcommand)]
pub enum KeyCommand {
    /// Store an API key (and optionally a model override) for a provider.
    Set {
        /// Provider name.
        provider: String,

        /// Model to use instead of the default.
        #[arg(long)]
        model: Option<String>,

        /// Key value (prompted with hidden input when omitted).
        #[arg(long)]
        value: Option<String>,
    },

    /// List stored keys (masked) and model overrides.
    List,

    /// Remove the stored key for a provider. The model override is kept
    /// unless `--all` is given.
    Clear {
        /// Provider name.
        provider: String,

        /// Also remove the model override.
        #[arg(long)]
        all: bool,
    },
}

pub async fn handle_key_command(cmd: KeyCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        KeyCommand::Set {
            provider,
            model,
            value,
        } => key_set(state, &provider, model.as_deref(), value.as_deref(), json).await,
        KeyCommand::List => key_list(state, json).await,
        KeyCommand::Clear { provider, all } => key_clear(state, &provider, all, json).await,
    }
}

/// Parse a provider name for storage. `mock` needs no key.
fn storable_provider(name: &str) -> Result<ProviderId> {
    let id: ProviderId = name.parse()?;
    if id == ProviderId::Mock {
        bail!("the mock provider does not use an API key");
    }
    Ok(id)
}

async fn key_set(
    state: &AppState,
    provider: &str,
    model: Option<&str>,
    value: Option<&str>,
    json: bool,
) -> Result<()> {
    let id = storable_provider(provider)?;

    let key = match value {
        Some(v) => v.trim().to_string(),
        None => Password::new()
            .with_prompt(format!("Enter API key for {}", style(id.display_name()).bold()))
            .interact()?
            .trim()
            .to_string(),
    };
    if key.is_empty() {
        bail!("empty API key; use `prpsmith key clear {id}` to remove a key");
    }

    let model = model.map(str::trim).filter(|m| !m.is_empty());
    state
        .provider_service
        .update_credential(id, Some(&key), model)
        .await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"set": true, "provider": id, "masked": mask_secret(&key), "model": model})
        );
    } else {
        println!(
            "  {} Key for {} saved ({})",
            style("✓").green().bold(),
            style(id.display_name()).bold(),
            mask_secret(&key)
        );
        if let Some(model) = model {
            println!("    model: {}", style(model).cyan());
        }
    }
    Ok(())
}

async fn key_list(state: &AppState, json: bool) -> Result<()> {
    let entries = state.provider_service.list_credentials().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!();
        println!(
            "  {} No keys stored. Add one with: {}",
            style("i").blue().bold(),
            style("prpsmith key set openai").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Provider").fg(Color::White),
        Cell::new("Key").fg(Color::White),
        Cell::new("Model").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for entry in &entries {
        let key = if entry.masked_key.is_empty() {
            Cell::new("-").fg(Color::DarkGrey)
        } else {
            Cell::new(&entry.masked_key).fg(Color::Cyan)
        };
        table.add_row(vec![
            Cell::new(&entry.provider),
            key,
            Cell::new(entry.model.as_deref().unwrap_or("-")),
            Cell::new(entry.updated_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

async fn key_clear(state: &AppState, provider: &str, all: bool, json: bool) -> Result<()> {
    let id = storable_provider(provider)?;

    if all {
        state.provider_service.clear_credential(id).await?;
    } else {
        state
            .provider_service
            .update_credential(id, Some(""), None)
            .await?;
    }

    if json {
        println!("{}", serde_json::json!({"cleared": true, "provider": id, "model_kept": !all}));
    } else {
        println!(
            "  {} Stored key for {} removed",
            style("✓").green().bold(),
            style(id.display_name()).bold()
        );
    }
    Ok(())
}
