//! CLI command definitions for the `prpsmith` binary.
//!
//! Uses clap derive macros for argument parsing. Commands follow a noun-verb
//! pattern for settings (`prpsmith key set`) and plain verbs for generation
//! (`prpsmith prp`).

pub mod generate;
pub mod key;
pub mod provider;

use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use prpsmith_types::prp::Generated;
use prpsmith_types::provider::{ProviderId, SessionOverrides};

/// Generate Product Requirements Prompts with the LLM provider of your choice.
#[derive(Parser)]
#[command(name = "prpsmith", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Provider for this invocation (overrides the configured default).
    #[arg(long, global = true, env = "PRPSMITH_PROVIDER")]
    pub provider: Option<String>,

    /// API key for this invocation only. Applies to the selected provider.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and select LLM providers.
    Provider {
        #[command(subcommand)]
        action: provider::ProviderCommand,
    },

    /// Manage stored API keys and model overrides.
    Key {
        #[command(subcommand)]
        action: key::KeyCommand,
    },

    /// Send one prompt to the selected provider.
    Ask {
        /// Prompt text.
        prompt: String,
    },

    /// Fill the project setup form from a free-text description.
    Form {
        /// What the project is about.
        description: String,
    },

    /// Generate a PRP document.
    Prp(generate::PrpArgs),

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Cli {
    /// Session overrides from `--provider` and `--api-key`.
    ///
    /// `--api-key` binds to `--provider` when given, else to `default`.
    pub fn session(&self, default: ProviderId) -> anyhow::Result<SessionOverrides> {
        let chosen = self
            .provider
            .as_deref()
            .map(str::parse::<ProviderId>)
            .transpose()?;

        let mut session = SessionOverrides::new();
        if let Some(id) = chosen {
            session = session.with_provider(id);
        }
        if let Some(key) = &self.api_key {
            session = session.with_api_key(chosen.unwrap_or(default), key.clone());
        }
        Ok(session)
    }
}

/// A spinner on stderr, hidden for JSON or quiet output.
pub fn spinner(message: &str, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Print the degraded-result warning on stderr.
pub fn warn_if_degraded<T>(generated: &Generated<T>, quiet: bool) {
    if quiet {
        return;
    }
    if let Some(reason) = generated.fallback_reason() {
        eprintln!(
            "  {} Provider unavailable, showing fallback content: {}",
            style("!").yellow().bold(),
            style(reason).yellow()
        );
    }
}

/// JSON envelope for agent results.
pub fn generated_json<T: serde::Serialize>(generated: &Generated<T>) -> serde_json::Value {
    serde_json::json!({
        "result": generated.value,
        "origin": generated.origin,
        "degraded": generated.is_degraded(),
        "reason": generated.fallback_reason(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prpsmith_types::prp::Origin;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_session_binds_key_to_chosen_provider() {
        let cli = parse(&["prpsmith", "--provider", "Gemini", "--api-key", "g-key", "ask", "hi"]);
        let session = cli.session(ProviderId::OpenAi).unwrap();
        assert_eq!(session.provider(), Some(ProviderId::Gemini));
        assert_eq!(session.api_key(ProviderId::Gemini), Some("g-key"));
        assert_eq!(session.api_key(ProviderId::OpenAi), None);
    }

    #[test]
    fn test_session_key_defaults_to_registry_default() {
        let cli = parse(&["prpsmith", "ask", "hi", "--api-key", "sk-1"]);
        let session = cli.session(ProviderId::Anthropic).unwrap();
        assert_eq!(session.provider(), None);
        assert_eq!(session.api_key(ProviderId::Anthropic), Some("sk-1"));
    }

    #[test]
    fn test_unknown_provider_lists_valid_names() {
        let cli = parse(&["prpsmith", "--provider", "cohere", "ask", "hi"]);
        let err = cli.session(ProviderId::OpenAi).unwrap_err();
        assert!(err.to_string().contains("openrouter"));
    }

    #[test]
    fn test_generated_json_reports_degradation() {
        let generated = Generated {
            value: "doc".to_string(),
            origin: Origin::Fallback {
                reason: "rate limited".into(),
            },
        };
        let json = generated_json(&generated);
        assert_eq!(json["degraded"], true);
        assert_eq!(json["reason"], "rate limited");
        assert_eq!(json["result"], "doc");
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
