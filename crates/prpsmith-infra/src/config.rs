//! Configuration loading for prpsmith.
//!
//! Reads `config.toml` from the data directory (`~/.prpsmith/` by default)
//! into [`AppConfig`]. Falls back to defaults when the file is missing or
//! malformed. Environment variables always win over the file.

use std::path::{Path, PathBuf};

use prpsmith_types::config::AppConfig;

pub const CONFIG_FILE: &str = "config.toml";

/// Resolve the data directory.
///
/// Priority:
/// 1. `PRPSMITH_DATA_DIR` environment variable
/// 2. `~/.prpsmith`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PRPSMITH_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".prpsmith");
    }

    PathBuf::from(".prpsmith")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`AppConfig::default()`].
/// - Unreadable or unparsable file: logs a warning, returns the default.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// Write `config` to `{data_dir}/config.toml`, creating the directory.
pub async fn save_config(data_dir: &Path, config: &AppConfig) -> Result<(), std::io::Error> {
    let content = toml::to_string_pretty(config).map_err(std::io::Error::other)?;
    tokio::fs::create_dir_all(data_dir).await?;
    tokio::fs::write(data_dir.join(CONFIG_FILE), content).await
}

/// Layer `env` over `config`: a variable set in `env` wins, anything else is
/// looked up in the file. API keys only ever come from `env`.
pub fn layered_lookup<'a, E>(env: E, config: &'a AppConfig) -> impl Fn(&str) -> Option<String> + 'a
where
    E: Fn(&str) -> Option<String> + 'a,
{
    move |key: &str| {
        env(key)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| config.lookup(key))
    }
}

/// [`layered_lookup`] over the process environment.
pub fn env_lookup(config: &AppConfig) -> impl Fn(&str) -> Option<String> + '_ {
    layered_lookup(|key| std::env::var(key).ok(), config)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use prpsmith_types::config::LogFormat;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert!(config.default_provider.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
default_provider = "deepseek"
log_format = "json"

[providers.deepseek]
model = "deepseek-reasoner"
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.default_provider.as_deref(), Some("deepseek"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.lookup("DEEPSEEK_DEFAULT_MODEL").as_deref(),
            Some("deepseek-reasoner")
        );
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join(CONFIG_FILE), "default_provider = [")
            .await
            .unwrap();
        let config = load_config(tmp.path()).await;
        assert!(config.default_provider.is_none());
    }

    #[tokio::test]
    async fn save_then_load_keeps_values() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested");
        let config = AppConfig {
            default_provider: Some("gemini".into()),
            test_mode: Some(true),
            ..Default::default()
        };
        save_config(&dir, &config).await.unwrap();

        let loaded = load_config(&dir).await;
        assert_eq!(loaded.default_provider.as_deref(), Some("gemini"));
        assert_eq!(loaded.test_mode, Some(true));
    }

    #[test]
    fn environment_wins_over_file() {
        let config = AppConfig {
            default_provider: Some("anthropic".into()),
            test_mode: Some(true),
            ..Default::default()
        };
        let env: HashMap<&str, &str> = HashMap::from([
            ("DEFAULT_LLM_PROVIDER", "gemini"),
            ("TEST_MODE", "  "),
            ("OPENAI_API_KEY", "sk-env"),
        ]);
        let lookup = layered_lookup(|key| env.get(key).map(|v| v.to_string()), &config);

        assert_eq!(lookup("DEFAULT_LLM_PROVIDER").as_deref(), Some("gemini"));
        // blank env values do not shadow the file
        assert_eq!(lookup("TEST_MODE").as_deref(), Some("true"));
        assert_eq!(lookup("OPENAI_API_KEY").as_deref(), Some("sk-env"));
        assert!(lookup("GEMINI_API_KEY").is_none());
    }
}
