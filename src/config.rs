use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::hooks::PolicySettings;

const DEFAULT_MODEL: &str = "claude-haiku-4-5";
const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ConfigColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) offline: bool,
    #[serde(default)]
    pub(crate) no_color: bool,
    #[serde(default)]
    pub(crate) debug: bool,
    #[serde(default)]
    pub(crate) color: Option<ConfigColorMode>,
    #[serde(default)]
    pub(crate) state_dir: Option<PathBuf>,
    #[serde(default)]
    pub(crate) model: Option<String>,
    #[serde(default)]
    pub(crate) api_url: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub(crate) api_key_env: Option<String>,
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    #[serde(default)]
    pub(crate) max_retries: Option<usize>,
    #[serde(default)]
    pub(crate) max_tokens: Option<u32>,
    #[serde(default)]
    pub(crate) gated_commands: Option<Vec<String>>,

    /// Where this config came from, for the startup log line
    #[serde(skip)]
    pub(crate) source: Option<PathBuf>,
    #[serde(skip)]
    pub(crate) parse_errors: Vec<String>,
}

impl Config {
    /// Load the first config file that parses. Nothing is printed here:
    /// logging is not up yet, so outcomes are kept for `report`.
    pub(crate) fn load() -> Self {
        let mut parse_errors = Vec::new();

        for path in Self::get_config_paths() {
            if path.exists()
                && let Ok(content) = fs::read_to_string(&path)
            {
                match toml::from_str::<Config>(&content) {
                    Ok(mut config) => {
                        config.source = Some(path);
                        config.parse_errors = parse_errors;
                        return config;
                    }
                    Err(e) => parse_errors.push(format!("{}: {e}", path.display())),
                }
            }
        }

        Self {
            parse_errors,
            ..Self::default()
        }
    }

    pub(crate) fn report(&self) {
        if let Some(path) = &self.source {
            tracing::debug!(path = %path.display(), "loaded config");
        }
        for error in &self.parse_errors {
            tracing::warn!("failed to parse config {error}");
        }
    }

    pub(crate) fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub(crate) fn api_url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub(crate) fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV)
    }

    pub(crate) fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub(crate) fn policy(&self) -> PolicySettings {
        let mut settings = PolicySettings::default();
        if let Some(gated) = &self.gated_commands {
            settings.gated_commands = gated.clone();
        }
        if let Some(retries) = self.max_retries {
            settings.max_retries = retries;
        }
        if let Some(tokens) = self.max_tokens {
            settings.max_tokens = tokens;
        }
        settings
    }

    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. XDG config: ~/.config/ccguard/config.toml (Linux/cross-platform)
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("ccguard").join("config.toml"));
        }

        // 2. macOS Application Support: ~/Library/Application Support/ccguard/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            let macos_path = config_dir.join("ccguard").join("config.toml");
            if !paths.contains(&macos_path) {
                paths.push(macos_path);
            }
        }

        // 3. Home directory: ~/.ccguard.toml
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".ccguard.toml"));
        }

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let paths = Config::get_config_paths();
        assert!(!paths.is_empty());
        assert!(paths.iter().all(|p| p.to_string_lossy().contains("ccguard")));
    }

    #[test]
    fn defaults_without_file_values() {
        let config = Config::default();
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert_eq!(config.api_key_env(), "ANTHROPIC_API_KEY");
        assert_eq!(config.timeout_secs(), 10);
        assert_eq!(config.policy(), PolicySettings::default());
    }

    #[test]
    fn policy_overrides_from_toml() {
        let config: Config = toml::from_str(
            r#"
            state_dir = "/var/tmp/ccguard"
            max_retries = 0
            max_tokens = 64
            gated_commands = ["git push", "npm publish"]
            "#,
        )
        .unwrap();
        assert_eq!(config.state_dir, Some(PathBuf::from("/var/tmp/ccguard")));
        let policy = config.policy();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.max_tokens, 64);
        assert_eq!(policy.gated_commands, vec!["git push", "npm publish"]);
    }

    #[test]
    fn unknown_color_is_rejected() {
        assert!(toml::from_str::<Config>(r#"color = "sometimes""#).is_err());
    }
}
