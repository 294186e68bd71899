use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

const DEFAULT_LABEL: &str = "stale-fix";
const DEFAULT_COMMENT: &str =
    "This looks resolved by {prs}. Closing; please reopen if the problem persists.";
const DEFAULT_MAX_PRS: usize = 200;

/// Top-level configuration loaded from .issue-sweeper.toml.
/// All fields are optional — the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// GitHub-specific settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Triage behavior settings
    #[serde(default)]
    pub triage: TriageConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriageConfig {
    /// Label applied to issues closed by the sweep
    pub label: Option<String>,
    /// Closing-comment template; `{prs}` expands to the PR list
    pub comment: Option<String>,
    /// How many merged PRs to page in per sweep
    pub max_prs: Option<usize>,
}

impl Config {
    /// Load configuration from .issue-sweeper.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".issue-sweeper.toml");
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };

        if config.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                config.github.token = Some(token);
            }
        }

        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// falls back to GITHUB_TOKEN env var.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }

    pub fn label(&self) -> &str {
        self.triage.label.as_deref().unwrap_or(DEFAULT_LABEL)
    }

    pub fn comment(&self) -> &str {
        self.triage.comment.as_deref().unwrap_or(DEFAULT_COMMENT)
    }

    pub fn max_prs(&self) -> usize {
        self.triage.max_prs.unwrap_or(DEFAULT_MAX_PRS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert_eq!(config.label(), "stale-fix");
        assert_eq!(config.max_prs(), 200);
        assert!(config.comment().contains("{prs}"));
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[triage]
label = "resolved-by-merge"
comment = "Fixed by {prs}."
max_prs = 50
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.label(), "resolved-by-merge");
        assert_eq!(config.comment(), "Fixed by {prs}.");
        assert_eq!(config.max_prs(), 50);
    }
}
