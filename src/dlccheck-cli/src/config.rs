//! Configuration management for dlccheck

use anyhow::{Context, Result};
use dlccheck::{ConflictPolicy, EmptyTokens, Options, ReportFormat};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::Cli;

/// Settings read from `config.toml`; unset fields fall back to defaults
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub archive_pattern: Option<String>,
    pub conflict_policy: Option<ConflictPolicy>,
    pub empty_tokens: Option<EmptyTokens>,
    pub format: Option<ReportFormat>,
}

/// Effective settings of one run
#[derive(Debug, PartialEq, Eq)]
pub struct Settings {
    pub options: Options,
    pub format: ReportFormat,
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("dlccheck");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the default config file, or defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load an explicitly named config file, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Combine with command-line flags, which take precedence
    pub fn resolve(self, cli: &Cli) -> Settings {
        let defaults = Options::default();
        let options = Options {
            archive_pattern: cli
                .archives
                .clone()
                .or(self.archive_pattern)
                .unwrap_or(defaults.archive_pattern),
            conflict_policy: cli
                .conflicts
                .map(ConflictPolicy::from)
                .or(self.conflict_policy)
                .unwrap_or(defaults.conflict_policy),
            empty_tokens: cli
                .empty_tokens
                .map(EmptyTokens::from)
                .or(self.empty_tokens)
                .unwrap_or(defaults.empty_tokens),
        };

        let format = if cli.json {
            ReportFormat::Json
        } else {
            self.format.unwrap_or_default()
        };

        Settings { options, format }
    }
}
