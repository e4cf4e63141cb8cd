//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use fieldalert_redcap::{ProjectConfig, RedcapConfig};
use fieldalert_rules::RuleConfig;
use fieldalert_sweeper::SweepConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Rule thresholds
    #[serde(default)]
    pub rules: RuleConfig,

    /// Sweep switches
    #[serde(default)]
    pub sweep: SweepConfig,

    /// REDCap connection and projects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redcap: Option<RedcapConfig>,

    /// Output settings
    #[serde(default)]
    pub settings: Settings,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl Config {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".fieldalert").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist; a missing default file yields the default
    /// configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Check everything that can be checked before any network access.
    pub fn validate(&self) -> Result<()> {
        self.rules
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        if let Some(redcap) = &self.redcap {
            redcap.validate()?;
        }
        Ok(())
    }

    /// Get the REDCap section.
    pub fn redcap(&self) -> Result<&RedcapConfig> {
        self.redcap
            .as_ref()
            .ok_or_else(|| CliError::Config("No [redcap] section configured".into()))
    }

    /// Projects selected by an optional name filter.
    pub fn projects(&self, name: Option<&str>) -> Result<Vec<&ProjectConfig>> {
        let redcap = self.redcap()?;
        let projects: Vec<&ProjectConfig> = match name {
            Some(name) => redcap
                .project(name)
                .map(|p| vec![p])
                .ok_or_else(|| CliError::Config(format!("Project '{}' not found", name)))?,
            None => redcap.projects.iter().collect(),
        };
        if projects.is_empty() {
            return Err(CliError::Config("No REDCap projects configured".into()));
        }
        Ok(projects)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}
