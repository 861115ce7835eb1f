use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyzer::{DEFAULT_BATCH_SIZE, DEFAULT_DELAY_SECS, DEFAULT_TIMEOUT_SECS};
use crate::cli::Cli;

const DEFAULT_OUTPUT: &str = "text";

/// Configuration file structure that mirrors CLI arguments
/// All fields are optional to allow partial configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// The site to analyze
    pub url: Option<String>,

    /// Per-request timeout in seconds
    pub timeout: Option<u64>,

    /// Delay before each page fetch in seconds
    pub delay: Option<f64>,

    /// Maximum number of sitemap URLs to analyze
    pub limit: Option<usize>,

    /// Skip broken link and image validation
    pub skip_links: Option<bool>,

    /// Links checked concurrently per batch
    pub workers: Option<usize>,

    /// Target keyword for keyword density
    pub keyword: Option<String>,

    /// Output format: text or json
    pub output: Option<String>,

    /// Save the JSON report to a file
    pub save: Option<String>,

    /// Verbose output
    pub verbose: Option<bool>,
}

/// Configuration file format based on file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                "toml" => Some(ConfigFormat::Toml),
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                _ => None,
            })
    }

    pub fn extensions(&self) -> &[&str] {
        match self {
            ConfigFormat::Json => &["json"],
            ConfigFormat::Toml => &["toml"],
            ConfigFormat::Yaml => &["yaml", "yml"],
        }
    }
}

const FORMATS: [ConfigFormat; 3] = [ConfigFormat::Json, ConfigFormat::Toml, ConfigFormat::Yaml];

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let format = ConfigFormat::from_path(path)
            .with_context(|| format!("Unsupported config file format: {}", path.display()))?;

        let config = match format {
            ConfigFormat::Json => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            ConfigFormat::Toml => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            ConfigFormat::Yaml => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
        };

        Ok(config)
    }

    /// Default configuration file locations, highest priority first:
    /// `./seoscan.*`, then `$XDG_CONFIG_HOME/seoscan/config.*` (or `~/.config`)
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        for format in &FORMATS {
            for ext in format.extensions() {
                paths.push(PathBuf::from(format!("seoscan.{}", ext)));
            }
        }

        let config_home = std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")));

        if let Some(config_home) = config_home {
            let seoscan_dir = config_home.join("seoscan");
            for format in &FORMATS {
                for ext in format.extensions() {
                    paths.push(seoscan_dir.join(format!("config.{}", ext)));
                }
            }
        }

        paths
    }

    /// Returns the first configuration file found, or None if no config exists
    pub fn from_default_paths() -> Result<Option<Self>> {
        for path in Self::default_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading config file");
                return Ok(Some(Self::from_file(&path)?));
            }
        }
        Ok(None)
    }

    /// Applies `--config` (or the default locations) to the parsed CLI
    pub fn resolve(cli: &Cli) -> Result<Cli> {
        let config = match &cli.config {
            Some(path) => Some(Self::from_file(Path::new(path))?),
            None => Self::from_default_paths()?,
        };

        Ok(match config {
            Some(config) => config.merge_with_cli(cli),
            None => cli.clone(),
        })
    }

    /// Merge this configuration with CLI arguments
    /// A CLI value that differs from its default wins over the config file
    pub fn merge_with_cli(&self, cli: &Cli) -> Cli {
        Cli {
            url: cli.url.clone(),
            timeout: if cli.timeout != DEFAULT_TIMEOUT_SECS {
                cli.timeout
            } else {
                self.timeout.unwrap_or(cli.timeout)
            },
            delay: if cli.delay != DEFAULT_DELAY_SECS {
                cli.delay
            } else {
                self.delay.unwrap_or(cli.delay)
            },
            limit: cli.limit.or(self.limit),
            skip_links: if cli.skip_links {
                cli.skip_links
            } else {
                self.skip_links.unwrap_or(cli.skip_links)
            },
            workers: if cli.workers != DEFAULT_BATCH_SIZE {
                cli.workers
            } else {
                self.workers.unwrap_or(cli.workers)
            },
            keyword: cli.keyword.clone().or_else(|| self.keyword.clone()),
            output: if cli.output != DEFAULT_OUTPUT {
                cli.output.clone()
            } else {
                self.output.clone().unwrap_or_else(|| cli.output.clone())
            },
            save: cli.save.clone().or_else(|| self.save.clone()),
            verbose: if cli.verbose {
                cli.verbose
            } else {
                self.verbose.unwrap_or(cli.verbose)
            },
            config: cli.config.clone(),
        }
    }
}
