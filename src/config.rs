//! Sampler configuration from a TOML file and `GG_SAMPLER_*` environment
//! variables.
//!
//! Environment values override file values. Missing or invalid values fall
//! back to defaults without crashing; only an unreadable or malformed file
//! is an error.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `GG_SAMPLER_CACHE_LENGTH` | unset | Cache capacity in slots |
//! | `GG_SAMPLER_GENERATION_STEPS` | 64 | Tokens generated per call |
//! | `GG_SAMPLER_ECHO` | false | Include the prompt in outputs |
//! | `GG_SAMPLER_RETURN_SCORES` | false | Return per-step scores |
//! | `GG_SAMPLER_LOG_LEVEL` | info | `tracing` env-filter directive |
//! | `GG_SAMPLER_LOG_FORMAT` | json | `json` or `pretty` |

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::engine::SamplerConfig;
use crate::telemetry::{LogConfig, LogFormat};

/// Default tokens generated per call.
pub const DEFAULT_GENERATION_STEPS: usize = 64;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("Invalid config file: {0}")]
    Parse(String),
}

/// Logging section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
    pub output_path: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            output_path: None,
        }
    }
}

/// All sampler settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    pub cache_length: Option<usize>,
    pub generation_steps: usize,
    pub echo: bool,
    pub return_scores: bool,
    pub log: LogSettings,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            cache_length: None,
            generation_steps: DEFAULT_GENERATION_STEPS,
            echo: false,
            return_scores: false,
            log: LogSettings::default(),
        }
    }
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a boolean env var (`1/0`, `true/false`, `yes/no`).
fn parse_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

impl SamplerSettings {
    /// Overlay `GG_SAMPLER_*` environment variables.
    pub fn merge_env(mut self) -> Self {
        let cache_length = parse_usize("GG_SAMPLER_CACHE_LENGTH", 0);
        if cache_length > 0 {
            self.cache_length = Some(cache_length);
        }
        self.generation_steps = parse_usize("GG_SAMPLER_GENERATION_STEPS", self.generation_steps);
        self.echo = parse_bool("GG_SAMPLER_ECHO", self.echo);
        self.return_scores = parse_bool("GG_SAMPLER_RETURN_SCORES", self.return_scores);
        if let Ok(level) = std::env::var("GG_SAMPLER_LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.log.level = level.trim().to_string();
            }
        }
        if let Some(format) = std::env::var("GG_SAMPLER_LOG_FORMAT")
            .ok()
            .and_then(|v| LogFormat::parse(v.trim()))
        {
            self.log.format = format;
        }
        self
    }

    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            cache_length: self.cache_length,
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            format: self.log.format,
            level: self.log.level.clone(),
            output_path: self.log.output_path.clone(),
        }
    }

    /// Effective values as `GG_SAMPLER_*` key/value pairs.
    pub fn effective(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "GG_SAMPLER_CACHE_LENGTH",
                self.cache_length.map(|n| n.to_string()).unwrap_or_else(|| "unset".into()),
            ),
            ("GG_SAMPLER_GENERATION_STEPS", self.generation_steps.to_string()),
            ("GG_SAMPLER_ECHO", self.echo.to_string()),
            ("GG_SAMPLER_RETURN_SCORES", self.return_scores.to_string()),
            ("GG_SAMPLER_LOG_LEVEL", self.log.level.clone()),
            (
                "GG_SAMPLER_LOG_FORMAT",
                match self.log.format {
                    LogFormat::Json => "json".into(),
                    LogFormat::Pretty => "pretty".into(),
                },
            ),
        ]
    }
}

/// Defaults overlaid with the environment.
pub fn load() -> SamplerSettings {
    SamplerSettings::default().merge_env()
}

/// Read a TOML file. Does not apply the environment.
pub fn load_file(path: &Path) -> Result<SamplerSettings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    SamplerSettings::from_toml(&text)
}
