//! Config CLI subcommands: show, defaults, validate.
//!
//! These read configuration directly from the environment and optional
//! TOML file; nothing is loaded from a model.

use std::path::Path;

use crate::config::{self, SamplerSettings};

/// Print effective config as key-value pairs to stdout.
pub fn run_show(settings: &SamplerSettings) {
    print_config(settings);
}

/// Print default config values (no env overrides) to stdout.
pub fn run_defaults() {
    print_config(&SamplerSettings::default());
}

/// Validate a config file overlaid with the environment.
///
/// Returns 0 if valid, 1 if the file is unreadable or any warnings are found.
pub fn run_validate(file: Option<&Path>) -> i32 {
    let settings = match file {
        Some(path) => match config::load_file(path) {
            Ok(settings) => settings.merge_env(),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                return 1;
            }
        },
        None => config::load(),
    };

    let warnings = validate(&settings);
    for warning in &warnings {
        eprintln!("WARNING: {}", warning);
    }
    if warnings.is_empty() {
        println!("Configuration is valid.");
        0
    } else {
        1
    }
}

/// Obvious misconfigurations.
pub fn validate(settings: &SamplerSettings) -> Vec<String> {
    let mut warnings = Vec::new();
    if settings.generation_steps == 0 {
        warnings.push("GG_SAMPLER_GENERATION_STEPS is 0; only the prefill token is produced".to_string());
    }
    if let Some(cache_length) = settings.cache_length {
        if cache_length <= settings.generation_steps {
            warnings.push(format!(
                "GG_SAMPLER_CACHE_LENGTH ({}) leaves no room for a prompt of GG_SAMPLER_GENERATION_STEPS ({})",
                cache_length, settings.generation_steps
            ));
        }
    }
    if tracing_subscriber::EnvFilter::try_new(settings.log_config().directives()).is_err() {
        warnings.push(format!("GG_SAMPLER_LOG_LEVEL ({}) is not a valid filter", settings.log.level));
    }
    warnings
}

fn print_config(settings: &SamplerSettings) {
    for (key, value) in settings.effective() {
        println!("{}={}", key, value);
    }
}
