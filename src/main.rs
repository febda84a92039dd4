//! gg-sampler-cli entry point.
//!
//! ## CLI Subcommands
//!
//! - `gg-sampler-cli generate` - Sample continuations for one or more prompts
//! - `gg-sampler-cli config show|defaults|validate` - Inspect configuration
//! - `gg-sampler-cli version` / `help`

use std::path::PathBuf;
use std::process::ExitCode;

use gg_sampler::cli::{config_cmd, resolve_settings, run_generate, GenerateArgs};
use gg_sampler::config;
use gg_sampler::telemetry::{init_logging, init_metrics, LogConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match command {
        "generate" => {
            let parsed = match GenerateArgs::parse(&args[2..]) {
                Ok(parsed) => parsed,
                Err(e) => {
                    eprintln!("{}", e);
                    print_command_help("generate");
                    return ExitCode::FAILURE;
                }
            };
            let settings = match resolve_settings(&parsed) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            start_telemetry(&settings.log_config());
            ExitCode::from(run_generate(&parsed, &settings).await as u8)
        }
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            match subcommand {
                "show" => {
                    config_cmd::run_show(&config::load());
                    ExitCode::SUCCESS
                }
                "defaults" => {
                    config_cmd::run_defaults();
                    ExitCode::SUCCESS
                }
                "validate" => {
                    let file = match args.get(3).map(|s| s.as_str()) {
                        Some("--file") => match args.get(4) {
                            Some(path) => Some(PathBuf::from(path)),
                            None => {
                                eprintln!("Missing value for --file");
                                return ExitCode::FAILURE;
                            }
                        },
                        _ => None,
                    };
                    ExitCode::from(config_cmd::run_validate(file.as_deref()) as u8)
                }
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    ExitCode::FAILURE
                }
            }
        }
        "help" | "--help" | "-h" => {
            if let Some(subcommand) = args.get(2) {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("gg-sampler {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn start_telemetry(log: &LogConfig) {
    if let Err(e) = init_logging(log) {
        eprintln!("Logging disabled: {}", e);
    }
    init_metrics();
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "gg-sampler - batched greedy sampling v{}

USAGE:
    gg-sampler-cli [COMMAND] [OPTIONS]

COMMANDS:
    generate     Sample continuations for one or more prompts
    config       Inspect configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

EXAMPLES:
    gg-sampler-cli generate --tokenizer tokenizer.json --table bigram.json \"Hello\"
    gg-sampler-cli generate --tokenizer tok.json --table t.json --steps 8 --echo \"a\" \"b\"
    gg-sampler-cli config show

ENVIRONMENT:
    GG_SAMPLER_CACHE_LENGTH      Cache capacity in slots
    GG_SAMPLER_GENERATION_STEPS  Tokens generated per call (default: 64)
    GG_SAMPLER_ECHO              Include the prompt in outputs
    GG_SAMPLER_RETURN_SCORES     Return per-step scores
    GG_SAMPLER_LOG_LEVEL         Log filter (default: info)
    GG_SAMPLER_LOG_FORMAT        json or pretty (default: json)

EXIT CODES:
    0  Success
    1  Failure
",
        version
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "generate" => {
            eprintln!(
                "gg-sampler-cli generate - Sample continuations

USAGE:
    gg-sampler-cli generate --tokenizer <FILE> --table <FILE> [OPTIONS] <PROMPT>...

OPTIONS:
    --tokenizer <FILE>     Hugging Face tokenizer.json
    --table <FILE>         JSON bigram score table
    --config <FILE>        TOML settings file
    --steps <N>            Tokens to generate past the longest prompt
    --cache-length <N>     Cache capacity in slots
    --forbid <TOKEN>       Never generate this token (repeatable)
    --echo                 Include the prompt in the output
    --scores               Return per-step scores (with --json)
    --json                 Print the full output as JSON

EXIT CODES:
    0  Sampling completed
    1  Invalid arguments, configuration or sampling failure
"
            );
        }
        "config" => {
            eprintln!(
                "gg-sampler-cli config - Inspect configuration

USAGE:
    gg-sampler-cli config <SUBCOMMAND> [OPTIONS]

SUBCOMMANDS:
    show                   Show effective configuration
    defaults               Show default configuration
    validate [--file PATH] Validate a TOML file overlaid with the environment
"
            );
        }
        _ => {
            eprintln!(
                "No detailed help available for '{}'. Use 'gg-sampler-cli help' for general usage.",
                command
            );
        }
    }
}
