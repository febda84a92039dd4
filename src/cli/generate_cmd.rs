//! `generate`: run the sampler over a `tokenizer.json` and a bigram table.

use std::path::PathBuf;

use tracing::error;

use super::{ArgCursor, CliError};
use crate::config::{self, ConfigError, SamplerSettings};
use crate::engine::{
    BigramBackend, BigramFile, SampleRequest, Sampler, SamplerError, SamplerHandle,
    SamplerOutput, TokenizerCodec,
};

/// Parsed `generate` arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateArgs {
    pub tokenizer: PathBuf,
    pub table: PathBuf,
    pub config: Option<PathBuf>,
    pub steps: Option<usize>,
    pub cache_length: Option<usize>,
    pub echo: bool,
    pub scores: bool,
    pub json: bool,
    pub forbid: Vec<String>,
    pub prompts: Vec<String>,
}

impl GenerateArgs {
    /// Parse the arguments following `generate`.
    pub fn parse(args: &[String]) -> Result<Self, CliError> {
        let mut parsed = GenerateArgs::default();
        let mut tokenizer = None;
        let mut table = None;
        let mut cursor = ArgCursor::new(args);

        while let Some(arg) = cursor.next_arg() {
            match arg {
                "--tokenizer" => tokenizer = Some(cursor.path(arg)?),
                "--table" => table = Some(cursor.path(arg)?),
                "--config" => parsed.config = Some(cursor.path(arg)?),
                "--steps" => parsed.steps = Some(cursor.usize(arg)?),
                "--cache-length" => parsed.cache_length = Some(cursor.usize(arg)?),
                "--forbid" => parsed.forbid.push(cursor.value(arg)?.to_string()),
                "--echo" => parsed.echo = true,
                "--scores" => parsed.scores = true,
                "--json" => parsed.json = true,
                "--" => {
                    while let Some(rest) = cursor.next_arg() {
                        parsed.prompts.push(rest.to_string());
                    }
                }
                flag if flag.starts_with("--") => {
                    return Err(CliError::UnknownArgument(flag.to_string()));
                }
                prompt => parsed.prompts.push(prompt.to_string()),
            }
        }

        parsed.tokenizer = tokenizer.ok_or(CliError::MissingRequired("--tokenizer"))?;
        parsed.table = table.ok_or(CliError::MissingRequired("--table"))?;
        if parsed.prompts.is_empty() {
            return Err(CliError::MissingRequired("<prompt>"));
        }
        Ok(parsed)
    }

    /// Build the request, with flags taking precedence over settings.
    pub fn request(&self, settings: &SamplerSettings) -> SampleRequest {
        let mut request = SampleRequest::new(self.prompts.iter().cloned(), self.steps.unwrap_or(settings.generation_steps))
            .echo(self.echo || settings.echo)
            .return_scores(self.scores || settings.return_scores);
        if !self.forbid.is_empty() {
            request = request.forbid(self.forbid.iter().cloned());
        }
        request
    }
}

/// File settings (if any) overlaid with the environment and flags.
pub fn resolve_settings(args: &GenerateArgs) -> Result<SamplerSettings, ConfigError> {
    let mut settings = match &args.config {
        Some(path) => config::load_file(path)?.merge_env(),
        None => config::load(),
    };
    if args.cache_length.is_some() {
        settings.cache_length = args.cache_length;
    }
    Ok(settings)
}

/// Load the tokenizer and table named in `args`.
pub fn load_sampler(
    args: &GenerateArgs,
    settings: &SamplerSettings,
) -> Result<Sampler<BigramBackend, TokenizerCodec>, SamplerError> {
    let codec = TokenizerCodec::from_file(&args.tokenizer)?;
    let (backend, table) = BigramFile::from_file(&args.table)?.into_parts();
    Sampler::new(backend, codec, table, settings.sampler_config())
}

/// Run `generate`. Returns the process exit code.
pub async fn run_generate(args: &GenerateArgs, settings: &SamplerSettings) -> i32 {
    let sampler = match load_sampler(args, settings) {
        Ok(sampler) => sampler,
        Err(e) => {
            error!(error = %e, "failed to load sampler");
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let handle = SamplerHandle::new(sampler);
    match handle.generate(args.request(settings)).await {
        Ok(output) => match render(&output, args.json) {
            Ok(text) => {
                println!("{}", text);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Text per line, or the whole output as JSON.
pub fn render(output: &SamplerOutput, json: bool) -> Result<String, serde_json::Error> {
    if json {
        serde_json::to_string_pretty(output)
    } else {
        Ok(output.text.join("\n"))
    }
}
