//! End-to-end sampling: tokenize, size buffers, run the state machine,
//! post-process and detokenize.

use std::time::Instant;

use ndarray::s;
use tracing::{info, warn};

use super::backend::ModelBackend;
use super::codec::TokenCodec;
use super::error::SamplerError;
use super::input::{validate_encoded, validate_prompts};
use super::machine::SamplingStateMachine;
use super::output::{mask_tokens_after_eos, output_range, SamplerOutput};
use super::prefill::PrefillInput;
use super::select::{Greedy, TokenSelector};
use super::state::SamplingState;
use super::vision::{PatchedImages, VisionPreprocessor, PLACEHOLDER_TOKEN};
use crate::telemetry::{record_call_failure, record_call_success, GenerationSpan};

/// Construction-time sampler configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Cache capacity in slots. Falls back to the backend's default.
    pub cache_length: Option<usize>,
}

/// One sampling call.
#[derive(Debug, Clone)]
pub struct SampleRequest {
    pub prompts: Vec<String>,
    /// Tokens to generate past the longest prompt.
    pub generation_steps: usize,
    pub images: Option<PatchedImages>,
    /// Include prompt tokens in the output.
    pub echo: bool,
    /// Return per-step score vectors.
    pub return_scores: bool,
    /// Strings that must each encode to exactly one id.
    pub forbidden_tokens: Option<Vec<String>>,
}

impl SampleRequest {
    pub fn new<I, S>(prompts: I, generation_steps: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompts: prompts.into_iter().map(Into::into).collect(),
            generation_steps,
            images: None,
            echo: false,
            return_scores: true,
            forbidden_tokens: None,
        }
    }

    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn return_scores(mut self, return_scores: bool) -> Self {
        self.return_scores = return_scores;
        self
    }

    pub fn forbid<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forbidden_tokens = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    pub fn images(mut self, images: PatchedImages) -> Self {
        self.images = Some(images);
        self
    }
}

/// Sampler bound to one backend, codec and set of parameters.
///
/// Each `generate` call allocates a fresh state and cache; nothing carries
/// over between calls.
pub struct Sampler<B: ModelBackend, C: TokenCodec> {
    backend: B,
    codec: C,
    params: B::Params,
    cache_length: usize,
    selector: Box<dyn TokenSelector>,
    vision: Option<Box<dyn VisionPreprocessor>>,
}

impl<B: ModelBackend, C: TokenCodec> Sampler<B, C> {
    /// Create a sampler. Fails if no cache length can be resolved.
    pub fn new(backend: B, codec: C, params: B::Params, config: SamplerConfig) -> Result<Self, SamplerError> {
        let cache_length = resolve_cache_length(config.cache_length, backend.default_cache_length())?;
        info!(cache_length, vocab_size = backend.vocab_size(), "sampler ready");
        Ok(Self {
            backend,
            codec,
            params,
            cache_length,
            selector: Box::new(Greedy),
            vision: None,
        })
    }

    /// Replace the token selector. Greedy is the default.
    pub fn with_selector(mut self, selector: impl TokenSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    /// Enable image inputs.
    pub fn with_vision(mut self, vision: impl VisionPreprocessor + 'static) -> Self {
        self.vision = Some(Box::new(vision));
        self
    }

    pub fn cache_length(&self) -> usize {
        self.cache_length
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Encode a prompt with the beginning-of-sequence id prepended.
    pub fn tokenize(&self, text: &str) -> Result<Vec<u32>, SamplerError> {
        let mut ids = vec![self.codec.bos_id()];
        ids.extend(self.codec.encode(text)?);
        Ok(ids)
    }

    /// Encode forbidden strings; each must be exactly one in-vocabulary id.
    pub fn forbidden_ids(&self, tokens: &[String]) -> Result<Vec<u32>, SamplerError> {
        let vocab_size = self.backend.vocab_size();
        let mut ids = Vec::with_capacity(tokens.len());
        for token in tokens {
            match self.codec.encode(token)?.as_slice() {
                [id] if (*id as usize) < vocab_size => ids.push(*id),
                [id] => {
                    return Err(SamplerError::InputValidation(format!(
                        "forbidden token {:?} maps to id {} outside vocabulary of {}",
                        token, id, vocab_size
                    )))
                }
                other => {
                    return Err(SamplerError::InvalidForbiddenToken {
                        token: token.clone(),
                        ids: other.len(),
                    })
                }
            }
        }
        Ok(ids)
    }

    /// Generate continuations for every prompt in `request`.
    pub fn generate(&self, request: &SampleRequest) -> Result<SamplerOutput, SamplerError> {
        let span = GenerationSpan::new(request.prompts.len(), request.generation_steps);
        let _entered = span.enter();
        let started = Instant::now();

        let result = self.generate_inner(request, &span);
        span.finish(&result);
        match &result {
            Ok((_, decode_steps)) => {
                record_call_success(request.prompts.len(), *decode_steps, started.elapsed())
            }
            Err(e) => record_call_failure(e.kind()),
        }
        result.map(|(output, _)| output)
    }

    fn generate_inner(
        &self,
        request: &SampleRequest,
        span: &GenerationSpan,
    ) -> Result<(SamplerOutput, usize), SamplerError> {
        validate_prompts(&request.prompts)?;

        let forbidden_token_ids = request
            .forbidden_tokens
            .as_deref()
            .map(|tokens| self.forbidden_ids(tokens))
            .transpose()?;

        let prompts = request
            .prompts
            .iter()
            .enumerate()
            .map(|(i, prompt)| {
                let ids = self.tokenize(prompt)?;
                validate_encoded(i, &ids)?;
                Ok(ids)
            })
            .collect::<Result<Vec<_>, SamplerError>>()?;

        let mm_extra = match &request.images {
            Some(images) => {
                if images.dim().0 != prompts.len() {
                    return Err(SamplerError::InputValidation(format!(
                        "images cover {} sequences, batch has {}",
                        images.dim().0,
                        prompts.len()
                    )));
                }
                let vision = self.vision.as_ref().ok_or_else(|| {
                    SamplerError::InputValidation(
                        "images supplied but no vision preprocessor is configured".into(),
                    )
                })?;
                vision.extra_tokens(images)
            }
            None => 0,
        };

        let max_input_length = prompts.iter().map(Vec::len).max().unwrap_or(0);
        let total_sampling_steps = max_input_length + request.generation_steps + mm_extra;
        if total_sampling_steps > self.cache_length {
            return Err(SamplerError::CacheCapacityExceeded {
                required: total_sampling_steps,
                capacity: self.cache_length,
            });
        }
        span.record_total_steps(total_sampling_steps);

        let mut machine = SamplingStateMachine::new(
            &self.backend,
            &self.params,
            self.cache_length,
            self.codec.special_tokens(),
            self.selector.as_ref(),
        );
        if let Some(vision) = self.vision.as_deref() {
            machine = machine.with_vision(vision);
        }

        let state = machine.init(PrefillInput {
            prompts: &prompts,
            total_sampling_steps,
            images: request.images.as_ref(),
            include_logits: request.return_scores,
            forbidden_token_ids,
        })?;
        let boundary = state.decoding_step;
        let state = machine.run(state)?;
        let decode_steps = state.decoding_step - boundary;
        span.record_decode_steps(decode_steps);

        let output = self.package(&state, request.echo)?;
        info!(
            batch_size = output.len(),
            total_sampling_steps,
            decode_steps,
            "sampling complete"
        );
        Ok((output, decode_steps))
    }

    /// Mask after end-of-sequence, slice per sequence, detokenize.
    fn package(&self, state: &SamplingState<B::Cache>, echo: bool) -> Result<SamplerOutput, SamplerError> {
        let special = self.codec.special_tokens();
        let masked = mask_tokens_after_eos(&state.token_buffer, special.eos, special.pad);

        let mut tokens = Vec::with_capacity(state.batch_size());
        let mut scores = state.logits_buffer.as_ref().map(|_| Vec::with_capacity(state.batch_size()));
        for (i, &num_tokens) in state.num_input_tokens.iter().enumerate() {
            let range = output_range(num_tokens, state.total_sampling_steps, echo);
            tokens.push(masked.slice(s![i, range.clone()]).to_vec());
            if let (Some(buffer), Some(out)) = (state.logits_buffer.as_ref(), scores.as_mut()) {
                out.push(
                    buffer
                        .slice(s![i, range, ..])
                        .outer_iter()
                        .map(|row| row.to_vec())
                        .collect(),
                );
            }
        }

        // Placeholder slots have no text form.
        let text = tokens
            .iter()
            .map(|ids| {
                let ids: Vec<u32> = ids.iter().copied().filter(|&t| t != PLACEHOLDER_TOKEN).collect();
                self.codec.decode(&ids)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SamplerOutput { text, tokens, scores })
    }
}

/// Explicit length first, then the backend's configured length.
fn resolve_cache_length(explicit: Option<usize>, backend_default: Option<usize>) -> Result<usize, SamplerError> {
    match (explicit, backend_default) {
        (Some(0), _) => Err(SamplerError::Configuration("cache length must be > 0".into())),
        (Some(length), _) => Ok(length),
        (None, Some(length)) if length > 0 => {
            warn!(
                cache_length = length,
                "cache length taken from the backend configuration; this fallback is deprecated, set SamplerConfig::cache_length"
            );
            Ok(length)
        }
        _ => Err(SamplerError::Configuration("sampler cache length must be set".into())),
    }
}
