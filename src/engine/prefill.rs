//! Prefill: build the initial sampling state from tokenized prompts.
//!
//! Prompts of different lengths share one padded buffer. The prefill pass
//! covers the first sequence's prompt length; rows with longer prompts catch
//! up during decode through the prompt-override rule.

use ndarray::{s, Array2, Array3};
use tracing::debug;

use super::backend::ModelBackend;
use super::error::SamplerError;
use super::machine::SamplingStateMachine;
use super::mask::prefill_span_mask;
use super::positions::{build_positions_from_mask, dense_positions};
use super::state::SamplingState;
use super::vision::{PatchedImages, PLACEHOLDER_TOKEN};

/// Everything `init` needs for one call.
#[derive(Debug, Clone)]
pub struct PrefillInput<'p> {
    /// Tokenized prompts, one per sequence, variable length.
    pub prompts: &'p [Vec<u32>],
    pub total_sampling_steps: usize,
    pub images: Option<&'p PatchedImages>,
    /// Materialize a `[batch, width, vocab]` score buffer.
    pub include_logits: bool,
    pub forbidden_token_ids: Option<Vec<u32>>,
}

impl<'a, B: ModelBackend> SamplingStateMachine<'a, B> {
    /// Run the prefill pass and return the first decode state.
    pub fn init(&self, input: PrefillInput<'_>) -> Result<SamplingState<B::Cache>, SamplerError> {
        let PrefillInput {
            prompts,
            total_sampling_steps,
            images,
            include_logits,
            forbidden_token_ids,
        } = input;

        let batch = prompts.len();
        if batch == 0 {
            return Err(SamplerError::InputValidation("no prompts to sample from".into()));
        }
        if let Some((i, prompt)) = prompts
            .iter()
            .enumerate()
            .find(|(_, p)| p.is_empty() || p.len() > total_sampling_steps)
        {
            return Err(SamplerError::InputValidation(format!(
                "prompt {} has {} tokens; expected 1..={}",
                i,
                prompt.len(),
                total_sampling_steps
            )));
        }

        let width = total_sampling_steps + 1;
        let pad = self.special.pad;
        let mut num_input_tokens: Vec<usize> = prompts.iter().map(Vec::len).collect();

        // Slots past the prompt count as valid here so generated tokens keep
        // getting fresh positions.
        let mut token_buffer = Array2::from_elem((batch, width), pad);
        let mut position_mask = Array2::from_elem((batch, width), true);
        for (i, prompt) in prompts.iter().enumerate() {
            for (j, &token) in prompt.iter().enumerate() {
                token_buffer[[i, j]] = token;
                position_mask[[i, j]] = token != pad;
            }
        }
        let mut positions = build_positions_from_mask(position_mask.view());

        let mut multimodal = None;
        if let Some(images) = images {
            let vision = self.vision.ok_or_else(|| {
                SamplerError::InputValidation(
                    "images supplied but no vision preprocessor is configured".into(),
                )
            })?;
            let spliced = vision.prepare(images, token_buffer, num_input_tokens)?;
            token_buffer = spliced.token_buffer;
            num_input_tokens = spliced.num_input_tokens;
            if let Some(embeddings) = spliced.embeddings {
                multimodal = Some(embeddings);
                positions = dense_positions(batch, width);
            }
        }

        // The boundary comes from the first sequence only.
        let boundary = num_input_tokens[0];
        if boundary > total_sampling_steps {
            return Err(SamplerError::InputValidation(format!(
                "spliced prompt of {} tokens does not fit {} sampling steps",
                boundary, total_sampling_steps
            )));
        }

        let valid = token_buffer.mapv(|t| t != pad);
        let region = multimodal
            .as_ref()
            .map(|_| token_buffer.mapv(|t| t == PLACEHOLDER_TOKEN));
        let mask = prefill_span_mask(
            boundary,
            self.cache_length,
            valid.view(),
            region.as_ref().map(|r| r.view()),
        );

        let cache = self.backend.init_cache(self.params, batch, self.cache_length)?;
        let (scores, cache) = self.forward(
            token_buffer.slice(s![.., ..boundary]),
            positions.slice(s![.., ..boundary]),
            cache,
            mask.view(),
            multimodal.as_ref(),
            forbidden_token_ids.as_deref(),
        )?;

        // Scores at prefill offset p predicted slot p + 1.
        let logits_buffer = include_logits.then(|| {
            let mut buffer = Array3::zeros((batch, width, self.backend.vocab_size()));
            buffer.slice_mut(s![.., 1..=boundary, ..]).assign(&scores);
            buffer
        });

        let candidates = self.candidates(&scores, boundary - 1);
        for (i, candidate) in candidates.into_iter().enumerate() {
            if boundary >= num_input_tokens[i] {
                token_buffer[[i, boundary]] = candidate;
            }
        }

        debug!(
            batch,
            boundary,
            total_sampling_steps,
            multimodal = multimodal.is_some(),
            "prefill complete"
        );

        Ok(SamplingState {
            decoding_step: boundary,
            num_input_tokens,
            token_buffer,
            positions,
            cache,
            done: vec![false; batch],
            total_sampling_steps,
            logits_buffer,
            forbidden_token_ids,
        })
    }
}
