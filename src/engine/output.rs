//! Sampler output types and post-processing of the terminal token buffer.

use ndarray::Array2;
use serde::{Serialize, Serializer};

/// Result of one sampling call, one entry per input prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplerOutput {
    /// Decoded text per sequence.
    pub text: Vec<String>,
    /// Token ids per sequence, including the prompt when echoed.
    pub tokens: Vec<Vec<u32>>,
    /// Per-step score vectors per sequence, when requested.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_scores")]
    pub scores: Option<Vec<Vec<Vec<f32>>>>,
}

/// One score that serializes `-inf`, `inf` and `nan` as strings.
struct Score(f32);

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            s if s.is_finite() => serializer.serialize_f32(s),
            s if s.is_nan() => serializer.serialize_str("nan"),
            s if s > 0.0 => serializer.serialize_str("inf"),
            _ => serializer.serialize_str("-inf"),
        }
    }
}

// JSON has no infinities, and suppressed ids score -inf.
fn serialize_scores<S: Serializer>(
    scores: &Option<Vec<Vec<Vec<f32>>>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match scores {
        Some(sequences) => serializer.collect_seq(sequences.iter().map(|steps| {
            steps
                .iter()
                .map(|row| row.iter().copied().map(Score).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        })),
        None => serializer.serialize_none(),
    }
}

impl SamplerOutput {
    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Total token slots across the batch.
    pub fn total_tokens(&self) -> usize {
        self.tokens.iter().map(Vec::len).sum()
    }
}

/// Replace everything after the first end-of-sequence id with pad.
///
/// The end-of-sequence id itself is kept. Rows without one are untouched.
pub fn mask_tokens_after_eos(token_buffer: &Array2<u32>, eos_id: u32, pad_id: u32) -> Array2<u32> {
    let mut masked = token_buffer.clone();
    for mut row in masked.rows_mut() {
        if let Some(eos_at) = row.iter().position(|&t| t == eos_id) {
            row.iter_mut().skip(eos_at + 1).for_each(|t| *t = pad_id);
        }
    }
    masked
}

/// Slice bounds for one sequence's output.
pub fn output_range(num_input_tokens: usize, total_sampling_steps: usize, echo: bool) -> std::ops::Range<usize> {
    let start = if echo { 0 } else { num_input_tokens };
    start.min(total_sampling_steps)..total_sampling_steps
}
