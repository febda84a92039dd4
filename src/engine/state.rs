//! Sampling state carried through the decode loop.

use ndarray::{Array2, Array3};

/// Complete state of one batched sampling call.
///
/// Transitions take the state by value and return its successor, so no two
/// owners ever observe a half-updated state. Buffers are reused in place only
/// because ownership has already moved.
#[derive(Debug, Clone)]
pub struct SamplingState<C> {
    /// Current write cursor.
    pub decoding_step: usize,
    /// Real prompt tokens per sequence, fixed after init.
    pub num_input_tokens: Vec<usize>,
    /// `[batch, total_sampling_steps + 1]` token ids.
    pub token_buffer: Array2<u32>,
    /// One position index per buffer slot.
    pub positions: Array2<u32>,
    /// Model cache, replaced wholesale on every forward pass.
    pub cache: C,
    /// Per-sequence termination; never goes back to false.
    pub done: Vec<bool>,
    pub total_sampling_steps: usize,
    /// `[batch, width, vocab]` scores, present when scores were requested.
    pub logits_buffer: Option<Array3<f32>>,
    pub forbidden_token_ids: Option<Vec<u32>>,
}

impl<C> SamplingState<C> {
    pub fn batch_size(&self) -> usize {
        self.token_buffer.nrows()
    }

    /// Fixed buffer width, `total_sampling_steps + 1`.
    pub fn width(&self) -> usize {
        self.token_buffer.ncols()
    }

    /// Slots holding a real (non-pad) token.
    pub fn input_mask(&self, pad_id: u32) -> Array2<bool> {
        self.token_buffer.mapv(|t| t != pad_id)
    }

    /// True once every sequence has emitted end-of-sequence.
    pub fn all_done(&self) -> bool {
        self.done.iter().all(|&d| d)
    }

    /// Loop guard: more steps remain and some sequence is still running.
    pub fn should_continue(&self) -> bool {
        self.decoding_step < self.total_sampling_steps && !self.all_done()
    }

    /// Prompt slice of sequence `i`.
    pub fn prompt(&self, i: usize) -> Vec<u32> {
        self.token_buffer.row(i).iter().take(self.num_input_tokens[i]).copied().collect()
    }
}
