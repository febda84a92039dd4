//! The span wrapped around each sampling call.

use tracing::field::{display, Empty};
use tracing::span::Entered;
use tracing::{info_span, Span};

use crate::engine::SamplerError;

/// Span for one `generate` call.
///
/// Opens with the batch size and requested steps; the buffer size, the
/// number of decode steps and the outcome are filled in as the call runs.
#[derive(Debug, Clone)]
pub struct GenerationSpan {
    span: Span,
}

impl GenerationSpan {
    pub fn new(batch_size: usize, generation_steps: usize) -> Self {
        let span = info_span!(
            "sample",
            batch_size,
            generation_steps,
            total_sampling_steps = Empty,
            decode_steps = Empty,
            status = Empty,
            error.kind = Empty,
            error.message = Empty,
        );
        Self { span }
    }

    pub fn enter(&self) -> Entered<'_> {
        self.span.enter()
    }

    pub fn record_total_steps(&self, total_sampling_steps: usize) {
        self.span.record("total_sampling_steps", total_sampling_steps);
    }

    pub fn record_decode_steps(&self, decode_steps: usize) {
        self.span.record("decode_steps", decode_steps);
    }

    /// Record how the call ended. Errors carry their metrics kind.
    pub fn finish<T>(&self, result: &Result<T, SamplerError>) {
        match result {
            Ok(_) => {
                self.span.record("status", "ok");
            }
            Err(e) => {
                self.span.record("status", "error");
                self.span.record("error.kind", e.kind());
                self.span.record("error.message", display(e));
            }
        }
    }
}
