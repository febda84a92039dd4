//! Sampling engine.
//!
//! Turns a stateless forward pass into a batched, variable-length greedy
//! generation loop: prefill, bounded decode steps, post-processing.

pub mod backend;
pub mod codec;
pub mod error;
pub mod handle;
pub mod input;
pub mod mask;
pub mod output;
pub mod positions;
pub mod reference;
pub mod sampler;
pub mod select;
pub mod state;
pub mod vision;

mod decode;
mod machine;
mod prefill;

pub use backend::{ForwardOutput, ModelBackend};
pub use codec::{SpecialTokenNames, SpecialTokens, TokenCodec, TokenizerCodec};
pub use error::{BackendError, CodecError, SamplerError, VisionError};
pub use handle::SamplerHandle;
pub use input::{MAX_BATCH_SIZE, MAX_INPUT_TOKENS, MAX_TEXT_BYTES};
pub use machine::SamplingStateMachine;
pub use mask::{decode_step_mask, prefill_span_mask};
pub use output::{mask_tokens_after_eos, SamplerOutput};
pub use positions::{build_positions_from_mask, dense_positions};
pub use prefill::PrefillInput;
pub use reference::{BigramBackend, BigramCache, BigramConfig, BigramFile, BigramTable};
pub use sampler::{SampleRequest, Sampler, SamplerConfig};
pub use select::{suppress_forbidden, Greedy, TokenSelector};
pub use state::SamplingState;
pub use vision::{
    ImageSplicer, ImageTokens, PatchEncoder, PatchedImages, VisionOutput, VisionPreprocessor,
    PLACEHOLDER_TOKEN,
};
