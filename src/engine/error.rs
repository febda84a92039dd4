//! Error types for the sampler.
//!
//! All errors are fail-closed: invalid inputs are rejected, not truncated.
//! Nothing in the decode loop retries; a failed call produces no output.

use thiserror::Error;

/// Errors surfaced by a sampling call or by sampler construction.
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Forbidden token {token:?} encodes to {ids} ids; forbidden tokens must map to a single id")]
    InvalidForbiddenToken { token: String, ids: usize },

    #[error("Input validation failed: {0}")]
    InputValidation(String),

    #[error("Sampling needs {required} cache slots but the cache holds {capacity}")]
    CacheCapacityExceeded { required: usize, capacity: usize },

    #[error("Backend failure: {0}")]
    Backend(#[from] BackendError),

    #[error("Codec failure: {0}")]
    Codec(#[from] CodecError),

    #[error("Vision preprocessing failed: {0}")]
    Vision(#[from] VisionError),
}

impl SamplerError {
    /// Returns true if the sampler could not be configured.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::InvalidForbiddenToken { .. } => "forbidden_token",
            Self::InputValidation(_) => "input",
            Self::CacheCapacityExceeded { .. } => "cache_capacity",
            Self::Backend(_) => "backend",
            Self::Codec(_) => "codec",
            Self::Vision(_) => "vision",
        }
    }

    /// Returns true if the caller supplied something the sampler rejects.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidForbiddenToken { .. }
                | Self::InputValidation(_)
                | Self::CacheCapacityExceeded { .. }
                | Self::Vision(VisionError::MarkerMismatch { .. })
        )
    }
}

/// Failures inside the numeric forward pass.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Numerical fault: {0}")]
    Numerical(String),

    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("{0}")]
    Other(String),
}

/// Failures converting between text and token ids.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Invalid token ID: {0}")]
    InvalidToken(u32),

    #[error("Tokenizer load failed: {0}")]
    TokenizerLoad(String),
}

/// Failures while splicing image tokens into the prompt buffer.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Sequence {sequence}: expected {expected} image markers, found {found}")]
    MarkerMismatch {
        sequence: usize,
        expected: usize,
        found: usize,
    },

    #[error("Sequence {sequence}: spliced prompt needs {needed} slots, buffer has {width}")]
    BufferOverflow {
        sequence: usize,
        needed: usize,
        width: usize,
    },

    #[error("Patch encoder failed: {0}")]
    Encoder(String),
}
