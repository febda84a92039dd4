//! GG Sampler
//!
//! Batched greedy decoding for transformer language models. A sampling call
//! tokenizes a batch of prompts, runs one prefill pass over all prompt
//! tokens, then decodes one token per step for every sequence until each
//! has emitted end-of-sequence or the token buffer is full.
//!
//! The numeric model, tokenizer and image encoder are collaborators behind
//! traits ([`engine::ModelBackend`], [`engine::TokenCodec`],
//! [`engine::VisionPreprocessor`]); this crate owns the state machine,
//! attention masks, positions and post-processing.
//!
//! # Layout
//!
//! - `engine`: state machine, masks, sampler orchestration, reference
//!   collaborators
//! - `config`: `GG_SAMPLER_*` environment and TOML settings
//! - `telemetry`: logging, spans, metrics
//! - `cli`: commands behind the `gg-sampler-cli` binary

pub mod cli;
pub mod config;
pub mod engine;
pub mod telemetry;

pub use engine::{
    ModelBackend, SampleRequest, Sampler, SamplerConfig, SamplerError, SamplerHandle,
    SamplerOutput, TokenCodec, VisionPreprocessor,
};
