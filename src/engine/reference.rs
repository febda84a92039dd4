//! Bigram lookup backend.
//!
//! Scores for the next token depend only on the current token, read from a
//! JSON table. Small enough to drive the sampler end to end from the CLI
//! and in tests without real model weights.

use std::collections::HashMap;
use std::path::Path;

use ndarray::{Array3, ArrayView2, ArrayView3};
use serde::Deserialize;

use super::backend::{ForwardOutput, ModelBackend};
use super::error::BackendError;
use super::vision::PLACEHOLDER_TOKEN;

/// Static shape of a bigram model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BigramConfig {
    pub vocab_size: usize,
    /// Cache length the table was built for, if any.
    pub max_cache_length: Option<usize>,
}

/// Sparse score rows keyed by current token.
#[derive(Debug, Clone, Default)]
pub struct BigramTable {
    pub rows: HashMap<u32, HashMap<u32, f32>>,
}

/// On-disk format: config and table together.
#[derive(Debug, Clone, Deserialize)]
pub struct BigramFile {
    pub vocab_size: usize,
    #[serde(default)]
    pub max_cache_length: Option<usize>,
    pub rows: HashMap<u32, HashMap<u32, f32>>,
}

impl BigramFile {
    pub fn from_json(json: &str) -> Result<Self, BackendError> {
        serde_json::from_str(json).map_err(|e| BackendError::Other(format!("bigram table: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self, BackendError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| BackendError::Other(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Split into the backend and its parameters.
    pub fn into_parts(self) -> (BigramBackend, BigramTable) {
        let config = BigramConfig {
            vocab_size: self.vocab_size,
            max_cache_length: self.max_cache_length,
        };
        (BigramBackend::new(config), BigramTable { rows: self.rows })
    }
}

/// Per-row count of cache slots written so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigramCache {
    pub capacity: usize,
    pub filled: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct BigramBackend {
    config: BigramConfig,
}

impl BigramBackend {
    pub fn new(config: BigramConfig) -> Self {
        Self { config }
    }
}

impl ModelBackend for BigramBackend {
    type Params = BigramTable;
    type Cache = BigramCache;

    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    fn default_cache_length(&self) -> Option<usize> {
        self.config.max_cache_length
    }

    fn init_cache(
        &self,
        _params: &BigramTable,
        batch_size: usize,
        cache_length: usize,
    ) -> Result<BigramCache, BackendError> {
        Ok(BigramCache {
            capacity: cache_length,
            filled: vec![0; batch_size],
        })
    }

    fn apply(
        &self,
        params: &BigramTable,
        tokens: ArrayView2<'_, u32>,
        positions: ArrayView2<'_, u32>,
        cache: BigramCache,
        attention_mask: ArrayView3<'_, bool>,
        _multimodal: Option<&Array3<f32>>,
    ) -> Result<ForwardOutput<BigramCache>, BackendError> {
        let (batch, span) = tokens.dim();
        if positions.dim() != (batch, span) {
            return Err(BackendError::ShapeMismatch {
                what: "positions",
                expected: vec![batch, span],
                actual: positions.shape().to_vec(),
            });
        }
        if attention_mask.dim() != (batch, span, cache.capacity) {
            return Err(BackendError::ShapeMismatch {
                what: "attention_mask",
                expected: vec![batch, span, cache.capacity],
                actual: attention_mask.shape().to_vec(),
            });
        }
        if cache.filled.len() != batch {
            return Err(BackendError::ShapeMismatch {
                what: "cache",
                expected: vec![batch],
                actual: vec![cache.filled.len()],
            });
        }

        let filled: Vec<usize> = cache.filled.iter().map(|n| n + span).collect();
        if let Some(over) = filled.iter().find(|&&n| n > cache.capacity) {
            return Err(BackendError::ResourceExhausted(format!(
                "cache holds {} slots, {} requested",
                cache.capacity, over
            )));
        }

        let mut scores = Array3::zeros((batch, span, self.config.vocab_size));
        for ((b, t), &token) in tokens.indexed_iter() {
            if token == PLACEHOLDER_TOKEN {
                continue;
            }
            if let Some(row) = params.rows.get(&token) {
                for (&next, &score) in row {
                    if (next as usize) < self.config.vocab_size {
                        scores[[b, t, next as usize]] = score;
                    }
                }
            }
        }

        Ok(ForwardOutput {
            scores,
            cache: BigramCache {
                capacity: cache.capacity,
                filled,
            },
        })
    }
}
