//! Text to token-id conversion.
//!
//! `TokenCodec` is the seam to whatever tokenizer a model ships with.
//! `TokenizerCodec` implements it over a Hugging Face `tokenizer.json`.

use std::path::Path;
use std::str::FromStr;

use tokenizers::Tokenizer;

use super::error::CodecError;

/// Fixed special ids every codec exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub pad: u32,
    pub bos: u32,
    pub eos: u32,
}

impl SpecialTokens {
    fn contains(&self, id: u32) -> bool {
        id == self.pad || id == self.bos || id == self.eos
    }
}

/// String <-> token id conversion with fixed special ids.
pub trait TokenCodec: Send + Sync {
    /// Encode text into ids. Must be deterministic for a given input.
    fn encode(&self, text: &str) -> Result<Vec<u32>, CodecError>;

    /// Decode ids back to text. Need not invert `encode`.
    fn decode(&self, ids: &[u32]) -> Result<String, CodecError>;

    fn pad_id(&self) -> u32;
    fn bos_id(&self) -> u32;
    fn eos_id(&self) -> u32;

    fn special_tokens(&self) -> SpecialTokens {
        SpecialTokens {
            pad: self.pad_id(),
            bos: self.bos_id(),
            eos: self.eos_id(),
        }
    }

    /// Check if token is end-of-sequence.
    fn is_eos(&self, token: u32) -> bool {
        token == self.eos_id()
    }
}

/// Token strings naming the special ids inside a tokenizer vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialTokenNames {
    pub pad: String,
    pub bos: String,
    pub eos: String,
}

impl Default for SpecialTokenNames {
    fn default() -> Self {
        Self {
            pad: "<pad>".to_string(),
            bos: "<bos>".to_string(),
            eos: "<eos>".to_string(),
        }
    }
}

/// Codec over a `tokenizers::Tokenizer`.
pub struct TokenizerCodec {
    inner: Tokenizer,
    special: SpecialTokens,
}

impl TokenizerCodec {
    /// Wrap a tokenizer, resolving `<pad>`, `<bos>` and `<eos>`.
    pub fn new(inner: Tokenizer) -> Result<Self, CodecError> {
        Self::with_special_names(inner, &SpecialTokenNames::default())
    }

    /// Wrap a tokenizer whose special tokens use other names.
    pub fn with_special_names(
        inner: Tokenizer,
        names: &SpecialTokenNames,
    ) -> Result<Self, CodecError> {
        let resolve = |name: &str| {
            inner
                .token_to_id(name)
                .ok_or_else(|| CodecError::TokenizerLoad(format!("no id for special token {}", name)))
        };
        let special = SpecialTokens {
            pad: resolve(&names.pad)?,
            bos: resolve(&names.bos)?,
            eos: resolve(&names.eos)?,
        };
        Ok(Self { inner, special })
    }

    /// Parse a serialized `tokenizer.json`.
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        let inner =
            Tokenizer::from_str(json).map_err(|e| CodecError::TokenizerLoad(e.to_string()))?;
        Self::new(inner)
    }

    /// Load a `tokenizer.json` from disk.
    pub fn from_file(path: &Path) -> Result<Self, CodecError> {
        let inner = Tokenizer::from_file(path)
            .map_err(|e| CodecError::TokenizerLoad(format!("{}: {}", path.display(), e)))?;
        Self::new(inner)
    }

    /// Vocabulary size, added tokens included.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.inner
    }
}

impl TokenCodec for TokenizerCodec {
    fn encode(&self, text: &str) -> Result<Vec<u32>, CodecError> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| CodecError::EncodingFailed(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String, CodecError> {
        let mut kept = Vec::with_capacity(ids.len());
        for &id in ids {
            if self.inner.id_to_token(id).is_none() {
                return Err(CodecError::InvalidToken(id));
            }
            // Pad, bos and eos never reach the text even when the
            // tokenizer does not flag them as special.
            if !self.special.contains(id) {
                kept.push(id);
            }
        }
        self.inner
            .decode(&kept, true)
            .map_err(|e| CodecError::DecodingFailed(e.to_string()))
    }

    fn pad_id(&self) -> u32 {
        self.special.pad
    }

    fn bos_id(&self) -> u32 {
        self.special.bos
    }

    fn eos_id(&self) -> u32 {
        self.special.eos
    }
}
