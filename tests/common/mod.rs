//! Shared fixtures for integration tests: a scripted backend that records
//! every forward call, and a small word-level tokenizer.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use gg_sampler::engine::{
    BackendError, ForwardOutput, ModelBackend, PatchEncoder, Sampler, SamplerConfig,
    TokenizerCodec, VisionError,
};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, ArrayView4};
use tokenizers::models::wordlevel::WordLevel;
use tokenizers::normalizers::unicode::NFKC;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::{AddedToken, Tokenizer};

pub const PAD: u32 = 0;
pub const EOS: u32 = 1;
pub const BOS: u32 = 2;
pub const UNK: u32 = 3;
pub const HELLO: u32 = 4;
pub const WORLD: u32 = 5;
pub const THE: u32 = 6;
pub const A: u32 = 7;
pub const B: u32 = 8;
pub const C: u32 = 9;
pub const SOI: u32 = 10;
pub const EOI: u32 = 11;
pub const NL: u32 = 12;

pub const WORDS: &[&str] = &[
    "<pad>", "<eos>", "<bos>", "<unk>", "Hello", "world", "the", "a", "b", "c", "<soi>", "<eoi>",
    "<nl>",
];

/// Word-level tokenizer over [`WORDS`]: NFKC, whitespace splitting, control
/// tokens flagged special and image markers kept whole.
pub fn tokenizer() -> Tokenizer {
    let vocab = WORDS
        .iter()
        .enumerate()
        .map(|(id, word)| (word.to_string(), id as u32))
        .collect();
    let model = WordLevel::builder()
        .vocab(vocab)
        .unk_token("<unk>".into())
        .build()
        .unwrap();

    let mut tokenizer = Tokenizer::new(model);
    tokenizer.with_normalizer(Some(NFKC));
    tokenizer.with_pre_tokenizer(Some(Whitespace {}));
    tokenizer.add_special_tokens(&[
        AddedToken::from("<pad>", true),
        AddedToken::from("<eos>", true),
        AddedToken::from("<bos>", true),
        AddedToken::from("<unk>", true),
    ]);
    tokenizer.add_tokens(&[
        AddedToken::from("<soi>", false),
        AddedToken::from("<eoi>", false),
        AddedToken::from("<nl>", false),
    ]);
    tokenizer
}

pub fn codec() -> TokenizerCodec {
    TokenizerCodec::new(tokenizer()).unwrap()
}

/// Serialized form of [`tokenizer`], for file-loading tests.
pub fn tokenizer_json() -> String {
    tokenizer().to_string(false).unwrap()
}

/// One recorded backend call.
#[derive(Debug, Clone)]
pub struct ForwardCall {
    pub tokens: Array2<u32>,
    pub positions: Array2<u32>,
    pub mask: Array3<bool>,
    pub multimodal: Option<(usize, usize, usize)>,
}

impl ForwardCall {
    pub fn span(&self) -> usize {
        self.tokens.ncols()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedCache {
    pub capacity: usize,
    pub written: usize,
}

/// Backend whose next-token preference depends only on the current token.
///
/// Each rule lists preferred ids best first; the first gets the highest
/// score. Tokens without a rule use the fallback list.
pub struct ScriptedBackend {
    vocab_size: usize,
    default_cache_length: Option<usize>,
    rules: HashMap<u32, Vec<u32>>,
    fallback: Vec<u32>,
    calls: Mutex<Vec<ForwardCall>>,
}

impl ScriptedBackend {
    /// Hello -> world (then b), world -> c, c -> eos, everything else -> a.
    pub fn story() -> Self {
        Self::new(WORDS.len())
            .rule(HELLO, &[WORLD, B])
            .rule(WORLD, &[C])
            .rule(C, &[EOS])
    }

    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            default_cache_length: None,
            rules: HashMap::new(),
            fallback: vec![A],
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rule(mut self, token: u32, preferred: &[u32]) -> Self {
        self.rules.insert(token, preferred.to_vec());
        self
    }

    pub fn fallback(mut self, preferred: &[u32]) -> Self {
        self.fallback = preferred.to_vec();
        self
    }

    pub fn with_default_cache_length(mut self, length: usize) -> Self {
        self.default_cache_length = Some(length);
        self
    }

    pub fn calls(&self) -> Vec<ForwardCall> {
        self.calls.lock().unwrap().clone()
    }

    fn preferences(&self, token: u32) -> &[u32] {
        self.rules.get(&token).unwrap_or(&self.fallback)
    }
}

impl ModelBackend for ScriptedBackend {
    type Params = ();
    type Cache = ScriptedCache;

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn default_cache_length(&self) -> Option<usize> {
        self.default_cache_length
    }

    fn init_cache(&self, _params: &(), _batch: usize, cache_length: usize) -> Result<ScriptedCache, BackendError> {
        Ok(ScriptedCache {
            capacity: cache_length,
            written: 0,
        })
    }

    fn apply(
        &self,
        _params: &(),
        tokens: ArrayView2<'_, u32>,
        positions: ArrayView2<'_, u32>,
        cache: ScriptedCache,
        attention_mask: ArrayView3<'_, bool>,
        multimodal: Option<&Array3<f32>>,
    ) -> Result<ForwardOutput<ScriptedCache>, BackendError> {
        let (batch, span) = tokens.dim();
        self.calls.lock().unwrap().push(ForwardCall {
            tokens: tokens.to_owned(),
            positions: positions.to_owned(),
            mask: attention_mask.to_owned(),
            multimodal: multimodal.map(|m| m.dim()),
        });

        let written = cache.written + span;
        if written > cache.capacity {
            return Err(BackendError::ResourceExhausted(format!(
                "{} slots written, capacity {}",
                written, cache.capacity
            )));
        }

        let mut scores = Array3::zeros((batch, span, self.vocab_size));
        for ((b, t), &token) in tokens.indexed_iter() {
            let preferred = self.preferences(token);
            for (rank, &id) in preferred.iter().enumerate() {
                scores[[b, t, id as usize]] = (preferred.len() - rank) as f32;
            }
        }

        Ok(ForwardOutput {
            scores,
            cache: ScriptedCache {
                capacity: cache.capacity,
                written,
            },
        })
    }
}

/// Backend that reports a fixed error on every call.
pub struct FailingBackend;

impl ModelBackend for FailingBackend {
    type Params = ();
    type Cache = ();

    fn vocab_size(&self) -> usize {
        WORDS.len()
    }

    fn init_cache(&self, _params: &(), _batch: usize, _cache_length: usize) -> Result<(), BackendError> {
        Ok(())
    }

    fn apply(
        &self,
        _params: &(),
        _tokens: ArrayView2<'_, u32>,
        _positions: ArrayView2<'_, u32>,
        _cache: (),
        _attention_mask: ArrayView3<'_, bool>,
        _multimodal: Option<&Array3<f32>>,
    ) -> Result<ForwardOutput<()>, BackendError> {
        Err(BackendError::Numerical("scores contain NaN".into()))
    }
}

/// Sampler over the story backend with an explicit cache length.
pub fn story_sampler(cache_length: usize) -> Sampler<ScriptedBackend, TokenizerCodec> {
    Sampler::new(
        ScriptedBackend::story(),
        codec(),
        (),
        SamplerConfig {
            cache_length: Some(cache_length),
        },
    )
    .unwrap()
}

/// Mean-pools each image's patches into `tokens_per_image` rows.
pub struct MeanPool {
    pub tokens_per_image: usize,
}

impl PatchEncoder for MeanPool {
    fn encode(&self, images: ArrayView4<'_, f32>) -> Result<Array3<f32>, VisionError> {
        let (batch, count, _, dim) = images.dim();
        Ok(Array3::from_shape_fn(
            (batch, count * self.tokens_per_image, dim),
            |(b, slot, d)| {
                let image = slot / self.tokens_per_image;
                images.slice(s![b, image, .., d]).mean().unwrap_or(0.0)
            },
        ))
    }
}
