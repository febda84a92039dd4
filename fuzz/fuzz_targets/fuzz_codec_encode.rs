//! Fuzz target for the tokenizer codec.
//!
//! Arbitrary text must never panic the encoder, must encode the same way
//! twice, and every produced id must decode.

#![no_main]

use gg_sampler::engine::{TokenCodec, TokenizerCodec};
use libfuzzer_sys::fuzz_target;
use tokenizers::models::wordlevel::WordLevel;
use tokenizers::normalizers::unicode::NFKC;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::{AddedToken, Tokenizer};

fn codec() -> TokenizerCodec {
    let words = ["<pad>", "<eos>", "<bos>", "<unk>", "the", "a", "b", "ab", "\u{e9}", "<soi>"];
    let model = WordLevel::builder()
        .vocab(words.iter().map(|w| w.to_string()).zip(0u32..).collect())
        .unk_token("<unk>".into())
        .build()
        .expect("fixed vocabulary is valid");
    let mut tokenizer = Tokenizer::new(model);
    tokenizer.with_normalizer(Some(NFKC));
    tokenizer.with_pre_tokenizer(Some(Whitespace {}));
    tokenizer.add_tokens(&[AddedToken::from("<soi>", false)]);
    TokenizerCodec::new(tokenizer).expect("special tokens resolve")
}

fuzz_target!(|data: &str| {
    let codec = codec();

    // encode() should never fail with an unknown token configured
    let ids = codec.encode(data).expect("unknown token covers every word");
    assert_eq!(ids, codec.encode(data).expect("second encode"), "encode is not deterministic");
    assert!(ids.iter().all(|&id| (id as usize) < codec.vocab_size()));

    // decode() should accept anything encode() produced
    let _ = codec.decode(&ids).expect("encoded ids decode");
});
