//! End-to-end tests for the sampler over a scripted backend.

mod common;

use common::*;
use gg_sampler::engine::{
    BackendError, SampleRequest, Sampler, SamplerConfig, SamplerError, TokenSelector,
};
use ndarray::ArrayView1;

// =============================================================================
// Single Prompt
// =============================================================================

#[test]
fn hello_three_steps_stops_at_eos() {
    let sampler = story_sampler(64);
    let output = sampler.generate(&SampleRequest::new(["Hello"], 3)).unwrap();

    assert_eq!(output.len(), 1);
    assert_eq!(output.tokens, vec![vec![WORLD, C, EOS]]);
    assert_eq!(output.text, vec!["world c".to_string()]);
    assert!(output.tokens[0].len() <= 3);
}

#[test]
fn loop_stops_once_every_sequence_is_done() {
    let sampler = story_sampler(64);
    sampler.generate(&SampleRequest::new(["Hello"], 3)).unwrap();

    // Prefill over [bos, Hello], then steps at slots 2 and 3; slot 4 is eos.
    let spans: Vec<usize> = sampler.backend().calls().iter().map(|c| c.span()).collect();
    assert_eq!(spans, vec![2, 1, 1]);
}

#[test]
fn runs_to_buffer_end_without_eos() {
    let sampler = Sampler::new(
        ScriptedBackend::new(WORDS.len()),
        codec(),
        (),
        SamplerConfig { cache_length: Some(32) },
    )
    .unwrap();
    let output = sampler.generate(&SampleRequest::new(["Hello"], 4)).unwrap();

    assert_eq!(output.tokens, vec![vec![A, A, A, A]]);
    assert_eq!(output.text, vec!["a a a a".to_string()]);
    // One prefill plus one decode step per slot from the boundary to the bound.
    assert_eq!(sampler.backend().calls().len(), 5);
}

#[test]
fn zero_generation_steps_yields_empty_output() {
    let sampler = story_sampler(64);
    let output = sampler.generate(&SampleRequest::new(["Hello"], 0)).unwrap();

    assert_eq!(output.tokens, vec![Vec::<u32>::new()]);
    assert_eq!(output.text, vec![String::new()]);
    assert_eq!(sampler.backend().calls().len(), 1);
}

#[test]
fn empty_prompt_string_starts_from_bos() {
    let sampler = story_sampler(64);
    let output = sampler
        .generate(&SampleRequest::new([""], 2).echo(true))
        .unwrap();
    assert_eq!(output.tokens, vec![vec![BOS, A, A]]);
}

// =============================================================================
// Batches
// =============================================================================

#[test]
fn longer_prompt_survives_shorter_prefill() {
    let sampler = story_sampler(64);
    let request = SampleRequest::new(["Hello", "Hello Hello Hello Hello"], 4).echo(true);
    let output = sampler.generate(&request).unwrap();

    // Prefill would pick world at slot 2 for both rows; the second keeps Hello.
    assert_eq!(output.tokens[0], vec![BOS, HELLO, WORLD, C, EOS, PAD, PAD, PAD, PAD]);
    assert_eq!(output.tokens[1], vec![BOS, HELLO, HELLO, HELLO, HELLO, WORLD, C, EOS, PAD]);
}

#[test]
fn shorter_prompt_after_longest_waits_on_pad_slots() {
    let sampler = story_sampler(64);
    let prompts = ["Hello Hello Hello Hello", "Hello"];
    let echoed = sampler
        .generate(&SampleRequest::new(prompts, 3).echo(true))
        .unwrap();

    // The boundary is the first prompt's length, so the second row keeps
    // pad slots up to it and its prefill pick is scored at a pad slot.
    assert_eq!(echoed.tokens[0], vec![BOS, HELLO, HELLO, HELLO, HELLO, WORLD, C, EOS]);
    assert_eq!(echoed.tokens[1], vec![BOS, HELLO, PAD, PAD, PAD, A, A, A]);

    let spans: Vec<usize> = sampler.backend().calls().iter().map(|c| c.span()).collect();
    assert_eq!(spans, vec![5, 1, 1, 1]);

    let plain = sampler.generate(&SampleRequest::new(prompts, 3)).unwrap();
    assert_eq!(plain.tokens[1], vec![PAD, PAD, PAD, A, A, A]);
    assert_eq!(plain.text[1], "a a a");
}

#[test]
fn prefill_covers_first_prompt_only() {
    let sampler = story_sampler(64);
    sampler
        .generate(&SampleRequest::new(["Hello", "Hello Hello Hello Hello"], 3))
        .unwrap();

    let calls = sampler.backend().calls();
    assert_eq!(calls[0].span(), 2);
    assert!(calls[1..].iter().all(|c| c.span() == 1));
}

#[test]
fn outputs_pad_everything_after_eos() {
    let sampler = story_sampler(64);
    let output = sampler
        .generate(&SampleRequest::new(["Hello", "Hello Hello Hello Hello"], 3))
        .unwrap();

    for tokens in &output.tokens {
        if let Some(at) = tokens.iter().position(|&t| t == EOS) {
            assert!(tokens[at + 1..].iter().all(|&t| t == PAD));
        }
    }
    assert_eq!(output.text, vec!["world c".to_string(), "world c".to_string()]);
}

#[test]
fn echo_output_is_prompt_then_plain_output() {
    let sampler = story_sampler(64);
    let prompts = ["Hello", "Hello world world world"];
    let plain = sampler.generate(&SampleRequest::new(prompts, 3)).unwrap();
    let echoed = sampler.generate(&SampleRequest::new(prompts, 3).echo(true)).unwrap();

    for (i, prompt) in prompts.iter().enumerate() {
        let prompt_ids = sampler.tokenize(prompt).unwrap();
        let (head, tail) = echoed.tokens[i].split_at(prompt_ids.len());
        assert_eq!(head, prompt_ids.as_slice());
        assert_eq!(tail, plain.tokens[i].as_slice());
    }
}

#[test]
fn sampling_is_deterministic() {
    let sampler = story_sampler(64);
    let request = SampleRequest::new(["Hello", "a b c", "Hello world"], 5);
    let first = sampler.generate(&request).unwrap();
    let second = sampler.generate(&request).unwrap();
    assert_eq!(first, second);
}

// =============================================================================
// Scores
// =============================================================================

#[test]
fn score_rows_line_up_with_output_tokens() {
    let sampler = story_sampler(64);
    let output = sampler.generate(&SampleRequest::new(["Hello"], 3)).unwrap();
    let scores = output.scores.expect("scores requested by default");

    assert_eq!(scores[0].len(), output.tokens[0].len());
    for (row, &token) in scores[0].iter().zip(&output.tokens[0]) {
        assert_eq!(row.len(), WORDS.len());
        let best = row
            .iter()
            .enumerate()
            .fold(0, |best, (i, &s)| if s > row[best] { i } else { best });
        assert_eq!(best as u32, token);
    }
}

#[test]
fn scores_can_be_skipped() {
    let sampler = story_sampler(64);
    let output = sampler
        .generate(&SampleRequest::new(["Hello"], 3).return_scores(false))
        .unwrap();
    assert!(output.scores.is_none());
}

// =============================================================================
// Forbidden Tokens
// =============================================================================

#[test]
fn forbidden_token_is_never_generated() {
    let sampler = story_sampler(64);
    let output = sampler
        .generate(&SampleRequest::new(["Hello", "Hello world"], 4).forbid(["world"]))
        .unwrap();

    assert!(output.tokens.iter().flatten().all(|&t| t != WORLD));
    assert_eq!(output.tokens[0][0], B);
    let scores = output.scores.unwrap();
    assert!(scores
        .iter()
        .flatten()
        .all(|row| row[WORLD as usize] == f32::NEG_INFINITY));
}

#[test]
fn multi_id_forbidden_token_is_rejected() {
    let sampler = story_sampler(64);
    let err = sampler
        .generate(&SampleRequest::new(["Hello"], 3).forbid(["a b"]))
        .unwrap_err();

    assert!(matches!(err, SamplerError::InvalidForbiddenToken { ref token, ids: 2 } if token == "a b"));
    assert!(sampler.backend().calls().is_empty());
}

// =============================================================================
// Selection
// =============================================================================

/// Picks end-of-sequence no matter the scores.
#[derive(Debug)]
struct StopAtOnce;

impl TokenSelector for StopAtOnce {
    fn select(&self, _scores: ArrayView1<'_, f32>) -> u32 {
        EOS
    }
}

#[test]
fn bound_selector_makes_every_pick() {
    let sampler = story_sampler(64).with_selector(StopAtOnce);
    let output = sampler.generate(&SampleRequest::new(["Hello"], 3)).unwrap();

    assert_eq!(output.tokens, vec![vec![EOS, PAD, PAD]]);
    assert_eq!(output.text, vec![String::new()]);
    // Prefill plus the one step that sees the end-of-sequence token.
    assert_eq!(sampler.backend().calls().len(), 2);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn buffer_larger_than_cache_is_rejected_before_any_call() {
    let sampler = story_sampler(4);
    let err = sampler.generate(&SampleRequest::new(["Hello"], 5)).unwrap_err();

    assert!(matches!(
        err,
        SamplerError::CacheCapacityExceeded { required: 7, capacity: 4 }
    ));
    assert!(err.is_caller_error());
    assert!(sampler.backend().calls().is_empty());
}

#[test]
fn missing_cache_length_is_configuration_error() {
    let result = Sampler::new(ScriptedBackend::story(), codec(), (), SamplerConfig::default());
    assert!(matches!(result, Err(SamplerError::Configuration(_))));
}

#[test]
fn backend_default_cache_length_is_used() {
    let sampler = Sampler::new(
        ScriptedBackend::story().with_default_cache_length(48),
        codec(),
        (),
        SamplerConfig::default(),
    )
    .unwrap();
    assert_eq!(sampler.cache_length(), 48);
}

#[test]
fn backend_failure_aborts_the_call() {
    let sampler = Sampler::new(FailingBackend, codec(), (), SamplerConfig { cache_length: Some(16) }).unwrap();
    let err = sampler.generate(&SampleRequest::new(["Hello"], 3)).unwrap_err();
    assert!(matches!(err, SamplerError::Backend(BackendError::Numerical(_))));
    assert_eq!(err.kind(), "backend");
}

#[test]
fn empty_batch_is_rejected() {
    let sampler = story_sampler(64);
    let err = sampler
        .generate(&SampleRequest::new(Vec::<String>::new(), 3))
        .unwrap_err();
    assert!(matches!(err, SamplerError::InputValidation(_)));
}
