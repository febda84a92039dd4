//! Metrics facade for sampling calls.
//!
//! Emits through the `metrics` crate; whichever recorder the embedding
//! process installs receives them. Without a recorder these are no-ops.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

pub const CALLS_TOTAL: &str = "gg_sampler_calls_total";
pub const FAILURES_TOTAL: &str = "gg_sampler_failures_total";
pub const DECODE_STEPS_TOTAL: &str = "gg_sampler_decode_steps_total";
pub const CALL_SECONDS: &str = "gg_sampler_call_seconds";

/// Register metric descriptions with the installed recorder.
pub fn init_metrics() {
    describe_counter!(CALLS_TOTAL, "Completed sampling calls");
    describe_counter!(FAILURES_TOTAL, "Sampling calls that returned an error");
    describe_counter!(DECODE_STEPS_TOTAL, Unit::Count, "Decode steps executed across all calls");
    describe_histogram!(CALL_SECONDS, Unit::Seconds, "Wall time of one sampling call");
}

/// Record a completed call.
pub fn record_call_success(batch_size: usize, decode_steps: usize, elapsed: Duration) {
    counter!(CALLS_TOTAL).increment(1);
    counter!(DECODE_STEPS_TOTAL).increment(decode_steps as u64);
    histogram!(CALL_SECONDS, "batch" => bucket(batch_size)).record(elapsed.as_secs_f64());
}

/// Record a failed call, labelled by error kind.
pub fn record_call_failure(kind: &'static str) {
    counter!(FAILURES_TOTAL, "kind" => kind).increment(1);
}

fn bucket(batch_size: usize) -> &'static str {
    match batch_size {
        0..=1 => "1",
        2..=4 => "2-4",
        5..=16 => "5-16",
        _ => "17+",
    }
}
