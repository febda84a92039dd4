//! Telemetry for the sampler.
//!
//! Structured logging, spans around sampling calls, and metrics through the
//! `metrics` facade.

mod logging;
mod metrics;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use self::metrics::{
    init_metrics, record_call_failure, record_call_success, CALLS_TOTAL, CALL_SECONDS,
    DECODE_STEPS_TOTAL, FAILURES_TOTAL,
};
pub use spans::GenerationSpan;
