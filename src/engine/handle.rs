//! Async facade over the blocking sampler.
//!
//! A sampling call has no suspension points of its own, so each call runs
//! whole on tokio's blocking pool and async callers simply await the result.

use std::sync::Arc;

use super::backend::ModelBackend;
use super::codec::TokenCodec;
use super::error::{BackendError, SamplerError};
use super::output::SamplerOutput;
use super::sampler::{SampleRequest, Sampler};

/// Cloneable handle that runs sampling calls off the async runtime.
pub struct SamplerHandle<B: ModelBackend, C: TokenCodec> {
    inner: Arc<Sampler<B, C>>,
}

impl<B: ModelBackend, C: TokenCodec> Clone for SamplerHandle<B, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B, C> SamplerHandle<B, C>
where
    B: ModelBackend + 'static,
    B::Params: 'static,
    C: TokenCodec + 'static,
{
    pub fn new(sampler: Sampler<B, C>) -> Self {
        Self {
            inner: Arc::new(sampler),
        }
    }

    /// Access the wrapped sampler for synchronous use.
    pub fn sampler(&self) -> &Sampler<B, C> {
        &self.inner
    }

    /// Run one sampling call on the blocking pool.
    ///
    /// The call either completes in full or fails; dropping the future does
    /// not interrupt a call already running.
    pub async fn generate(&self, request: SampleRequest) -> Result<SamplerOutput, SamplerError> {
        let sampler = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || sampler.generate(&request))
            .await
            .map_err(|e| BackendError::Other(format!("sampling task failed: {}", e)))?
    }
}
