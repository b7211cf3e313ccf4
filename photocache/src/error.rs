//! Request-level error type for the decision engine.

use thiserror::Error;

use crate::geo::{BoundsError, GridError};
use crate::provider::FetchError;
use crate::sampling::SampleError;
use crate::store::StoreError;

/// Errors surfaced by [`CacheDecisionEngine::resolve`](crate::engine::CacheDecisionEngine::resolve).
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Caller or programming error: malformed bbox, zero `max_photos`,
    /// invalid configuration, or a violated sampler precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The live fetcher failed. Coverage is left untouched.
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetchFailed(#[source] FetchError),

    /// A persistence read failed. Distinct from an empty cache.
    #[error("Cache store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl ResolveError {
    /// Whether the request may succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        match self {
            ResolveError::InvalidArgument(_) => false,
            ResolveError::UpstreamFetchFailed(e) => e.is_transient(),
            ResolveError::StoreUnavailable(_) => true,
        }
    }
}

impl From<BoundsError> for ResolveError {
    fn from(e: BoundsError) -> Self {
        ResolveError::InvalidArgument(e.to_string())
    }
}

impl From<GridError> for ResolveError {
    fn from(e: GridError) -> Self {
        ResolveError::InvalidArgument(e.to_string())
    }
}

impl From<SampleError> for ResolveError {
    fn from(e: SampleError) -> Self {
        ResolveError::InvalidArgument(e.to_string())
    }
}

impl From<FetchError> for ResolveError {
    fn from(e: FetchError) -> Self {
        ResolveError::UpstreamFetchFailed(e)
    }
}

impl From<StoreError> for ResolveError {
    fn from(e: StoreError) -> Self {
        ResolveError::StoreUnavailable(e)
    }
}
