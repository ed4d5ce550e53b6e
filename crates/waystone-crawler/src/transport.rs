//! The overlay transport boundary (C5).
//!
//! Grounded in `original_source/src/core/crawler/rns_request.py`. The
//! original wraps RNS's callback-based path discovery, link establishment
//! and request completion in `asyncio` polling adapters
//! (`_AsyncWrapper.get` spinning on `self._completed`) around a single
//! 20-second wall-clock timeout. Per spec.md §9's guidance to replace
//! callback adapters with a single blocking `request` call, all of that
//! collapses into one trait method: the transport implementation owns path
//! discovery/link establishment/timeout internally, and the crawler only
//! ever calls `request` from a worker thread, where blocking is fine.

use std::time::Duration;

use waystone_types::Result;

/// Wall-clock budget for a single fetch, matching the original's
/// `asyncio.wait_for(..., timeout)` in `rns_request.request`.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// A successful overlay request: the remote peer's identity and the raw
/// response bytes.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub remote_identity: String,
    pub body: Vec<u8>,
}

/// Implemented by the production overlay transport library (out of scope
/// here) and by in-memory fakes in tests.
pub trait OverlayTransport: Send + Sync {
    /// Resolves `url`'s address, requests a path if unknown, establishes a
    /// link and issues the request, blocking up to `timeout`. Returns
    /// `Err(Error::Transient(_))` on timeout or any fetch failure — callers
    /// drop the document and move on rather than retrying.
    fn request(
        &self,
        url: &str,
        data: Option<&[(String, String)]>,
        timeout: Duration,
    ) -> Result<FetchResponse>;
}
