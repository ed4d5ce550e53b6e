//! The overlay transport integration point.
//!
//! The transport library itself — path discovery, link establishment,
//! destination hashing — is out of scope (spec.md §1 lists it as an
//! external collaborator). [`UnwiredTransport`] is the placeholder this
//! binary links against until a real `waystone_crawler::OverlayTransport`
//! implementation backed by an overlay-network crate is wired in; every
//! call fails with [`waystone_types::Error::Transient`], which the crawl
//! pipeline already treats as "drop this URL and move on" (spec.md §7).

use std::time::Duration;

use waystone_crawler::{FetchResponse, OverlayTransport};
use waystone_types::{Error, Result};

pub struct UnwiredTransport;

impl OverlayTransport for UnwiredTransport {
    fn request(&self, url: &str, _data: Option<&[(String, String)]>, _timeout: Duration) -> Result<FetchResponse> {
        Err(Error::Transient(format!("no overlay transport wired up, cannot fetch {url}")))
    }
}
