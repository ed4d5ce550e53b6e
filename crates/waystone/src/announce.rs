//! Announce ingestion (C3, spec.md §6/§4.10).
//!
//! Grounded in `original_source/src/core/rns.py`'s `AnnounceHandler`: two
//! aspects are registered against the overlay transport's announce
//! dispatch, `nomadnetwork.node` for nodes and `lxmf.delivery` for peers.
//! The overlay transport library itself is out of scope (spec.md §1), so
//! this module only owns the decode-and-upsert half; whatever concrete
//! transport is wired up in `main` is expected to call
//! [`AnnounceHandler::handle`] with the raw `(destination_hash, identity,
//! app_data)` triple from its own announce callback.

use std::sync::Arc;

use tracing::debug;
use waystone_store::{touch_peer, upsert_node, Store};
use waystone_types::{address::encode_hex, Result};

/// Which table an announce aspect upserts into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceKind {
    Node,
    Peer,
}

pub struct AnnounceHandler {
    store: Arc<Store>,
    kind: AnnounceKind,
}

impl AnnounceHandler {
    pub fn new(store: Arc<Store>, kind: AnnounceKind) -> Self {
        AnnounceHandler { store, kind }
    }

    /// Decodes `app_data` and upserts the announcing node/peer. Announces
    /// with empty `app_data` are ignored entirely — no row is created or
    /// touched, matching the original's "don't save announces without
    /// name" early return.
    pub fn handle(
        &self,
        destination_hash: &[u8],
        announced_identity_hexhash: &str,
        app_data: &[u8],
        now: f64,
    ) -> Result<()> {
        if app_data.is_empty() {
            return Ok(());
        }
        let dst = encode_hex(destination_hash);
        let name = decode_announce_name(app_data);
        debug!(kind = ?self.kind, dst, name, "received announce");
        match self.kind {
            AnnounceKind::Node => {
                upsert_node(&self.store, &dst, announced_identity_hexhash, &name, now)?;
            }
            AnnounceKind::Peer => {
                touch_peer(&self.store, &dst, announced_identity_hexhash, &name, now)?;
            }
        }
        Ok(())
    }
}

/// The original's announce payload wraps a name in a 3-byte msgpack
/// short-string header (`\x92\xc4\x0e`) and a 1-byte trailer (`\xc0`);
/// when present, both are stripped before decoding. Anything else is
/// decoded lossily rather than rejected, matching
/// `app_data.decode("utf-8", errors="replace")`.
fn decode_announce_name(app_data: &[u8]) -> String {
    const PREFIX: &[u8] = b"\x92\xc4\x0e";
    const SUFFIX: u8 = 0xc0;
    if app_data.len() > PREFIX.len() && app_data.starts_with(PREFIX) && app_data.last() == Some(&SUFFIX) {
        String::from_utf8_lossy(&app_data[PREFIX.len()..app_data.len() - 1]).into_owned()
    } else {
        String::from_utf8_lossy(app_data).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_msgpack_wrapper_when_present() {
        let mut payload = b"\x92\xc4\x0e".to_vec();
        payload.extend_from_slice(b"My Node Name");
        payload.push(0xc0);
        assert_eq!(decode_announce_name(&payload), "My Node Name");
    }

    #[test]
    fn falls_back_to_lossy_decode_without_wrapper() {
        assert_eq!(decode_announce_name(b"plain name"), "plain name");
    }

    #[test]
    fn empty_app_data_is_a_noop() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let handler = AnnounceHandler::new(Arc::clone(&store), AnnounceKind::Node);
        handler.handle(&[0xaa; 16], "identhash", b"", 0.0).unwrap();
        assert_eq!(waystone_store::count_nodes(&store).unwrap(), 0);
    }

    #[test]
    fn node_announce_upserts_by_hex_encoded_destination() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let handler = AnnounceHandler::new(Arc::clone(&store), AnnounceKind::Node);
        let dst_hash = [0xde, 0xad, 0xbe, 0xef];
        handler.handle(&dst_hash, "identhash", b"My Node", 100.0).unwrap();

        let node = waystone_store::get_node(&store, "deadbeef").unwrap().unwrap();
        assert_eq!(node.name, "My Node");
        assert_eq!(node.identity, "identhash");
    }
}
