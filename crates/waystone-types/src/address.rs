//! Overlay addresses and page URLs.
//!
//! An [`Address`] is a 32-hex-character destination identifier. A page URL
//! has the shape `"<address>:<path>"`, where `path` is a slash-prefixed page
//! path ending in `.mu`.

pub type Address = String;

/// Length of a well-formed address, in hex characters.
pub const ADDRESS_LEN: usize = 32;

/// `address_of(url) == url.split(':', 1)[0]`, matching the original's
/// `url.split(":")[0]` (see `original_source/src/core/crawler/rns_request.py`).
pub fn address_of(url: &str) -> Address {
    match url.split_once(':') {
        Some((addr, _)) => addr.to_string(),
        None => url.to_string(),
    }
}

/// A valid address is exactly [`ADDRESS_LEN`] hex characters.
pub fn is_valid_address(addr: &str) -> bool {
    addr.len() == ADDRESS_LEN && addr.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Lowercase hex encoding of raw destination-hash bytes, matching
/// `RNS.prettyhexrep`'s output stripped of its `<...>` brackets (see
/// `original_source/src/core/rns.py`'s `dst_clean`).
pub fn encode_hex(bytes: &[u8]) -> Address {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{b:02x}").unwrap();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_of_splits_on_first_colon() {
        assert_eq!(address_of("aaaa:/page/index.mu"), "aaaa");
        assert_eq!(address_of("aaaa:/page/x.mu`u|a=v"), "aaaa");
    }

    #[test]
    fn address_of_without_colon_returns_whole_string() {
        assert_eq!(address_of("no-colon-here"), "no-colon-here");
    }

    #[test]
    fn validates_hex_length() {
        let addr32 = "a".repeat(32);
        assert!(is_valid_address(&addr32));
        assert!(!is_valid_address(&"a".repeat(31)));
        assert!(!is_valid_address(&"g".repeat(32)));
    }

    #[test]
    fn encodes_bytes_as_lowercase_hex() {
        assert_eq!(encode_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
        assert_eq!(encode_hex(&[]), "");
    }
}
