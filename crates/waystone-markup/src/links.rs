use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use waystone_types::address::Address;

static LINK_BLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`\[(.*?)\]").unwrap());

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkParseError {
    #[error("unable to parse link block {0:?}: too many back-ticks ({1})")]
    TooManyBackticks(String, usize),
}

/// Parses the content of a single `` `[...] `` block per spec.md §4.1's
/// back-tick-count table. Grounded in
/// `original_source/src/core/crawler/parser.py::parse_link_block`.
pub fn parse_link_block(block: &str) -> Result<String, LinkParseError> {
    let seps = block.matches('`').count();
    match seps {
        0 => Ok(block.to_string()),
        1 => {
            // "label`addr:/path" -> take the part after the back-tick.
            let parts: Vec<&str> = block.splitn(2, '`').collect();
            Ok(parts[1].to_string())
        }
        2 => {
            // "label`:/path`params" -> ":/path`params" unless params start with '*'.
            let parts: Vec<&str> = block.splitn(3, '`').collect();
            let (url, params) = (parts[1], parts[2]);
            if params.starts_with('*') {
                Ok(url.to_string())
            } else {
                Ok(format!("{url}`{params}"))
            }
        }
        n => Err(LinkParseError::TooManyBackticks(block.to_string(), n)),
    }
}

fn is_external(link: &str) -> bool {
    !link.starts_with(':')
}

/// Extracts `(internal, external)` links from a page's raw markup, as seen
/// by `address` (the page's own address). Deduplicated within the page;
/// malformed blocks are skipped without raising (their parse failure is
/// only logged).
pub fn extract_links(address: &Address, page: &str) -> (Vec<String>, Vec<String>) {
    let mut internal = Vec::new();
    let mut external = Vec::new();
    let mut seen_internal = HashSet::new();
    let mut seen_external = HashSet::new();

    for caps in LINK_BLOCK_RE.captures_iter(page) {
        let block = &caps[1];
        let link = match parse_link_block(block) {
            Ok(l) => l,
            Err(e) => {
                tracing::debug!(block, error = %e, "skipping malformed link block");
                continue;
            }
        };
        if !link.contains(':') {
            continue;
        }
        if is_external(&link) {
            if seen_external.insert(link.clone()) {
                external.push(link);
            }
        } else {
            let full = format!("{address}{link}");
            if seen_internal.insert(full.clone()) {
                internal.push(full);
            }
        }
    }

    (internal, external)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_shapes() {
        let addr = "b".repeat(32);
        let addr_target = "a".repeat(32);
        let page = format!(
            "`[:/page/index.mu] and `[label`{addr_target}:/page/x.mu] and `[q`:/page/y.mu`u|a=v]"
        );
        let (internal, external) = extract_links(&addr, &page);

        assert_eq!(internal, vec![format!("{addr}:/page/index.mu")]);
        assert_eq!(
            external,
            vec![format!("{addr_target}:/page/x.mu"), ":/page/y.mu`u|a=v".to_string()]
        );
    }

    #[test]
    fn drops_star_prefixed_params() {
        let addr = "c".repeat(32);
        let page = "`[q`:/page/y.mu`*trash]".to_string();
        let (_internal, external) = extract_links(&addr, &page);
        assert_eq!(external, vec![":/page/y.mu".to_string()]);
    }

    #[test]
    fn malformed_block_is_skipped_not_raised() {
        let addr = "d".repeat(32);
        let page = "`[a`b`c`d] `[:/ok.mu]".to_string();
        let (internal, _external) = extract_links(&addr, &page);
        assert_eq!(internal, vec![format!("{addr}:/ok.mu")]);
    }

    #[test]
    fn deduplicates_within_a_page() {
        let addr = "e".repeat(32);
        let page = "`[:/a.mu] `[:/a.mu]".to_string();
        let (internal, _external) = extract_links(&addr, &page);
        assert_eq!(internal.len(), 1);
    }

    #[test]
    fn external_never_starts_with_colon_marker_internal_always_prefixed() {
        let addr = "f".repeat(32);
        let page = format!("`[:/int.mu] `[{}:/ext.mu]", "1".repeat(32));
        let (internal, external) = extract_links(&addr, &page);
        assert!(internal.iter().all(|l| l.starts_with(&addr)));
        assert!(external.iter().all(|l| !l.starts_with(':')));
    }
}
