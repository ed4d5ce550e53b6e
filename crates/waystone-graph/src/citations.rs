//! Diff-apply on a freshly crawled page's outbound links (spec.md C6).
//!
//! Grounded in `original_source/src/core/data/citations.py::update_citations`.

use std::collections::HashSet;

use waystone_types::{address_of, is_valid_address, Address, Result};
use waystone_store::{rows_for_src, soft_delete_citation, upsert_citation, Store};

/// Recomputes `src`'s outbound citations to match `links_to` (full URLs
/// parsed from its page): existing edges whose target is no longer linked
/// are soft-deleted, edges reappearing after a previous removal are
/// reactivated, and brand-new targets are inserted. Self-citations and
/// malformed (non-32-char) addresses are silently dropped.
pub fn update_citations(store: &Store, src: &str, links_to: &[String], now: f64) -> Result<()> {
    let src_address = address_of(src);

    let mut targets: HashSet<Address> = HashSet::new();
    for link in links_to {
        let target_address = address_of(link);
        if target_address == src_address {
            continue;
        }
        if !is_valid_address(&target_address) {
            continue;
        }
        targets.insert(target_address);
    }

    let existing = rows_for_src(store, &src_address)?;
    for row in &existing {
        let still_linked = targets.contains(&row.target_address);
        if still_linked {
            if row.removed {
                upsert_citation(store, &row.target_address, &src_address, now)?;
            }
        } else if !row.removed {
            soft_delete_citation(store, &row.target_address, &src_address)?;
        }
    }

    let existing_targets: HashSet<&str> =
        existing.iter().map(|r| r.target_address.as_str()).collect();
    for target in &targets {
        if existing_targets.contains(target.as_str()) {
            continue;
        }
        upsert_citation(store, target, &src_address, now)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use waystone_store::sources_of;

    fn addr(byte: char) -> String {
        byte.to_string().repeat(32)
    }

    #[test]
    fn inserts_new_citations_and_drops_self_links() {
        let store = Store::open_in_memory().unwrap();
        let src = addr('a');
        let target = addr('b');
        let page_links =
            vec![format!("{target}:/x.mu"), format!("{src}:/self.mu")];

        update_citations(&store, &format!("{src}:/index.mu"), &page_links, 1.0).unwrap();

        assert_eq!(sources_of(&store, &target).unwrap(), vec![src]);
    }

    #[test]
    fn removed_link_soft_deletes_then_reappearing_reactivates() {
        let store = Store::open_in_memory().unwrap();
        let src = addr('c');
        let target = addr('d');
        let first_page = vec![format!("{target}:/x.mu")];
        let second_page: Vec<String> = vec![];

        update_citations(&store, &format!("{src}:/index.mu"), &first_page, 1.0).unwrap();
        assert_eq!(sources_of(&store, &target).unwrap(), vec![src.clone()]);

        update_citations(&store, &format!("{src}:/index.mu"), &second_page, 2.0).unwrap();
        assert!(sources_of(&store, &target).unwrap().is_empty());

        update_citations(&store, &format!("{src}:/index.mu"), &first_page, 3.0).unwrap();
        assert_eq!(sources_of(&store, &target).unwrap(), vec![src]);
    }

    #[test]
    fn malformed_address_is_dropped_without_error() {
        let store = Store::open_in_memory().unwrap();
        let src = addr('e');
        let page_links = vec!["short:/x.mu".to_string()];
        update_citations(&store, &format!("{src}:/index.mu"), &page_links, 1.0).unwrap();
        assert!(sources_of(&store, "short").unwrap().is_empty());
    }
}
