//! BM25F scoring across the multi-field schema.
//!
//! The original leans on `whoosh.scoring.BM25F`; `whoosh` isn't available
//! here, so this implements the standard Robertson/Sparck-Jones formula
//! directly, with each field's contribution weighted by
//! [`crate::schema::Field::boost`] before summing — the textbook way to
//! turn a per-field BM25 into BM25F.

use std::collections::HashMap;

use crate::schema::FIELDS;

pub const BM25_K1: f64 = 1.2;
pub const BM25_B: f64 = 0.75;

/// `terms_by_field[i]` holds the query terms to look up against
/// `postings[i]` (both indexed by [`crate::schema::Field::index`]).
/// Returns a doc_id -> cumulative BM25F score map.
pub fn bm25f_scores(
    terms_by_field: &[Vec<&str>],
    postings: &[HashMap<String, HashMap<u32, u32>>],
    field_len: &[HashMap<u32, u32>],
    n_docs: f64,
    k1: f64,
    b: f64,
) -> HashMap<u32, f64> {
    let mut scores: HashMap<u32, f64> = HashMap::new();
    if n_docs <= 0.0 {
        return scores;
    }

    for field_idx in 0..FIELDS.len() {
        let terms = &terms_by_field[field_idx];
        if terms.is_empty() {
            continue;
        }
        let boost = FIELDS[field_idx].boost();
        let lens = &field_len[field_idx];
        let avg_len = if lens.is_empty() {
            1.0
        } else {
            (lens.values().map(|&l| l as f64).sum::<f64>() / lens.len() as f64).max(1e-9)
        };

        let mut seen_terms = std::collections::HashSet::new();
        for &term in terms {
            if term.is_empty() || !seen_terms.insert(term) {
                continue;
            }
            let Some(doc_freqs) = postings[field_idx].get(term) else {
                continue;
            };
            let df = doc_freqs.len() as f64;
            if df == 0.0 {
                continue;
            }
            let idf = (1.0 + (n_docs - df + 0.5) / (df + 0.5)).ln();

            for (&doc_id, &freq) in doc_freqs {
                let len = *lens.get(&doc_id).unwrap_or(&0) as f64;
                let tf = freq as f64;
                let denom = tf + k1 * (1.0 - b + b * (len / avg_len));
                let term_score = idf * (tf * (k1 + 1.0)) / denom.max(1e-9);
                *scores.entry(doc_id).or_insert(0.0) += boost * term_score;
            }
        }
    }

    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn postings_for(term: &str, entries: &[(u32, u32)]) -> HashMap<String, HashMap<u32, u32>> {
        let mut m = HashMap::new();
        m.insert(term.to_string(), entries.iter().cloned().collect());
        m
    }

    #[test]
    fn higher_term_frequency_scores_higher() {
        let mut postings = vec![HashMap::new(); FIELDS.len()];
        postings[Field::Text.index()] = postings_for("fox", &[(1, 1), (2, 5)]);
        let mut field_len = vec![HashMap::new(); FIELDS.len()];
        field_len[Field::Text.index()] = [(1, 10), (2, 10)].into_iter().collect();

        let mut terms_by_field = vec![Vec::new(); FIELDS.len()];
        terms_by_field[Field::Text.index()] = vec!["fox"];

        let scores =
            bm25f_scores(&terms_by_field, &postings, &field_len, 2.0, BM25_K1, BM25_B);
        assert!(scores[&2] > scores[&1]);
    }

    #[test]
    fn rarer_term_has_higher_idf_contribution() {
        let mut postings = vec![HashMap::new(); FIELDS.len()];
        postings[Field::Text.index()] = postings_for("rare", &[(1, 1)]);
        let mut field_len = vec![HashMap::new(); FIELDS.len()];
        field_len[Field::Text.index()] = [(1, 10)].into_iter().collect();

        let mut terms_by_field = vec![Vec::new(); FIELDS.len()];
        terms_by_field[Field::Text.index()] = vec!["rare"];

        let scores_rare =
            bm25f_scores(&terms_by_field, &postings, &field_len, 100.0, BM25_K1, BM25_B);

        postings[Field::Text.index()] =
            postings_for("common", &(1..=50).map(|i| (i, 1)).collect::<Vec<_>>());
        field_len[Field::Text.index()] = (1..=50).map(|i| (i, 10)).collect();
        terms_by_field[Field::Text.index()] = vec!["common"];
        let scores_common =
            bm25f_scores(&terms_by_field, &postings, &field_len, 100.0, BM25_K1, BM25_B);

        assert!(scores_rare[&1] > scores_common[&1]);
    }

    #[test]
    fn node_name_field_boost_outweighs_unboosted_fields_at_equal_tf_idf() {
        let mut postings = vec![HashMap::new(); FIELDS.len()];
        postings[Field::NodeName.index()] = postings_for("waystone", &[(1, 1)]);
        postings[Field::Owner.index()] = postings_for("waystone", &[(2, 1)]);
        let mut field_len = vec![HashMap::new(); FIELDS.len()];
        field_len[Field::NodeName.index()] = [(1, 5)].into_iter().collect();
        field_len[Field::Owner.index()] = [(2, 5)].into_iter().collect();

        let mut terms_by_field = vec![Vec::new(); FIELDS.len()];
        terms_by_field[Field::NodeName.index()] = vec!["waystone"];
        terms_by_field[Field::Owner.index()] = vec!["waystone"];

        let scores =
            bm25f_scores(&terms_by_field, &postings, &field_len, 2.0, BM25_K1, BM25_B);
        assert!(scores[&1] > scores[&2]);
    }

    #[test]
    fn no_matching_term_yields_no_score_entries() {
        let postings = vec![HashMap::new(); FIELDS.len()];
        let field_len = vec![HashMap::new(); FIELDS.len()];
        let mut terms_by_field = vec![Vec::new(); FIELDS.len()];
        terms_by_field[Field::Text.index()] = vec!["missing"];
        let scores =
            bm25f_scores(&terms_by_field, &postings, &field_len, 10.0, BM25_K1, BM25_B);
        assert!(scores.is_empty());
    }
}
