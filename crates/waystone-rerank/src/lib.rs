//! Re-ranking pipeline (spec.md C10): dedupe, cap results per address,
//! min-max normalize three signals (text score, log-rank, liveness) and
//! fuse them with fixed weights, pushing low-confidence-alive results last.
//!
//! Grounded in `original_source/src/core/search/rerank.py::Ranker`.

use std::collections::HashMap;

use waystone_store::Store;
use waystone_survival::{dead_probability_ci, PRIOR_ANNOUNCE};
use waystone_types::{Result, SearchResult};

const TEXT_WEIGHT: f64 = 0.65;
const RANK_WEIGHT: f64 = 0.25;
const ALIVE_WEIGHT: f64 = 0.1;
const DEAD_CONFIDENCE: f64 = 0.9;
const MAX_SAME_ADDRESS: usize = 2;

struct NodeFeatures {
    rank: f64,
    p_dead_low: f64,
    p_dead_high: f64,
    last_seen: f64,
}

const ZERO_FEATURES: NodeFeatures =
    NodeFeatures { rank: 0.0, p_dead_low: 0.0, p_dead_high: 0.0, last_seen: 0.0 };

/// Dedupes by URL, caps how many hits a single address may contribute, then
/// fuses text relevance with node rank and liveness into a final score.
/// Results with `p_dead_low > 0.9` (the node is confidently dead) sort after
/// every other result, regardless of score.
pub fn rerank(store: &Store, results: Vec<SearchResult>, now: f64) -> Result<Vec<SearchResult>> {
    let results = filter_duplicate_urls(results);
    let results = filter_same_address(results, MAX_SAME_ADDRESS);
    rerank_impl(store, results, now)
}

fn filter_duplicate_urls(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = std::collections::HashSet::new();
    results.into_iter().filter(|r| seen.insert(r.url.clone())).collect()
}

fn filter_same_address(results: Vec<SearchResult>, max_same_address: usize) -> Vec<SearchResult> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut kept = Vec::with_capacity(results.len());
    for result in results {
        let count = counts.entry(result.address.clone()).or_insert(0);
        if *count < max_same_address {
            *count += 1;
            kept.push(result);
        }
    }
    kept
}

fn rerank_impl(store: &Store, results: Vec<SearchResult>, now: f64) -> Result<Vec<SearchResult>> {
    if results.is_empty() {
        return Ok(Vec::new());
    }

    let mut feature_cache: HashMap<String, NodeFeatures> = HashMap::new();
    for result in &results {
        if feature_cache.contains_key(&result.address) {
            continue;
        }
        let features = node_features(store, &result.address, now)?;
        feature_cache.insert(result.address.clone(), features);
    }

    let text_scores: Vec<f64> = results.iter().map(|r| r.score).collect();
    let ranks: Vec<f64> =
        results.iter().map(|r| feature_cache[&r.address].rank).collect();
    let log_ranks: Vec<f64> = ranks.iter().map(|r| r.max(0.0).ln_1p()).collect();

    let text_norm = minmax(&text_scores);
    let rank_norm = minmax(&log_ranks);

    let mut scored: Vec<(SearchResult, f64)> = Vec::with_capacity(results.len());
    for (i, result) in results.into_iter().enumerate() {
        let features = &feature_cache[&result.address];
        let node_alive =
            (1.0 - (features.p_dead_low + features.p_dead_high) / 2.0).clamp(0.0, 1.0);

        let new_score =
            TEXT_WEIGHT * text_norm[i] + RANK_WEIGHT * rank_norm[i] + ALIVE_WEIGHT * node_alive;

        let mut ranked = result;
        ranked.score = new_score;
        ranked.p_dead_low = Some(features.p_dead_low);
        ranked.p_dead_high = Some(features.p_dead_high);
        ranked.last_seen = Some(features.last_seen);

        scored.push((ranked, features.p_dead_low));
    }

    scored.sort_by(|a, b| {
        let confidently_dead_a = a.1 > DEAD_CONFIDENCE;
        let confidently_dead_b = b.1 > DEAD_CONFIDENCE;
        confidently_dead_a
            .cmp(&confidently_dead_b)
            .then_with(|| b.0.score.partial_cmp(&a.0.score).unwrap_or(std::cmp::Ordering::Equal))
    });

    Ok(scored.into_iter().map(|(r, _)| r).collect())
}

fn node_features(store: &Store, address: &str, now: f64) -> Result<NodeFeatures> {
    let node = match waystone_store::get_node(store, address)? {
        Some(n) if !n.removed => n,
        _ => return Ok(ZERO_FEATURES),
    };
    let dt = (now - node.last_seen).max(0.0);
    let (p_dead_low, p_dead_high) = dead_probability_ci(
        if node.posterior.alpha > 0.0 { node.posterior.alpha } else { PRIOR_ANNOUNCE.0 },
        if node.posterior.beta > 0.0 { node.posterior.beta } else { PRIOR_ANNOUNCE.1 },
        dt,
        0.90,
    );
    Ok(NodeFeatures { rank: node.rank, p_dead_low, p_dead_high, last_seen: node.last_seen })
}

fn minmax(values: &[f64]) -> Vec<f64> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let den = max - min;
    if den <= 0.0 || !den.is_finite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / den).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use waystone_store::upsert_node;

    fn result(url: &str, address: &str, score: f64) -> SearchResult {
        SearchResult::new(
            url.to_string(),
            "some text".to_string(),
            "owner".to_string(),
            address.to_string(),
            "name".to_string(),
            score,
        )
    }

    #[test]
    fn deduplicates_by_url_before_scoring() {
        let store = Store::open_in_memory().unwrap();
        let addr = "a".repeat(32);
        upsert_node(&store, &addr, "i", "n", 0.0).unwrap();
        let results = vec![result("u1", &addr, 1.0), result("u1", &addr, 2.0)];
        let ranked = rerank(&store, results, 100.0).unwrap();
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn caps_results_per_address() {
        let store = Store::open_in_memory().unwrap();
        let addr = "b".repeat(32);
        upsert_node(&store, &addr, "i", "n", 0.0).unwrap();
        let results =
            vec![result("u1", &addr, 1.0), result("u2", &addr, 2.0), result("u3", &addr, 3.0)];
        let ranked = rerank(&store, results, 100.0).unwrap();
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn higher_rank_node_outranks_equal_text_score() {
        let store = Store::open_in_memory().unwrap();
        let hi = "c".repeat(32);
        let lo = "d".repeat(32);
        upsert_node(&store, &hi, "i", "n", 0.0).unwrap();
        upsert_node(&store, &lo, "i", "n", 0.0).unwrap();
        waystone_store::persist_ranks(&store, &[(hi.clone(), 10.0), (lo.clone(), 0.1)]).unwrap();

        let results = vec![result("u1", &hi, 1.0), result("u2", &lo, 1.0)];
        let ranked = rerank(&store, results, 100.0).unwrap();
        assert_eq!(ranked[0].url, "u1");
    }

    #[test]
    fn confidently_dead_results_sort_last_regardless_of_score() {
        let store = Store::open_in_memory().unwrap();
        let alive = "e".repeat(32);
        let long_dead = "f".repeat(32);
        upsert_node(&store, &alive, "i", "n", 1000.0).unwrap();
        upsert_node(&store, &long_dead, "i", "n", 0.0).unwrap();

        let results = vec![result("u1", &long_dead, 100.0), result("u2", &alive, 0.01)];
        // now is far enough past long_dead's last_seen, with very little
        // evidence about its announce rate, to push p_dead_low above 0.9.
        let ranked = rerank(&store, results, 1e9).unwrap();
        assert_eq!(ranked.last().unwrap().url, "u1");
    }

    #[test]
    fn missing_node_gets_zero_features_not_an_error() {
        let store = Store::open_in_memory().unwrap();
        let results = vec![result("u1", &"g".repeat(32), 1.0)];
        let ranked = rerank(&store, results, 100.0).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].p_dead_low, Some(0.0));
    }
}
