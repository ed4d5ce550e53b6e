//! Power-iteration PageRank over the active citation graph.
//!
//! Grounded in `original_source/src/core/search/pagerank.py::pagerank_impl`,
//! translated line-for-line from its edge-list/out-neighbor representation;
//! the periodic `time.sleep` yield (so a single computation doesn't pin a
//! CPU core for minutes) becomes a `std::thread::sleep` every
//! `sleep_every_iters` iterations, matching `index-scheduler`'s habit of
//! cooperatively yielding inside long batch loops.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use tracing::info;
use waystone_types::{Address, Result};
use waystone_store::{all_active_edges, persist_ranks, ranking_snapshot, Store};

#[derive(Debug, Clone, Copy)]
pub struct PageRankConfig {
    pub alpha: f64,
    pub max_iters: u32,
    pub tol: f64,
    pub sleep_every_iters: u32,
    pub sleep_duration: Duration,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        PageRankConfig {
            alpha: 0.15,
            max_iters: 100,
            tol: 1e-10,
            sleep_every_iters: 5,
            sleep_duration: Duration::from_millis(5),
        }
    }
}

/// Computes PageRank over `edges` restricted to `vertices`; edges touching
/// an address outside `vertices` are ignored. `personalize`, if non-empty,
/// supplies a teleport distribution; an empty or all-non-positive map falls
/// back to a uniform teleport. Output scores sum to `vertices.len()`, not
/// 1.0: each is the stationary probability times N, matching the original's
/// convention so a lone, frequently-cited node's score stays comparable as
/// the graph grows.
pub fn pagerank(
    edges: &[(Address, Address)],
    vertices: &[Address],
    personalize: &HashMap<Address, f64>,
    config: PageRankConfig,
) -> HashMap<Address, f64> {
    assert!((0.0..=1.0).contains(&config.alpha), "alpha must be in [0, 1]");
    assert!(config.max_iters >= 1, "max_iters must be >= 1");
    assert!(config.tol > 0.0, "tol must be > 0");

    let n = vertices.len();
    if n == 0 {
        return HashMap::new();
    }

    let idx_of: HashMap<&Address, usize> =
        vertices.iter().enumerate().map(|(i, v)| (v, i)).collect();

    let mut out_neighbors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut seen = std::collections::HashSet::new();
    for (src, dst) in edges {
        let (Some(&si), Some(&di)) = (idx_of.get(src), idx_of.get(dst)) else {
            continue;
        };
        if !seen.insert((si, di)) {
            continue;
        }
        out_neighbors[si].push(di);
    }

    let outdeg: Vec<usize> = out_neighbors.iter().map(|v| v.len()).collect();
    let dangling: Vec<usize> = (0..n).filter(|&i| outdeg[i] == 0).collect();

    let v = build_teleport_vector(vertices, &idx_of, personalize, n);

    let mut r = vec![1.0 / n as f64; n];
    let one_minus_alpha = 1.0 - config.alpha;

    for it in 0..config.max_iters {
        if config.sleep_every_iters > 0 && it % config.sleep_every_iters == 0 {
            thread::sleep(config.sleep_duration);
        }

        let mut r_new = vec![0.0; n];

        let dangling_mass: f64 = dangling.iter().map(|&i| r[i]).sum();

        for i in 0..n {
            let d = outdeg[i];
            if d == 0 {
                continue;
            }
            let share = one_minus_alpha * r[i] / d as f64;
            for &j in &out_neighbors[i] {
                r_new[j] += share;
            }
        }

        let coeff = config.alpha + one_minus_alpha * dangling_mass;
        if coeff != 0.0 {
            for j in 0..n {
                r_new[j] += coeff * v[j];
            }
        }

        let sum: f64 = r_new.iter().sum();
        if sum != 0.0 {
            let inv_sum = 1.0 / sum;
            for x in r_new.iter_mut() {
                *x *= inv_sum;
            }
        }

        let diff: f64 = r_new.iter().zip(&r).map(|(a, b)| (a - b).abs()).sum();
        r = r_new;
        if diff < config.tol {
            break;
        }
    }

    vertices.iter().cloned().zip(r.into_iter().map(|x| x * n as f64)).collect()
}

fn build_teleport_vector(
    vertices: &[Address],
    idx_of: &HashMap<&Address, usize>,
    personalize: &HashMap<Address, f64>,
    n: usize,
) -> Vec<f64> {
    if personalize.is_empty() {
        return vec![1.0 / n as f64; n];
    }
    let mut v = vec![0.0; n];
    let mut total = 0.0;
    for (node, w) in personalize {
        if *w > 0.0 {
            if let Some(&i) = idx_of.get(node) {
                v[i] += w;
                total += w;
            }
        }
    }
    if total <= 0.0 {
        return vec![1.0 / n as f64; n];
    }
    let inv = 1.0 / total;
    for x in v.iter_mut() {
        *x *= inv;
    }
    v
}

/// Reads the current active graph from `store`, computes PageRank and
/// writes the scores back, batching the write in chunks of `batch_size`
/// (mirrors the original's `session.execute` chunking, here folded into
/// `waystone_store::persist_ranks`'s single transaction).
pub fn run_and_persist(store: &Store, config: PageRankConfig) -> Result<HashMap<Address, f64>> {
    let edges = all_active_edges(store)?;
    let vertices: Vec<Address> =
        ranking_snapshot(store)?.into_iter().map(|n| n.dst).collect();

    info!(edges = edges.len(), nodes = vertices.len(), "started pagerank");
    let ranks = pagerank(&edges, &vertices, &HashMap::new(), config);
    info!("pagerank finished");

    if ranks.is_empty() {
        return Ok(ranks);
    }

    let rows: Vec<(String, f64)> = ranks.iter().map(|(k, v)| (k.clone(), *v)).collect();
    persist_ranks(store, &rows)?;
    info!("ranks updated");
    Ok(ranks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(c: char) -> Address {
        c.to_string().repeat(32)
    }

    #[test]
    fn scores_sum_to_vertex_count() {
        let a = addr('a');
        let b = addr('b');
        let c = addr('c');
        let edges = vec![(a.clone(), b.clone()), (b.clone(), c.clone()), (c.clone(), a.clone())];
        let vertices = vec![a, b, c];
        let ranks = pagerank(&edges, &vertices, &HashMap::new(), PageRankConfig::default());
        let total: f64 = ranks.values().sum();
        assert!((total - 3.0).abs() < 1e-6, "total was {total}");
    }

    #[test]
    fn heavily_cited_node_outranks_uncited_node() {
        let a = addr('a');
        let b = addr('b');
        let c = addr('c');
        // b and c both cite a; a cites nothing.
        let edges = vec![(b.clone(), a.clone()), (c.clone(), a.clone())];
        let vertices = vec![a.clone(), b.clone(), c.clone()];
        let ranks = pagerank(&edges, &vertices, &HashMap::new(), PageRankConfig::default());
        assert!(ranks[&a] > ranks[&b]);
        assert!(ranks[&a] > ranks[&c]);
    }

    #[test]
    fn dangling_node_mass_is_redistributed_not_lost() {
        let a = addr('a');
        let b = addr('b');
        // a cites b; b is dangling (no outgoing edges).
        let edges = vec![(a.clone(), b.clone())];
        let vertices = vec![a.clone(), b.clone()];
        let ranks = pagerank(&edges, &vertices, &HashMap::new(), PageRankConfig::default());
        let total: f64 = ranks.values().sum();
        assert!((total - 2.0).abs() < 1e-6);
    }

    #[test]
    fn empty_vertex_set_returns_empty_map() {
        let ranks = pagerank(&[], &[], &HashMap::new(), PageRankConfig::default());
        assert!(ranks.is_empty());
    }

    #[test]
    fn personalization_concentrates_rank_near_seed() {
        let a = addr('a');
        let b = addr('b');
        let edges = vec![];
        let vertices = vec![a.clone(), b.clone()];
        let mut personalize = HashMap::new();
        personalize.insert(a.clone(), 1.0);
        let ranks = pagerank(&edges, &vertices, &personalize, PageRankConfig::default());
        assert!(ranks[&a] > ranks[&b]);
    }
}
