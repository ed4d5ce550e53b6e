//! Bayesian liveness model for nodes (spec.md C9): a Gamma-prior posterior
//! over each node's announce rate, used to derive a confidence interval on
//! its probability of being dead.
//!
//! Grounded in `original_source/src/core/search/nodes_downtime.py`. That
//! module leans on `scipy.stats.gamma` for the quantile function; no
//! equivalent crate appears anywhere in the retrieved example pack, so
//! `gamma.rs` hand-rolls the regularized incomplete gamma function and its
//! inverse the way the original itself hand-rolled everything except the
//! single `gamma.ppf` call.

mod announce_log;
mod gamma;
mod posterior;

pub use announce_log::recalc_node_survival_params;
pub use posterior::{dead_probability_ci, fit_site_params, pi_down, PRIOR_ANNOUNCE, PRIOR_DOWN};
