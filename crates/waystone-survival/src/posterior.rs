//! Fits a node's announce-rate posterior and turns it into a confidence
//! interval on P(dead).
//!
//! Grounded in `original_source/src/core/search/nodes_downtime.py`'s
//! `fit_site_params`, `gamma_ppf`, `dead_probability_ci` and `pi_down`.

use waystone_types::AnnouncePosterior;

use crate::gamma::inverse_lower_regularized;

/// `(alpha, beta)` prior for the background death-rate model: calibrated
/// offline against the original network's observed up/down cadence, not
/// something this crate derives.
pub const PRIOR_DOWN: (f64, f64) = (4.006_664_496_255_316e-7, 2.747_709_454_671_377_5e-5);

/// One announce expected every 30 minutes, before any evidence is observed.
pub const PRIOR_ANNOUNCE: (f64, f64) = (1.0, 1800.0);

/// Fits the Gamma(alpha, beta) posterior over a node's announce rate given
/// the unix-second timestamps of announces heard within `window_seconds`.
/// `window_seconds` of `0.0` falls back to the span between the first and
/// last observed announce (matching the original's `window_seconds or
/// (times[-1] - times[0])`, which only applies when at least one announce
/// was heard — with zero announces the window stays `0.0`).
pub fn fit_site_params(heard_announces: &[f64], window_seconds: f64) -> AnnouncePosterior {
    let mut times: Vec<f64> = heard_announces.to_vec();
    times.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let k = times.len() as i64;

    let alpha = PRIOR_ANNOUNCE.0 + k as f64;
    let beta = PRIOR_ANNOUNCE.1 + window_seconds;

    let resolved_window = if window_seconds != 0.0 {
        window_seconds
    } else if let (Some(&first), Some(&last)) = (times.first(), times.last()) {
        last - first
    } else {
        0.0
    };

    AnnouncePosterior { alpha, beta, window_seconds: resolved_window, k_events: k }
}

/// `scipy.stats.gamma.ppf(p, a=shape, scale=1/rate)`: the quantile of a
/// Gamma distribution parameterized by shape `alpha` and rate `beta`.
pub fn gamma_ppf(p: f64, alpha: f64, beta: f64) -> f64 {
    inverse_lower_regularized(alpha, p) / beta
}

/// Prior probability that a node has died within `dt_seconds`, from the
/// background up/down rate model (independent of any particular node's
/// announce history — this is the "before we know anything about this
/// specific node" baseline mixed in by [`dead_probability_ci`]).
pub fn pi_down(dt_seconds: f64) -> f64 {
    let (a, b) = PRIOR_DOWN;
    let s = a + b;
    if s <= 0.0 || dt_seconds <= 0.0 {
        return 0.0;
    }
    (a / s) * (1.0 - (-s * dt_seconds).exp())
}

/// A two-sided `ci`-confidence interval (e.g. `ci = 0.90`) on the
/// probability that a node is dead, given its fitted announce-rate
/// posterior `(alpha, beta)` and the elapsed time `dt_seconds` since it was
/// last seen. Returns `(p_dead_low, p_dead_high)`.
pub fn dead_probability_ci(alpha: f64, beta: f64, dt_seconds: f64, ci: f64) -> (f64, f64) {
    assert!(dt_seconds >= 0.0, "dt_seconds must be >= 0");
    assert!(ci > 0.0 && ci < 1.0, "ci must be in (0, 1)");

    let q_lo = (1.0 - ci) / 2.0;
    let q_hi = 1.0 - q_lo;

    let mu_low = gamma_ppf(q_lo, alpha, beta).max(0.0);
    let mu_high = gamma_ppf(q_hi, alpha, beta).max(mu_low);

    let p0_high = (-mu_low * dt_seconds).exp();
    let p0_low = (-mu_high * dt_seconds).exp();

    let pi = pi_down(dt_seconds);
    let p_dead_from_p0 = |p0: f64| -> f64 {
        let denom = pi + (1.0 - pi) * p0;
        pi / denom
    };

    let mut p_dead_low = p_dead_from_p0(p0_high).clamp(0.0, 1.0);
    let mut p_dead_high = p_dead_from_p0(p0_low).clamp(0.0, 1.0);
    if p_dead_low > p_dead_high {
        std::mem::swap(&mut p_dead_low, &mut p_dead_high);
    }

    (p_dead_low, p_dead_high)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_announces_yields_prior() {
        let params = fit_site_params(&[], 0.0);
        assert_eq!(params.alpha, PRIOR_ANNOUNCE.0);
        assert_eq!(params.beta, PRIOR_ANNOUNCE.1);
        assert_eq!(params.k_events, 0);
    }

    #[test]
    fn announces_shift_posterior_toward_more_evidence() {
        let params = fit_site_params(&[100.0, 200.0, 300.0], 1000.0);
        assert_eq!(params.k_events, 3);
        assert_eq!(params.alpha, PRIOR_ANNOUNCE.0 + 3.0);
        assert_eq!(params.beta, PRIOR_ANNOUNCE.1 + 1000.0);
    }

    #[test]
    fn window_falls_back_to_observed_span_when_zero() {
        let params = fit_site_params(&[50.0, 150.0], 0.0);
        assert_eq!(params.window_seconds, 100.0);
    }

    #[test]
    fn recently_seen_node_has_low_dead_probability() {
        let params = fit_site_params(&[0.0, 600.0, 1200.0, 1800.0], 1800.0);
        let (lo, hi) = dead_probability_ci(params.alpha, params.beta, 60.0, 0.90);
        assert!(hi < 0.5, "expected low dead probability shortly after last seen, got {hi}");
        assert!(lo <= hi);
    }

    #[test]
    fn long_silent_node_has_higher_dead_probability_than_recently_seen() {
        let params = fit_site_params(&[0.0, 600.0, 1200.0, 1800.0], 1800.0);
        let (_lo_recent, hi_recent) = dead_probability_ci(params.alpha, params.beta, 60.0, 0.90);
        let (_lo_long, hi_long) =
            dead_probability_ci(params.alpha, params.beta, 30.0 * 24.0 * 3600.0, 0.90);
        assert!(hi_long > hi_recent);
    }

    #[test]
    fn pi_down_is_zero_at_dt_zero_and_grows_with_time() {
        assert_eq!(pi_down(0.0), 0.0);
        assert!(pi_down(3600.0) > 0.0);
        assert!(pi_down(3600.0 * 24.0) > pi_down(3600.0));
    }

    #[test]
    fn ci_bounds_stay_within_unit_interval() {
        let (lo, hi) = dead_probability_ci(1.0, 1800.0, 1_000_000.0, 0.90);
        assert!((0.0..=1.0).contains(&lo));
        assert!((0.0..=1.0).contains(&hi));
    }
}
