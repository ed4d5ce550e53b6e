//! Refits every active node's announce-rate posterior from the crawler's
//! `nomadnetwork.node.log*` announce logs.
//!
//! Grounded in `original_source/src/core/search/nodes_downtime.py`'s
//! `_load_recent_nomad_node_announces`/`recalc_node_survival_params`.

use std::collections::HashMap;
use std::path::Path;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use waystone_store::{active_node_addresses, persist_posterior, Store};
use waystone_types::Result;

use crate::posterior::fit_site_params;

const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

/// One parsed line of a `nomadnetwork.node.log*` file: the announcing
/// node's destination hash and the wall-clock time it was heard at.
struct AnnounceRecord {
    dst: String,
    ts: f64,
}

fn parse_log_line(line: &str) -> Option<AnnounceRecord> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    let dst = value.get("dst")?.as_str()?.trim().to_string();
    if dst.is_empty() {
        return None;
    }
    let ts_raw = value.get("datetime")?.as_str()?;
    let ts = OffsetDateTime::parse(ts_raw, &Rfc3339).ok()?.unix_timestamp() as f64;
    Some(AnnounceRecord { dst, ts })
}

/// Scans `log_dir` for `nomadnetwork.node.log*` files and groups announce
/// timestamps newer than `since_ts` by destination hash. Also returns the
/// earliest timestamp seen across all files (regardless of `since_ts`), used
/// to bound the observation window when logs don't go back the full
/// lookback period.
fn load_recent_announces(
    log_dir: &Path,
    since_ts: f64,
) -> (HashMap<String, Vec<f64>>, Option<f64>) {
    let mut announces: HashMap<String, Vec<f64>> = HashMap::new();
    let mut earliest: Option<f64> = None;

    if !log_dir.is_dir() {
        return (announces, earliest);
    }

    let mut paths: Vec<_> = WalkDir::new(log_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().starts_with("nomadnetwork.node.log"))
        .map(|e| e.path().to_path_buf())
        .collect();
    paths.sort();

    for path in paths {
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read announce log");
                continue;
            }
        };
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(record) = parse_log_line(line) else {
                debug!(path = %path.display(), "skipping unparsable announce log line");
                continue;
            };
            earliest = Some(earliest.map_or(record.ts, |e: f64| e.min(record.ts)));
            if record.ts < since_ts {
                continue;
            }
            announces.entry(record.dst).or_default().push(record.ts);
        }
    }

    (announces, earliest)
}

/// Refits every active node's `(alpha, beta, window_seconds, k_events)`
/// from announces heard in the last `lookback_days` days, and persists the
/// result. Returns the number of nodes updated. Nodes with no announces in
/// the window still get a (weaker) refit, since a silent node's posterior
/// should drift back toward the prior as time passes without evidence.
pub fn recalc_node_survival_params(
    store: &Store,
    log_dir: &Path,
    lookback_days: u32,
    now: f64,
) -> Result<usize> {
    let lookback_days = lookback_days.max(1);
    let max_window_seconds = lookback_days as f64 * SECONDS_PER_DAY;
    let since_ts = now - max_window_seconds;

    let (announces, earliest_ts) = load_recent_announces(log_dir, since_ts);
    let lookback_seconds = match earliest_ts {
        None => 0.0,
        Some(earliest) => (now - earliest).clamp(0.0, max_window_seconds),
    };

    let addresses = active_node_addresses(store)?;
    info!(nodes = addresses.len(), lookback_seconds, "refitting node survival parameters");

    let mut updated = 0;
    for dst in addresses {
        let mut heard = announces.get(&dst).cloned().unwrap_or_default();
        heard.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let params = fit_site_params(&heard, lookback_seconds);
        persist_posterior(store, &dst, &params)?;
        updated += 1;
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_log(dir: &Path, name: &str, lines: &[String]) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
    }

    #[test]
    fn parses_valid_json_lines_and_skips_garbage() {
        let dst = "a".repeat(32);
        let line = format!(r#"{{"dst": "{dst}", "datetime": "2024-01-01T00:00:00+00:00"}}"#);
        let record = parse_log_line(&line).unwrap();
        assert_eq!(record.dst, dst);

        assert!(parse_log_line("not json").is_none());
        assert!(parse_log_line("{}").is_none());
    }

    #[test]
    fn recalc_updates_every_active_node() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open_in_memory().unwrap();
        let dst = "b".repeat(32);
        waystone_store::upsert_node(&store, &dst, "ident", "name", 0.0).unwrap();

        let log_dir = tmp.path().join("announces");
        std::fs::create_dir_all(&log_dir).unwrap();
        let now = OffsetDateTime::from_unix_timestamp(2_000_000).unwrap();
        let line = format!(
            r#"{{"dst": "{dst}", "datetime": "{}"}}"#,
            now.format(&Rfc3339).unwrap()
        );
        write_log(&log_dir, "nomadnetwork.node.log", &[line]);

        let updated =
            recalc_node_survival_params(&store, &log_dir, 14, now.unix_timestamp() as f64)
                .unwrap();
        assert_eq!(updated, 1);

        let node = waystone_store::get_node(&store, &dst).unwrap().unwrap();
        assert_eq!(node.posterior.k_events, 1);
    }

    #[test]
    fn missing_log_dir_still_refits_every_node_toward_prior() {
        let store = Store::open_in_memory().unwrap();
        let dst = "c".repeat(32);
        waystone_store::upsert_node(&store, &dst, "ident", "name", 0.0).unwrap();

        let missing = Path::new("/does/not/exist");
        let updated = recalc_node_survival_params(&store, missing, 14, 10_000.0).unwrap();
        assert_eq!(updated, 1);
        let node = waystone_store::get_node(&store, &dst).unwrap().unwrap();
        assert_eq!(node.posterior.k_events, 0);
    }
}
