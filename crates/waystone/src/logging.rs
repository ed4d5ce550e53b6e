//! Logging setup (spec.md's ambient stack table): `tracing` +
//! `tracing-subscriber`, filtered by an `EnvFilter` directive built from
//! `Opt::log_level`, matching the teacher's `fmt`-layer-over-`EnvFilter`
//! wiring in `meilisearch::main` (minus the reload layer, since there's no
//! HTTP route to change the level at runtime here).

use tracing_subscriber::EnvFilter;

pub fn init(log_level: &str) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}
