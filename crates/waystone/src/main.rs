//! Binary entry point: parse config, open the store and index, wire up the
//! scheduler, and run forever. Mirrors `original_source/src/core/main.py`'s
//! top-level `init_db()` + `app.register_handlers(dst)` + scheduler-loop
//! shape, minus the request/response framework (out of scope, spec.md §1).

use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tracing::info;

use waystone::engine::Engine;
use waystone::logging;
use waystone::option::Opt;
use waystone::scheduler::Scheduler;
use waystone::transport::UnwiredTransport;
use waystone_index::Index;
use waystone_store::Store;
use waystone_types::address::encode_hex;

fn main() -> anyhow::Result<()> {
    let opt = Opt::parse();
    logging::init(&opt.log_level);
    info!(storage_path = %opt.storage_path.display(), "waystone starting up");

    std::fs::create_dir_all(&opt.storage_path)
        .with_context(|| format!("failed to create {}", opt.storage_path.display()))?;

    let store = Arc::new(
        Store::open(opt.db_path())
            .with_context(|| format!("failed to open store at {}", opt.db_path().display()))?,
    );

    let index = match Index::load_snapshot(opt.search_index_dir()) {
        Ok(index) => {
            info!(size = index.get_index_size(), "loaded full-text index snapshot");
            index
        }
        Err(e) => {
            info!(error = %e, "no usable index snapshot found, starting with an empty index");
            Index::new()
        }
    };
    let index = Arc::new(Mutex::new(index));

    // Deriving our own destination hash/identity is the overlay transport
    // library's job (spec.md §1); this takes the leading 16 bytes of the
    // identity file as a stand-in so the scheduler's re-announce job has
    // something to upsert until a real transport crate is wired in.
    let identity_bytes = std::fs::read(&opt.node_identity_path)
        .with_context(|| format!("failed to read {}", opt.node_identity_path.display()))?;
    anyhow::ensure!(
        identity_bytes.len() >= 16,
        "{} is too short to derive a destination hash from",
        opt.node_identity_path.display()
    );
    let self_dst = encode_hex(&identity_bytes[..16]);
    let self_identity = self_dst.clone();

    // Only used by the page-request interface; the scheduler and announce
    // handler talk to the store/index directly. Constructing it here is
    // what wires it up for whatever (out-of-scope) request framework
    // embeds this crate.
    let _engine = Engine::new(Arc::clone(&store), Arc::clone(&index));

    let transport = Arc::new(UnwiredTransport);
    let scheduler =
        Scheduler::new(Arc::clone(&store), Arc::clone(&index), transport, opt, self_dst, self_identity);

    scheduler.run()
}
