//! Process resident-set-size sampling for the scheduler's 5-minute RSS log
//! (spec.md §4.9).
//!
//! Grounded in `original_source/src/core/utils.py::get_process_rss_bytes`,
//! which reads `/proc/self/statm` directly with a `resource.getrusage`
//! fallback. `meilisearch`'s `option.rs::total_memory_bytes` shows the
//! idiomatic Rust equivalent using the teacher's own `sysinfo` dependency
//! rather than hand-rolled `/proc` parsing, so this does the same but
//! scoped to the current process instead of total system memory.

use sysinfo::{ProcessesToUpdate, System};

pub fn process_rss_bytes() -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).map(|p| p.memory())
}
