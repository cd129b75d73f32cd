//! An atomic-write helper with a global registry, so temporary files are cleaned up even if
//! the process is terminated by a signal before the write finishes.
//!
//! Every `*_HEAD`, `MERGE_MSG`, ref, and index write in the rest of the workspace goes through
//! here: write to a sibling temp file, `fsync`, then rename into place.
#![deny(unsafe_code)]

use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use dashmap::DashMap;
use once_cell::race::OnceBox;

mod handle;
mod signal;

pub use handle::{ContainingDirectory, Handle};
pub use signal::SignalHandlerMode;

static REGISTRY: OnceBox<DashMap<usize, PathBuf>> = OnceBox::new();
static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

fn registry() -> &'static DashMap<usize, PathBuf> {
    REGISTRY.get_or_init(|| Box::new(DashMap::new()))
}

fn register(path: PathBuf) -> usize {
    let id = NEXT_ID.fetch_add(1, Ordering::SeqCst);
    registry().insert(id, path);
    id
}

fn deregister(id: usize) {
    registry().remove(&id);
}

/// Install the global signal handler that removes all currently registered tempfiles
/// before the process dies. Idempotent: calling this multiple times, even with a
/// different [`SignalHandlerMode`], is safe.
pub fn setup(mode: SignalHandlerMode) {
    signal::install(mode);
}

/// Remove every path currently tracked by the registry, best-effort. Used by the
/// signal handler and directly by tests.
pub(crate) fn cleanup_all() {
    let map: HashMap<usize, PathBuf> = registry().clone().into_iter().collect();
    for (_, path) in map {
        let _ = std::fs::remove_file(path);
    }
}

/// Create a new writable tempfile next to `at`, creating the containing directory first
/// if `containing_dir` requests it.
pub fn new(at: impl AsRef<Path>, containing_dir: ContainingDirectory) -> io::Result<Handle> {
    Handle::new(at.as_ref(), containing_dir)
}
