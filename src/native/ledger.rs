//! Debug-build ledger of live owning wrappers.
//!
//! Every [`Owned`](super::Owned) over a uniquely owned resource claims its
//! address here and gives it back when released. A second claim on an
//! address that is still live means two wrappers would free the same
//! pointer; `Owned::from_raw` turns that into a panic. Release builds skip
//! the bookkeeping entirely.

use std::collections::BTreeMap;

use parking_lot::Mutex;

static LIVE: Mutex<BTreeMap<usize, &'static str>> = parking_lot::const_mutex(BTreeMap::new());

/// record a new owning wrapper; false if the address is already owned
pub(crate) fn claim(addr: usize, kind: &'static str) -> bool {
    if !cfg!(debug_assertions) {
        return true;
    }

    let mut live = LIVE.lock();
    if live.contains_key(&addr) {
        return false;
    }
    live.insert(addr, kind);
    true
}

pub(crate) fn forget(addr: usize) {
    if cfg!(debug_assertions) {
        LIVE.lock().remove(&addr);
    }
}

/// check whether a live owning wrapper holds this pointer
pub fn is_owned<T>(ptr: *const T) -> bool {
    LIVE.lock().contains_key(&(ptr as usize))
}

/// number of live owning wrappers over uniquely owned resources
pub fn outstanding() -> usize {
    LIVE.lock().len()
}

/// number of live owning wrappers of one resource kind
pub fn outstanding_of(kind: &str) -> usize {
    LIVE.lock().values().filter(|k| **k == kind).count()
}
