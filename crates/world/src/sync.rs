use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

static LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_lock_poison_once(resource: &'static str, operation: &'static str) {
    if LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(resource, operation, "world lock poisoned; recovered inner value");
    }
}

pub(crate) fn read_or_recover<'a, T>(
    lock: &'a RwLock<T>,
    resource: &'static str,
) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn_lock_poison_once(resource, "read");
            poisoned.into_inner()
        }
    }
}

pub(crate) fn write_or_recover<'a, T>(
    lock: &'a RwLock<T>,
    resource: &'static str,
) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn_lock_poison_once(resource, "write");
            poisoned.into_inner()
        }
    }
}
