//! Utilities for shared state

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks the mutex, recovering the data if a panicking test thread poisoned it
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
