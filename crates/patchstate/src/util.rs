use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a callback panicked while another
/// thread held it. Registry state is never left half-updated because
/// callbacks always run with the lock released.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A change callback shared between a registry and whoever fires it.
pub(crate) type Callback = std::sync::Arc<dyn Fn() + Send + Sync>;
