//! Shared impulse count.

use std::sync::atomic::{AtomicU64, Ordering};

/// The externally visible count.
///
/// Increments come from confirmed rising edges, overwrites from the control
/// surface. Both are single atomic operations, so no increment is lost to a
/// racing overwrite or read; the last writer wins.
#[derive(Debug, Default)]
pub struct CounterStore {
    count: AtomicU64,
}

impl CounterStore {
    /// Creates a store holding zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current count.
    pub fn read(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    /// Replaces the count unconditionally.
    pub fn overwrite(&self, value: u64) {
        self.count.store(value, Ordering::Release);
    }

    /// Adds one impulse, wrapping at `u64::MAX`. Returns the new count.
    pub(crate) fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_increment_and_overwrite() {
        let store = CounterStore::new();
        assert_eq!(store.read(), 0);
        assert_eq!(store.increment(), 1);
        store.overwrite(42);
        assert_eq!(store.read(), 42);
        assert_eq!(store.increment(), 43);
        store.overwrite(0);
        assert_eq!(store.read(), 0);
    }

    #[test]
    fn test_wraps() {
        let store = CounterStore::new();
        store.overwrite(u64::MAX);
        assert_eq!(store.increment(), 0);
    }

    #[test]
    fn test_concurrent_increments_not_lost() {
        let store = Arc::new(CounterStore::new());
        std::thread::scope(|s| {
            for _ in 0..4 {
                let store = store.clone();
                s.spawn(move || {
                    for _ in 0..1000 {
                        store.increment();
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..1000 {
                    let _ = store.read();
                }
            });
        });
        assert_eq!(store.read(), 4000);
    }
}
