//! Thread-safe wrapper around [`Lru`], lazily constructed on first `add`.
//!
//! Mirrors the original cache's `cache` wrapper type: a mutex guards an
//! `Option<Lru>` so a zero-valued cache is harmless until the first write
//! provides the byte budget that constructs the real LRU.

use parking_lot::Mutex;

use crate::byte_view::ByteView;
use crate::lru::Lru;

/// The external contract surface a [`crate::group::Group`] needs: `get` and
/// `add`, nothing else. The underlying [`Lru`] is never exposed directly so
/// callers cannot bypass the lock.
pub struct ConcurrentCache {
    max_bytes: i64,
    inner: Mutex<Option<Lru>>,
}

impl ConcurrentCache {
    /// Creates a wrapper with the given byte budget; the underlying [`Lru`]
    /// is not constructed until the first [`ConcurrentCache::add`].
    pub fn new(max_bytes: i64) -> Self {
        ConcurrentCache {
            max_bytes,
            inner: Mutex::new(None),
        }
    }

    /// Looks up `key`. Returns a miss without constructing the LRU if no
    /// entry has ever been added.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let mut guard = self.inner.lock();
        guard.as_mut()?.get(key)
    }

    /// Inserts or overwrites `key`, lazily constructing the underlying [`Lru`]
    /// on the first call.
    pub fn add(&self, key: impl Into<String>, value: ByteView) {
        let mut guard = self.inner.lock();
        let lru = guard.get_or_insert_with(|| Lru::new(self.max_bytes));
        lru.add(key, value);
    }
}

impl std::fmt::Debug for ConcurrentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.lock();
        f.debug_struct("ConcurrentCache")
            .field("max_bytes", &self.max_bytes)
            .field("constructed", &guard.is_some())
            .field("len", &guard.as_ref().map(Lru::len).unwrap_or(0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_before_any_add_does_not_construct_the_lru() {
        let cache = ConcurrentCache::new(100);
        assert!(cache.get("key1").is_none());
        assert_eq!(format!("{cache:?}").contains("constructed: false"), true);
    }

    #[test]
    fn add_then_get_round_trips() {
        let cache = ConcurrentCache::new(100);
        cache.add("key1", ByteView::from("value1"));
        assert_eq!(cache.get("key1").unwrap().as_bytes(), b"value1");
    }

    #[test]
    fn concurrent_adds_from_multiple_threads_are_all_visible() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(ConcurrentCache::new(10_000));
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = cache.clone();
            handles.push(thread::spawn(move || {
                cache.add(format!("key{i}"), ByteView::from(format!("value{i}")));
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        for i in 0..8 {
            assert!(cache.get(&format!("key{i}")).is_some());
        }
    }
}
