//! Size-bounded LRU cache with byte-accounted eviction.
//!
//! Mirrors the original cache's `lru.Cache`: a recency-ordered list of
//! entries plus a hash index, evicting from the tail whenever admitting or
//! growing an entry would push `nbytes` over `max_bytes`.

use std::collections::HashMap;

use tracing::warn;

use crate::byte_view::ByteView;
use crate::list::{Entry as ListEntry, List};

/// One live cache entry: the key is duplicated alongside the value so the
/// tail can be evicted, and its index slot removed, without a reverse
/// lookup from list node back to key.
struct Record {
    key: String,
    value: ByteView,
}

impl Record {
    fn weight(&self) -> usize {
        self.key.len() + self.value.len()
    }
}

/// Callback invoked whenever an entry is evicted, whether by `RemoveOldest`
/// or as a side effect of `Add`/`Del` pressure.
pub type OnEvicted = Box<dyn FnMut(&str, &ByteView) + Send>;

/// A single-threaded, byte-accounted LRU cache.
///
/// Thread-safety is layered on top by [`crate::concurrent::ConcurrentCache`];
/// this type assumes exclusive access to `&mut self` for every mutation.
pub struct Lru {
    max_bytes: i64,
    nbytes: i64,
    order: List<Record>,
    index: HashMap<String, *mut ListEntry<Record>>,
    on_evicted: Option<OnEvicted>,
}

// SAFETY: the raw pointers in `index` only ever alias nodes owned by
// `order`, and `Lru` requires `&mut self` for any access to either.
unsafe impl Send for Lru {}

impl Lru {
    /// Creates a cache with the given byte budget. `max_bytes == 0` is a
    /// valid but degenerate budget: every `Add` will be rejected as
    /// oversized, matching the "no admission yet" sentinel described for the
    /// lazily-constructed concurrent wrapper.
    pub fn new(max_bytes: i64) -> Self {
        Lru {
            max_bytes,
            nbytes: 0,
            order: List::new(),
            index: HashMap::new(),
            on_evicted: None,
        }
    }

    /// Installs a callback fired with `(key, value)` each time an entry is
    /// evicted.
    pub fn set_on_evicted(&mut self, f: OnEvicted) {
        self.on_evicted = Some(f);
    }

    /// Current count of live entries.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Total bytes of `len(key) + value.len()` across all live entries.
    pub fn nbytes(&self) -> i64 {
        self.nbytes
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, key: &str) -> Option<ByteView> {
        let node = *self.index.get(key)?;
        // SAFETY: node is tracked in `index` and therefore still live in `order`.
        unsafe { self.order.move_to_front(node) };
        // SAFETY: non-sentinel node, value initialized by push_front.
        let record = unsafe { (*node).get_value() };
        Some(record.value.clone())
    }

    /// Inserts or overwrites `key`. Oversized single entries are refused
    /// without evicting anything else; the rejection is only logged, never
    /// surfaced as an error, matching the source's admission contract.
    pub fn add(&mut self, key: impl Into<String>, value: ByteView) {
        let key = key.into();
        let entry_weight = key.len() + value.len();
        if entry_weight as i64 > self.max_bytes {
            warn!(
                key = %key,
                entry_bytes = entry_weight,
                max_bytes = self.max_bytes,
                "refusing oversized cache entry"
            );
            return;
        }

        if let Some(&node) = self.index.get(&key) {
            // SAFETY: node is tracked in `index` and therefore still live in `order`.
            let record = unsafe { (*node).get_value_mut() };
            let delta = value.len() as i64 - record.value.len() as i64;
            record.value = value;
            self.nbytes += delta;
            unsafe { self.order.move_to_front(node) };
            self.evict_to_fit();
            return;
        }

        let delta = entry_weight as i64;
        self.evict_to_fit_for(delta);
        let node = self.order.push_front(Record {
            key: key.clone(),
            value,
        });
        self.index.insert(key, node);
        self.nbytes += delta;
    }

    /// Removes `key`, returning its value if present.
    pub fn del(&mut self, key: &str) -> Option<ByteView> {
        let node = self.index.remove(key)?;
        // SAFETY: node was tracked in `index` and therefore still live in `order`.
        let record = unsafe { self.order.remove(node) };
        self.nbytes -= record.weight() as i64;
        Some(record.value)
    }

    /// Evicts the single least-recently-used entry, if any, invoking the
    /// eviction callback when one is installed.
    pub fn remove_oldest(&mut self) {
        let Some(record) = self.order.pop_back() else {
            return;
        };
        self.index.remove(&record.key);
        self.nbytes -= record.weight() as i64;
        if let Some(cb) = self.on_evicted.as_mut() {
            cb(&record.key, &record.value);
        }
    }

    /// Evicts from the tail until admitting `extra` more bytes would no
    /// longer exceed `max_bytes`.
    fn evict_to_fit_for(&mut self, extra: i64) {
        while self.max_bytes > 0 && self.nbytes + extra > self.max_bytes && !self.is_empty() {
            self.remove_oldest();
        }
    }

    /// Evicts from the tail until the cache's current size fits the budget.
    fn evict_to_fit(&mut self) {
        self.evict_to_fit_for(0);
    }
}

impl std::fmt::Debug for Lru {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lru")
            .field("max_bytes", &self.max_bytes)
            .field("nbytes", &self.nbytes)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn bv(s: &str) -> ByteView {
        ByteView::from(s)
    }

    /// Scenario 1 from the cache's testable-properties scenario list:
    /// eviction order under a tight byte budget.
    #[test]
    fn lru_eviction_order() {
        let max_bytes = "key1".len() + "key2".len() + "value1".len() + "value2".len();
        let mut cache = Lru::new(max_bytes as i64);

        cache.add("key1", bv("value1"));
        cache.add("key2", bv("value2"));
        cache.add("k3", bv("value3"));

        assert!(cache.get("key1").is_none());
        assert_eq!(cache.get("key2").unwrap().as_bytes(), b"value2");
        assert_eq!(cache.get("k3").unwrap().as_bytes(), b"value3");
        assert_eq!(cache.nbytes(), 14);
    }

    /// Scenario 2: overwriting a key with a shorter value shrinks `nbytes`
    /// and keeps the entry count at one.
    #[test]
    fn overwrite_shrinks_nbytes() {
        let mut cache = Lru::new(100);
        cache.add("key1", bv("123213"));
        cache.add("key1", bv("ywh"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("key1").unwrap().as_bytes(), b"ywh");
    }

    /// LRU recency law: `Add(a); Add(b); Get(a); Add(c)` with a budget that
    /// forces exactly one eviction evicts `b`, not `a`.
    #[test]
    fn recency_is_preserved_by_get() {
        let mut cache = Lru::new(("a".len() + "1".len() + "b".len() + "1".len()) as i64);
        cache.add("a", bv("1"));
        cache.add("b", bv("1"));
        cache.get("a");
        cache.add("c", bv("1"));

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn oversized_entry_is_rejected_without_eviction() {
        let mut cache = Lru::new(4);
        cache.add("key1", bv("value1"));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.nbytes(), 0);
    }

    #[test]
    fn remove_oldest_invokes_eviction_callback() {
        let evicted = Arc::new(AtomicUsize::new(0));
        let evicted_clone = evicted.clone();
        let mut cache = Lru::new(100);
        cache.set_on_evicted(Box::new(move |_, _| {
            evicted_clone.fetch_add(1, Ordering::SeqCst);
        }));

        cache.add("key1", bv("value1"));
        cache.remove_oldest();
        assert_eq!(evicted.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn del_removes_entry_and_adjusts_nbytes() {
        let mut cache = Lru::new(100);
        cache.add("key1", bv("value1"));
        let removed = cache.del("key1").unwrap();
        assert_eq!(removed.as_bytes(), b"value1");
        assert_eq!(cache.nbytes(), 0);
        assert!(cache.get("key1").is_none());
    }
}
