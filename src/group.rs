//! Namespaced orchestrator composing the LRU, ring, single-flight and peer
//! client into the three-branch fetch pipeline: local hit, peer fetch,
//! loader fallback.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::{info, warn};

use crate::byte_view::ByteView;
use crate::concurrent::ConcurrentCache;
use crate::error::{CacheError, Result};
use crate::pool::PeerPool;
use crate::singleflight;

/// A single-method capability that materializes a value for `key` on a
/// cache miss. Exposed both as a trait (for object-style loaders) and via a
/// blanket impl over `Fn` (for bare function/closure loaders), so callers
/// can supply whichever form fits.
pub trait Loader: Send + Sync {
    /// Fetches the bytes for `key` from the slow source.
    fn load(&self, key: &str) -> Result<Vec<u8>>;
}

impl<F> Loader for F
where
    F: Fn(&str) -> Result<Vec<u8>> + Send + Sync,
{
    fn load(&self, key: &str) -> Result<Vec<u8>> {
        self(key)
    }
}

/// A named cache namespace with its own byte budget, loader, and optional
/// peer pool.
pub struct Group {
    name: String,
    loader: Arc<dyn Loader>,
    main_cache: ConcurrentCache,
    peers: RwLock<Option<Arc<PeerPool>>>,
    single_loader: singleflight::Group,
}

impl Group {
    fn new(name: impl Into<String>, max_bytes: i64, loader: Arc<dyn Loader>) -> Self {
        Group {
            name: name.into(),
            loader,
            main_cache: ConcurrentCache::new(max_bytes),
            peers: RwLock::new(None),
            single_loader: singleflight::Group::new(),
        }
    }

    /// The group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetches `key`: a local cache hit returns immediately; a miss enters
    /// the single-flight-coalesced load path.
    pub fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }

        if let Some(view) = self.main_cache.get(key) {
            return Ok(view);
        }

        self.load(key)
    }

    /// Coalesced load path: ask the ring for the owning peer (if any peer
    /// pool is registered); fall back to the local loader on a peer miss or
    /// peer error.
    fn load(&self, key: &str) -> Result<ByteView> {
        let bytes = self.single_loader.do_once(key, || {
            if let Some(pool) = self.peers.read().unwrap().clone() {
                if let Some(client) = pool.pick_peer(key) {
                    match self.get_from_peer(client.as_ref(), key) {
                        Ok(bytes) => return Ok(bytes),
                        Err(err) => {
                            warn!(key = %key, error = %err, "peer fetch failed, falling back to local loader");
                        }
                    }
                }
            }
            self.get_locally(key)
        })?;

        Ok(ByteView::new(bytes))
    }

    fn get_locally(&self, key: &str) -> Result<Vec<u8>> {
        let bytes = self.loader.load(key)?;
        self.main_cache.add(key, ByteView::new(bytes.clone()));
        Ok(bytes)
    }

    fn get_from_peer(
        &self,
        client: &dyn crate::peer::PeerClient,
        key: &str,
    ) -> Result<Vec<u8>> {
        // The result is deliberately not inserted into `main_cache`:
        // ownership under the ring belongs to the peer, mirroring is out of
        // scope.
        client.get(&self.name, key)
    }

    /// Registers this group's peer pool. One-shot; a second call is a
    /// programming error and panics, matching the original's
    /// `panic("RegisterPeerPicker called more than once")`.
    pub fn register_peers(&self, pool: Arc<PeerPool>) {
        let mut guard = self.peers.write().unwrap();
        if guard.is_some() {
            panic!("Group::register_peers called more than once for group {:?}", self.name);
        }
        *guard = Some(pool);
        info!(group = %self.name, "registered peer pool");
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group").field("name", &self.name).finish()
    }
}

fn registry() -> &'static RwLock<HashMap<String, Arc<Group>>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Arc<Group>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Creates and registers a new group under `name` with the given byte
/// budget and loader. Idempotent re-registration under the same name
/// returns the existing group rather than rejecting, the behavior
/// `spec.md` leaves to implementations to choose.
pub fn new_group(name: impl Into<String>, max_bytes: i64, loader: impl Loader + 'static) -> Arc<Group> {
    let name = name.into();
    let mut guard = registry().write().unwrap();
    if let Some(existing) = guard.get(&name) {
        return existing.clone();
    }
    let group = Arc::new(Group::new(name.clone(), max_bytes, Arc::new(loader)));
    guard.insert(name, group.clone());
    group
}

/// Looks up a previously-created group by name.
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    registry().read().unwrap().get(name).cloned()
}

/// Creates and registers a new group from a [`crate::config::GroupConfig`].
pub fn new_group_with_config(
    name: impl Into<String>,
    config: crate::config::GroupConfig,
    loader: impl Loader + 'static,
) -> Arc<Group> {
    new_group(name, config.max_bytes, loader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn db() -> StdHashMap<&'static str, &'static str> {
        let mut m = StdHashMap::new();
        m.insert("Tom", "630");
        m.insert("Jack", "888");
        m.insert("Mike", "321");
        m
    }

    /// Scenario 4: each key's loader is invoked exactly once across two
    /// `Get`s.
    #[test]
    fn cache_hit_count() {
        let data = db();
        let counts: Arc<Mutex<StdHashMap<String, usize>>> = Arc::new(Mutex::new(StdHashMap::new()));
        let counts_clone = counts.clone();

        let group = new_group(
            format!("scenario4-{:p}", &data as *const _),
            2048,
            move |key: &str| {
                *counts_clone.lock().unwrap().entry(key.to_string()).or_insert(0) += 1;
                data.get(key)
                    .map(|v| v.as_bytes().to_vec())
                    .ok_or_else(|| CacheError::loader_msg(format!("{key} not exist")))
            },
        );

        for key in ["Tom", "Jack", "Mike"] {
            group.get(key).unwrap();
            group.get(key).unwrap();
        }

        let counts = counts.lock().unwrap();
        for key in ["Tom", "Jack", "Mike"] {
            assert_eq!(counts[key], 1);
        }
    }

    /// Scenario 5: an unknown key propagates the loader's error unchanged.
    #[test]
    fn unknown_key_propagates_loader_error() {
        let group = new_group("scenario5", 2048, |key: &str| {
            Err(CacheError::loader_msg(format!("{key} not exist")))
        });

        let err = group.get("unknown").unwrap_err();
        assert!(matches!(err, CacheError::Loader(_)));
    }

    #[test]
    fn empty_key_is_rejected() {
        let group = new_group("scenario-empty", 2048, |_: &str| Ok(b"x".to_vec()));
        assert!(matches!(group.get("").unwrap_err(), CacheError::EmptyKey));
    }

    #[test]
    fn loader_failure_does_not_populate_the_cache() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        let group = new_group("scenario-negative-cache", 2048, move |_: &str| {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::loader_msg("boom"))
        });

        assert!(group.get("k").is_err());
        assert!(group.get("k").is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
