//! Consistent-hash ring with virtual replicas for peer selection.
//!
//! The pre-hash preimage for virtual node `i` of node `name` is
//! `format!("{i}{name}")` — this exact string is part of the routing
//! contract, not an implementation detail: two nodes that hash different
//! preimages will never agree on key ownership.

use std::collections::HashMap;

/// A hash function from an arbitrary byte string to a 32-bit ring position.
pub trait HashFn: Fn(&[u8]) -> u32 + Send + Sync {}
impl<F: Fn(&[u8]) -> u32 + Send + Sync> HashFn for F {}

/// CRC-32/IEEE, the default hash function (the ecosystem equivalent of the
/// original source's direct use of `hash/crc32.ChecksumIEEE`).
pub fn crc32_ieee(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Maps keys to peer names via hashed virtual nodes on a sorted ring.
pub struct Ring {
    hash_fn: Box<dyn Fn(&[u8]) -> u32 + Send + Sync>,
    replicas: usize,
    keys: Vec<u32>,
    hash_map: HashMap<u32, String>,
}

impl Ring {
    /// Creates a ring with `replicas` virtual nodes per peer and the default
    /// CRC-32/IEEE hash function.
    pub fn new(replicas: usize) -> Self {
        Self::with_hash_fn(replicas, crc32_ieee)
    }

    /// Creates a ring with a custom hash function, for deterministic tests
    /// (e.g. the decimal-parse hash used by the routing scenario).
    pub fn with_hash_fn(replicas: usize, hash_fn: impl Fn(&[u8]) -> u32 + Send + Sync + 'static) -> Self {
        Ring {
            hash_fn: Box::new(hash_fn),
            replicas,
            keys: Vec::new(),
            hash_map: HashMap::new(),
        }
    }

    /// Adds each name's `replicas` virtual nodes to the ring and re-sorts.
    /// Monotonic: may be called multiple times without rebuilding prior
    /// state. Hash collisions between virtual nodes silently overwrite the
    /// earlier mapping — an accepted, documented tradeoff, not a bug.
    pub fn add<S: AsRef<str>>(&mut self, names: impl IntoIterator<Item = S>) {
        for name in names {
            let name = name.as_ref();
            for i in 0..self.replicas {
                let preimage = format!("{i}{name}");
                let hash = (self.hash_fn)(preimage.as_bytes());
                if !self.hash_map.contains_key(&hash) {
                    self.keys.push(hash);
                }
                self.hash_map.insert(hash, name.to_string());
            }
        }
        self.keys.sort_unstable();
    }

    /// Returns the peer name owning `key`, or `None` if the ring is empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let hash = (self.hash_fn)(key.as_bytes());
        let idx = match self.keys.binary_search(&hash) {
            Ok(i) => i,
            Err(i) => i % self.keys.len(),
        };
        self.hash_map.get(&self.keys[idx]).map(String::as_str)
    }
}

impl std::fmt::Debug for Ring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ring")
            .field("replicas", &self.replicas)
            .field("virtual_nodes", &self.keys.len())
            .finish()
    }
}
