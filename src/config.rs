//! Typed configuration for the ring, the peer pool, and per-group byte
//! budgets.
//!
//! Plain structs rather than a file-based config loader: the system this
//! crate implements has no config file either, flags only, and there are
//! exactly four scalar knobs — not enough to justify a config-crate layer.

use crate::pool::{DEFAULT_BASE_PATH, DEFAULT_REPLICAS};

/// Configuration for a [`crate::hash_ring::Ring`].
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Number of virtual nodes per peer.
    pub replicas: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        RingConfig {
            replicas: DEFAULT_REPLICAS,
        }
    }
}

/// Configuration for a [`crate::pool::PeerPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// This node's own address, as it should appear in the peer list.
    pub self_address: String,
    /// URL path prefix under which inbound peer requests are served.
    pub base_path: String,
    /// Ring configuration shared by this pool.
    pub ring: RingConfig,
}

impl PoolConfig {
    /// Builds a config for `self_address` with default base path and
    /// replica count.
    pub fn new(self_address: impl Into<String>) -> Self {
        PoolConfig {
            self_address: self_address.into(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            ring: RingConfig::default(),
        }
    }

    /// Overrides the base path.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Overrides the ring's replica count.
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.ring.replicas = replicas;
        self
    }
}

/// Per-group byte budget for the underlying LRU.
#[derive(Debug, Clone, Copy)]
pub struct GroupConfig {
    /// Maximum total bytes of `len(key) + value.len()` the group's cache
    /// will hold before evicting.
    pub max_bytes: i64,
}

impl GroupConfig {
    /// Builds a config with the given byte budget.
    pub fn new(max_bytes: i64) -> Self {
        GroupConfig { max_bytes }
    }
}
