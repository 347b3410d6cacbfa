#![doc = include_str!("../README.md")]
#![warn(missing_debug_implementations)]

/// Immutable, cheaply cloneable byte blob returned from cache lookups.
///
/// Wraps an `Arc<[u8]>` so a value fetched once can be handed to many
/// callers, peers, and cache slots without copying until export.
pub mod byte_view;

/// Mutex-guarded, lazily constructed single-node cache.
///
/// Sits directly on top of [`lru`], adding the thread-safety the bare LRU
/// does not provide and deferring allocation of the underlying cache until
/// the first entry is added.
pub mod concurrent;

/// Typed configuration for the ring, the peer pool, and per-group byte
/// budgets.
///
/// Plain structs with `Default` impls matching this crate's documented
/// defaults, not a file-based config loader.
pub mod config;

/// The error enum returned from fallible cache and peer operations.
pub mod error;

/// Per-name cache orchestration: local hit, peer fetch, or loader fallback.
///
/// Owns the process-wide group registry and the single-flight coalescing
/// that keeps concurrent misses for the same key from invoking the loader
/// more than once.
pub mod group;

/// Consistent-hash ring with virtual replicas for peer selection.
pub mod hash_ring;

/// Byte-accounted least-recently-used cache with strict tail eviction.
pub mod lru;

/// Outbound HTTP client for fetching a key from a remote peer.
pub mod peer;

/// Owns the consistent-hash ring and peer clients, and serves inbound peer
/// requests over HTTP.
pub mod pool;

/// Request coalescer that collapses concurrent fetches of the same key into
/// a single producer invocation.
pub mod singleflight;

mod list;

pub use byte_view::ByteView;
pub use error::{CacheError, Result};
pub use group::{get_group, new_group, Group, Loader};
pub use pool::PeerPool;
