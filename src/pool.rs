//! Registers peers, owns the consistent-hash ring and peer clients, and
//! serves inbound peer requests over HTTP.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use tracing::info;

use crate::error::CacheError;
use crate::group::get_group;
use crate::hash_ring::Ring;
use crate::peer::{HttpPeerClient, PeerClient};

/// Default cache base path, matching the original source's
/// `/_geecache/`.
pub const DEFAULT_BASE_PATH: &str = "/_geecache/";

/// Default number of virtual replicas per peer on the ring.
pub const DEFAULT_REPLICAS: usize = 50;

struct PoolState {
    ring: Ring,
    clients: HashMap<String, Arc<dyn PeerClient>>,
}

/// Owns this node's view of the fleet: the consistent-hash ring and one
/// peer client per address. `self_address` identifies which ring owner
/// means "serve locally" rather than forwarding.
pub struct PeerPool {
    self_address: String,
    base_path: String,
    state: Mutex<PoolState>,
}

impl PeerPool {
    /// Constructs a pool for `self_address` with the default base path and
    /// a ring using the default replica count and hash function.
    pub fn new(self_address: impl Into<String>) -> Self {
        Self::with_options(self_address, DEFAULT_BASE_PATH, DEFAULT_REPLICAS)
    }

    /// Constructs a pool with an explicit base path and replica count.
    pub fn with_options(
        self_address: impl Into<String>,
        base_path: impl Into<String>,
        replicas: usize,
    ) -> Self {
        PeerPool {
            self_address: self_address.into(),
            base_path: base_path.into(),
            state: Mutex::new(PoolState {
                ring: Ring::new(replicas),
                clients: HashMap::new(),
            }),
        }
    }

    /// Constructs a pool from a [`crate::config::PoolConfig`].
    pub fn from_config(config: crate::config::PoolConfig) -> Self {
        Self::with_options(config.self_address, config.base_path, config.ring.replicas)
    }

    /// Logs an event tagged with this pool's own address, mirroring the
    /// original's `HTTPPool.Log` convenience method.
    fn log(&self, message: &str) {
        info!(server = %self.self_address, "{message}");
    }

    /// Rebuilds the ring with `addresses` and creates (or overwrites) a peer
    /// client for each one.
    pub fn set(&self, addresses: impl IntoIterator<Item = impl Into<String>>) {
        let addresses: Vec<String> = addresses.into_iter().map(Into::into).collect();
        let mut state = self.state.lock();
        state.ring.add(addresses.iter().cloned());
        for addr in &addresses {
            let client = HttpPeerClient::new(addr.clone(), self.base_path.clone());
            state.clients.insert(addr.clone(), Arc::new(client));
        }
        drop(state);
        self.log(&format!("peer set updated: {addresses:?}"));
    }

    /// Picks the peer owning `key`. Returns `None` (meaning "serve
    /// locally") when the ring is empty or routes `key` back to this node.
    pub fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerClient>> {
        let state = self.state.lock();
        let owner = state.ring.get(key)?;
        if owner == self.self_address {
            return None;
        }
        let client = state.clients.get(owner)?.clone();
        Some(client)
    }

    /// Builds the inbound `axum::Router` serving `GET {basePath}<group>/<key>`
    /// for this pool, backed by the process-wide group registry.
    ///
    /// The route captures everything after `base_path` as a single wildcard
    /// rather than two typed segments, so the handler — not axum's router —
    /// decides what "wrong number of segments" means: a fixed `:a/:b` pattern
    /// would 404 a malformed path before the handler ever ran, misreporting
    /// it as an unknown group instead of the `400` the wire protocol promises.
    pub fn router(self: Arc<Self>) -> Router {
        let route = format!("{}*rest", self.base_path);
        Router::new().route(&route, get(handle_peer_request)).with_state(self)
    }
}

/// Splits the raw (not-yet-decoded) request path's suffix after `base_path`
/// into exactly two percent-decoded segments, or a [`CacheError::MalformedRequest`]
/// describing why it couldn't.
fn parse_group_and_key(base_path: &str, raw_path: &str) -> Result<(String, String), CacheError> {
    let malformed = || CacheError::MalformedRequest(raw_path.to_string());
    let rest = raw_path.strip_prefix(base_path).ok_or_else(malformed)?;
    let mut segments = rest.split('/');
    let group = segments.next().ok_or_else(malformed)?;
    let key = segments.next().ok_or_else(malformed)?;
    if group.is_empty() || key.is_empty() || segments.next().is_some() {
        return Err(malformed());
    }
    let decode = |s: &str| percent_decode_str(s).decode_utf8().ok().map(|c| c.into_owned());
    let group = decode(group).ok_or_else(malformed)?;
    let key = decode(key).ok_or_else(malformed)?;
    Ok((group, key))
}

impl std::fmt::Debug for PeerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerPool")
            .field("self_address", &self.self_address)
            .field("base_path", &self.base_path)
            .finish()
    }
}

async fn handle_peer_request(State(pool): State<Arc<PeerPool>>, uri: Uri) -> Response {
    let (group, key) = match parse_group_and_key(&pool.base_path, uri.path()) {
        Ok(parsed) => parsed,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };

    let pool_addr = pool.self_address.clone();
    let result = tokio::task::spawn_blocking(move || {
        get_group(&group).ok_or_else(|| CacheError::UnknownGroup(group.clone())).map(|g| g.get(&key))
    })
    .await;

    match result {
        Ok(Ok(Ok(view))) => (
            StatusCode::OK,
            [("content-type", "application/octet-stream")],
            view.to_vec(),
        )
            .into_response(),
        Ok(Ok(Err(err))) => {
            info!(server = %pool_addr, error = %err, "group fetch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
        Ok(Err(err)) => (StatusCode::NOT_FOUND, err.to_string()).into_response(),
        Err(join_err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("internal error: {join_err}"),
        )
            .into_response(),
    }
}
