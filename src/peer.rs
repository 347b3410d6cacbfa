//! Outbound peer RPC: fetches `(group, key)` from a remote node over HTTP.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::debug;

use crate::error::CacheError;

/// Percent-encodes the same set of characters as form-style URL escaping
/// (the ecosystem equivalent of the original source's `url.QueryEscape`
/// applied to each path segment).
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn escape(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// A capability for fetching `(group, key)` from one specific remote peer.
///
/// Kept as a trait so [`crate::group::Group`] and [`crate::pool::PeerPool`]
/// depend on an interface rather than a concrete transport; this is also
/// what lets tests substitute an in-process fake instead of real HTTP.
pub trait PeerClient: Send + Sync {
    /// Fetches `key` from `group` on this peer. Any transport failure or
    /// non-success response is reported as [`CacheError::PeerTransport`];
    /// the response body must not be consumed by the caller on error.
    fn get(&self, group: &str, key: &str) -> Result<Vec<u8>, CacheError>;
}

/// A [`PeerClient`] backed by a blocking HTTP GET against another node's
/// peer pool router.
pub struct HttpPeerClient {
    base_url: String,
    base_path: String,
    client: reqwest::blocking::Client,
}

impl HttpPeerClient {
    /// Builds a client addressing `base_url` (e.g. `http://10.0.0.2:8001`)
    /// under `base_path` (e.g. `/_geecache/`), with a bounded per-request
    /// timeout — an extension beyond the original's un-timed `http.Get`,
    /// permitted as the peer client "may carry a deadline".
    pub fn new(base_url: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self::with_timeout(base_url, base_path, Duration::from_secs(10))
    }

    /// Same as [`HttpPeerClient::new`] with an explicit request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        base_path: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        HttpPeerClient {
            base_url: base_url.into(),
            base_path: base_path.into(),
            client: reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client configuration is valid"),
        }
    }
}

impl PeerClient for HttpPeerClient {
    fn get(&self, group: &str, key: &str) -> Result<Vec<u8>, CacheError> {
        let url = format!(
            "{}{}{}/{}",
            self.base_url,
            self.base_path,
            escape(group),
            escape(key)
        );
        debug!(url = %url, "fetching from peer");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| CacheError::PeerTransport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CacheError::PeerTransport(format!(
                "peer returned status {}",
                response.status()
            )));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| CacheError::PeerTransport(e.to_string()))
    }
}

impl std::fmt::Debug for HttpPeerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPeerClient")
            .field("base_url", &self.base_url)
            .field("base_path", &self.base_path)
            .finish()
    }
}
