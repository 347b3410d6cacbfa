//! Error types covering every error kind the fetch pipeline can surface.

use std::fmt;

/// Errors surfaced to callers of [`crate::group::Group`] and the peer
/// pool's inbound router.
///
/// `OversizedEntry` and `DoubleRegister` are deliberately not variants here:
/// the former is logged and silently dropped by the LRU, the latter is a
/// fatal misuse the registration path panics on, matching the original's
/// `panic("RegisterPeerPicker called more than once")`.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// Caller supplied an empty key to `Group::get`.
    #[error("key is empty")]
    EmptyKey,

    /// The user-supplied loader returned an error; propagated unchanged.
    #[error("loader error: {0}")]
    Loader(Box<dyn std::error::Error + Send + Sync>),

    /// A remote peer was unreachable or returned a non-success status.
    /// Never returned from `Group::get` directly — callers fall back to the
    /// local loader on this error, so it only appears in logs and in
    /// `PeerClient` implementations' own `Result`s.
    #[error("peer transport error: {0}")]
    PeerTransport(String),

    /// Inbound request path did not parse as `<basePath>/<group>/<key>`.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Inbound request named a group that has never been registered.
    #[error("unknown group: {0}")]
    UnknownGroup(String),
}

impl CacheError {
    /// Wraps an arbitrary loader error.
    pub fn loader(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        CacheError::Loader(Box::new(err))
    }

    /// Wraps a loader failure that is only available as a message.
    pub fn loader_msg(msg: impl Into<String>) -> Self {
        CacheError::Loader(Box::new(SimpleError(msg.into())))
    }
}

#[derive(Debug)]
struct SimpleError(String);

impl fmt::Display for SimpleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SimpleError {}

/// Convenience alias for `Result<T, CacheError>`.
pub type Result<T> = std::result::Result<T, CacheError>;
