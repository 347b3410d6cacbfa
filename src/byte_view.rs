//! Immutable, copy-on-export byte blobs.
//!
//! Every value handed back across the public API — from a cache hit, a
//! loader invocation, or a peer RPC — is wrapped in a [`ByteView`] so callers
//! can never observe (or corrupt) the bytes actually held by the cache.

use std::sync::Arc;

/// An immutable view over a byte sequence.
///
/// Cloning a `ByteView` is cheap (an `Arc` bump); exporting its contents via
/// [`ByteView::to_vec`] always allocates a fresh, independent copy so that
/// mutating the result can never reach back into the cache's storage.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ByteView(Arc<[u8]>);

impl ByteView {
    /// Wraps `bytes` in an immutable view.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    /// Number of bytes held by this view.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the view holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an independent copy of the underlying bytes.
    ///
    /// Mutating the returned `Vec` never affects subsequent calls to this
    /// method, nor the entry still held by the cache.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Borrows the view's bytes without copying.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decodes the view as UTF-8, replacing invalid sequences.
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&str> for ByteView {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl From<String> for ByteView {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_vec_is_an_independent_copy() {
        let view = ByteView::new(b"hello".to_vec());
        let mut first = view.to_vec();
        first[0] = b'H';

        let second = view.to_vec();
        assert_eq!(second, b"hello");
        assert_eq!(first, b"Hello");
    }

    #[test]
    fn len_and_is_empty() {
        assert_eq!(ByteView::new(Vec::new()).len(), 0);
        assert!(ByteView::new(Vec::new()).is_empty());
        assert_eq!(ByteView::from("abc").len(), 3);
    }

    #[test]
    fn string_form_round_trips() {
        let view = ByteView::from("caf\u{e9}");
        assert_eq!(view.as_str_lossy(), "caf\u{e9}");
    }
}
