//! The abstract refcounted buffer capability the core consumes.
//!
//! The byte buffer pool and its reference counting live outside this crate,
//! owned by the host application. [`RefCountedBuffer`] is the seam: the
//! fan-out engine only ever calls `retain`/`release`/`duplicate`/`as_bytes`,
//! never assumes anything about how a concrete implementation allocates or
//! reuses memory.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;

/// A payload buffer whose lifetime is managed by reference count rather than
/// by Rust's ownership alone, because a single inbound frame fans out to N
/// subscriber writes that each need an independent handle to the same bytes.
pub trait RefCountedBuffer: Clone + Send + Sync + From<Vec<u8>> + 'static {
    /// Returns a new handle to the same underlying bytes, incrementing the
    /// refcount. Cheap: never copies the payload.
    fn retain(&self) -> Self;

    /// Drops this handle, decrementing the refcount. Consuming by value
    /// mirrors the explicit `release()` the collaborator interface expects;
    /// most implementations can just rely on `Drop` for this, but exposing
    /// it explicitly lets callers (and tests) observe refcount conservation
    /// without waiting on a `Drop` to run.
    fn release(self) {
        drop(self);
    }

    /// Returns an independent copy of the payload: mutating or dropping one
    /// side never affects the other, and dropping the original's last handle
    /// does not need to happen for the copy to stay valid.
    fn duplicate(&self) -> Self;

    /// Borrows the payload bytes.
    fn as_bytes(&self) -> &[u8];
}

/// A minimal reference implementation of [`RefCountedBuffer`] for hosts and
/// tests that don't have their own pooled buffer type. Wraps [`bytes::Bytes`]
/// (itself `Arc`-backed) with an explicit counter so refcount-conservation
/// tests can assert on it directly rather than reaching into `Bytes`'
/// private internals.
#[derive(Clone, Debug)]
pub struct PooledBytes {
    bytes: Bytes,
    refs: Arc<AtomicUsize>,
}

impl PooledBytes {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            refs: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// The current refcount. Only meaningful for tests: production code
    /// should never branch on this.
    pub fn ref_count(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }
}

impl From<Vec<u8>> for PooledBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl RefCountedBuffer for PooledBytes {
    fn retain(&self) -> Self {
        self.refs.fetch_add(1, Ordering::SeqCst);
        Self {
            bytes: self.bytes.clone(),
            refs: self.refs.clone(),
        }
    }

    fn release(self) {
        self.refs.fetch_sub(1, Ordering::SeqCst);
    }

    fn duplicate(&self) -> Self {
        Self::new(self.bytes.clone())
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retain_increments_and_release_decrements() {
        let buf = PooledBytes::new(&b"hello"[..]);
        assert_eq!(buf.ref_count(), 1);

        let retained = buf.retain();
        assert_eq!(buf.ref_count(), 2);

        retained.release();
        assert_eq!(buf.ref_count(), 1);
    }

    #[test]
    fn duplicate_is_independent() {
        let buf = PooledBytes::new(&b"hello"[..]);
        let dup = buf.duplicate();

        assert_eq!(dup.ref_count(), 1);
        assert_eq!(buf.ref_count(), 1);
        assert_eq!(dup.as_bytes(), buf.as_bytes());
    }
}
