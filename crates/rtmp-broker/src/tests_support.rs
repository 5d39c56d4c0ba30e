//! An in-memory [`ConnectionHandle`] test double, standing in for the
//! transport layer in unit and scenario tests. Records every message written
//! to it (in order) so assertions can inspect exactly what went out on the
//! wire, the way `scuffle-rtmp`'s protocol-control-message tests round-trip
//! encoder output back through a `ChunkDecoder` — generalized here to the
//! message level since chunk framing is out of this crate's scope.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::buffer::{PooledBytes, RefCountedBuffer};
use crate::connection::{ConnectionHandle, WriteError};
use crate::message::{RtmpMessage, RtmpMessageType};
use crate::session::Session;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A recorded write, captured as plain bytes rather than a live
/// [`RtmpMessage`]: `write` releases the message's refcount share as soon as
/// it has copied out what assertions need, the way a real transport releases
/// its handle once the payload is flushed onto the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenMessage {
    pub message_type: RtmpMessageType,
    pub timestamp: u32,
    pub stream_id: u32,
    pub bytes: Vec<u8>,
}

struct Inner {
    id: u64,
    session: Arc<Session<PooledBytes>>,
    written: Mutex<Vec<WrittenMessage>>,
    closed: AtomicBool,
}

#[derive(Clone)]
pub struct TestConnection {
    inner: Arc<Inner>,
}

impl TestConnection {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                session: Arc::new(Session::new()),
                written: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Every message written so far, in order.
    pub fn written(&self) -> Vec<WrittenMessage> {
        self.inner.written.lock().expect("written mutex poisoned").clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Default for TestConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for TestConnection {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for TestConnection {}

impl Hash for TestConnection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl std::fmt::Debug for TestConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestConnection").field("id", &self.inner.id).finish()
    }
}

#[async_trait]
impl ConnectionHandle for TestConnection {
    type Buffer = PooledBytes;

    fn session(&self) -> &Arc<Session<Self::Buffer>> {
        &self.inner.session
    }

    async fn write(&self, message: RtmpMessage<Self::Buffer>) -> Result<(), WriteError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(WriteError::new("connection closed"));
        }
        let record = WrittenMessage {
            message_type: message.message_type,
            timestamp: message.timestamp,
            stream_id: message.stream_id,
            bytes: message.payload.as_bytes().to_vec(),
        };
        // Simulates a transport that has finished with the buffer once the
        // write is recorded: releases this handle's refcount share.
        message.payload.release();
        self.inner.written.lock().expect("written mutex poisoned").push(record);
        Ok(())
    }

    async fn write_and_flush(&self, message: RtmpMessage<Self::Buffer>) -> Result<(), WriteError> {
        self.write(message).await
    }

    fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }
}
