//! The collaborator-facing interface the transport layer implements and the
//! core consumes. The core never does its own I/O, never owns a socket, and
//! never knows how a write is actually scheduled onto an event loop — it
//! only calls through this trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::buffer::RefCountedBuffer;
use crate::message::RtmpMessage;
use crate::session::Session;

/// An opaque capability identifying one peer connection.
///
/// `Eq + Hash` lets the [`Registry`](crate::registry::Registry) use handles
/// as map keys / set members without needing to know anything else about the
/// concrete connection type. `Clone` handles are expected to be cheap
/// (an `Arc` or an index into a slab), never a deep copy of connection
/// state.
#[async_trait]
pub trait ConnectionHandle: Clone + Eq + std::hash::Hash + Send + Sync + 'static {
    type Buffer: RefCountedBuffer;

    /// The session object attached to this connection. Created on first
    /// inbound message (or lazily inside `connect`); the core never
    /// constructs this itself — see [`Session::new`].
    fn session(&self) -> &Arc<Session<Self::Buffer>>;

    /// Enqueues a message for output without waiting for it to be flushed.
    /// Used for steady-state fan-out writes, where backpressure is the
    /// transport's concern. Takes the message by value: the refcount handle
    /// fan-out retained for this subscriber is the implementation's to
    /// release once it is done with the bytes.
    async fn write(&self, message: RtmpMessage<Self::Buffer>) -> Result<(), WriteError>;

    /// Enqueues a message and waits for the underlying transport to report
    /// the write (and any buffered predecessors) flushed. Used wherever the
    /// caller needs to observe success/failure before taking the next step
    /// (the `connect` control triad, the `play`/`pause` key-frame replay).
    /// Same buffer-ownership contract as [`write`](Self::write).
    async fn write_and_flush(&self, message: RtmpMessage<Self::Buffer>) -> Result<(), WriteError>;

    /// Tears down the connection. Idempotent.
    fn close(&self);
}

/// Surfaced when a transport-level write fails. The core does not interpret
/// the cause; it only needs to know whether the write landed, so it can
/// decide whether to close the connection it came from.
#[derive(Debug, thiserror::Error)]
#[error("write failed: {reason}")]
pub struct WriteError {
    pub reason: String,
}

impl WriteError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}
