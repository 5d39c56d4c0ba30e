//! Per-connection session state and the publisher/subscriber readiness
//! handshake that lets a `play` on one connection wait for a `publish` on
//! another.

use std::sync::{Mutex, OnceLock};
use std::sync::atomic::{AtomicBool, Ordering};

use broker_amf0::Amf0Value;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::buffer::RefCountedBuffer;
use crate::message::RtmpMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    Publisher,
    Subscriber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Complete,
}

/// The resolved value of a publisher's one-shot readiness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Complete,
    Failed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session role already set to {existing:?}, cannot become {requested:?}")]
    RoleConflict { existing: SessionRole, requested: SessionRole },
}

/// A single-shot notification primitive: a state plus a list of pending
/// callbacks. `resolve` is idempotent — only the first call has any effect,
/// matching the invariant that a publisher reaches `complete` (or fails) at
/// most once. Waiters that arrive after resolution get the answer
/// synchronously rather than suspending.
#[derive(Default)]
struct Readiness {
    inner: Mutex<ReadinessInner>,
}

#[derive(Default)]
struct ReadinessInner {
    state: Option<ReadyState>,
    waiters: Vec<oneshot::Sender<ReadyState>>,
}

impl Readiness {
    fn resolve(&self, state: ReadyState) {
        let waiters = {
            let mut inner = self.inner.lock().expect("readiness mutex poisoned");
            if inner.state.is_some() {
                // Already resolved; a publisher reaches complete/failed at most once.
                return;
            }
            inner.state = Some(state);
            std::mem::take(&mut inner.waiters)
        };

        for waiter in waiters {
            // Receiver may have dropped (subscriber disconnected while awaiting);
            // dropping the payload instead of writing it is the correct response.
            let _ = waiter.send(state);
        }
    }

    async fn wait(&self) -> ReadyState {
        let rx = {
            let mut inner = self.inner.lock().expect("readiness mutex poisoned");
            if let Some(state) = inner.state {
                return state;
            }
            let (tx, rx) = oneshot::channel();
            inner.waiters.push(tx);
            rx
        };

        // If the sender side is dropped without sending (it never is, since
        // `resolve` always sends to every registered waiter before dropping
        // them) a disconnected channel is treated as the publisher failing.
        rx.await.unwrap_or(ReadyState::Failed)
    }
}

/// Per-connection RTMP session state.
///
/// Shared across tasks: a subscriber's `play` reads a *publisher's* session
/// (its cached key frame, its metadata, its readiness) from a different
/// connection's task. All the cross-connection-visible fields are therefore
/// behind atomics, `OnceLock`, or a short-lived `Mutex` rather than requiring
/// the caller to hold a lock across an `.await`.
pub struct Session<B: RefCountedBuffer> {
    role: OnceLock<SessionRole>,
    app: OnceLock<String>,
    stream_name: OnceLock<String>,
    stream_key: OnceLock<String>,
    paused: AtomicBool,
    key_frame: OnceLock<RtmpMessage<B>>,
    metadata: Mutex<Option<Amf0Value<'static>>>,
    readiness: Readiness,
}

impl<B: RefCountedBuffer> Default for Session<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: RefCountedBuffer> Session<B> {
    pub fn new() -> Self {
        Self {
            role: OnceLock::new(),
            app: OnceLock::new(),
            stream_name: OnceLock::new(),
            stream_key: OnceLock::new(),
            paused: AtomicBool::new(false),
            key_frame: OnceLock::new(),
            metadata: Mutex::new(None),
            readiness: Readiness::default(),
        }
    }

    pub fn role(&self) -> Option<SessionRole> {
        self.role.get().copied()
    }

    /// Transitions role away from `unassigned`. Idempotent if called again
    /// with the same role (a client can re-send `publish`/`play` for the
    /// same stream); conflicts if a session that already committed to one
    /// role tries to become the other.
    pub fn set_role(&self, role: SessionRole) -> Result<(), SessionError> {
        match self.role.set(role) {
            Ok(()) => Ok(()),
            Err(_) => {
                let existing = *self.role.get().expect("just failed to set, so it's occupied");
                if existing == role {
                    Ok(())
                } else {
                    Err(SessionError::RoleConflict { existing, requested: role })
                }
            }
        }
    }

    pub fn app(&self) -> Option<&str> {
        self.app.get().map(String::as_str)
    }

    /// Sets `app`, once. Later calls are no-ops (real clients only `connect`
    /// once per connection).
    pub fn set_app(&self, app: String) {
        let _ = self.app.set(app);
    }

    pub fn stream_name(&self) -> Option<&str> {
        self.stream_name.get().map(String::as_str)
    }

    pub fn set_stream_name(&self, name: String) {
        let _ = self.stream_name.set(name);
    }

    /// `"{app}/{streamName}"`, once both halves are known. Computed lazily
    /// and cached: the first call after both are set fixes the key for the
    /// remaining lifetime of the session — it never changes afterward.
    pub fn stream_key(&self) -> Option<&str> {
        if let Some(key) = self.stream_key.get() {
            return Some(key);
        }
        let app = self.app()?;
        let name = self.stream_name()?;
        Some(self.stream_key.get_or_init(|| format!("{app}/{name}")).as_str())
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub fn key_frame(&self) -> Option<&RtmpMessage<B>> {
        self.key_frame.get()
    }

    /// Caches `message` as the session's key frame if none is cached yet,
    /// and resolves readiness to `Complete`. Returns whether this call was
    /// the one that set it (false if a key frame was already cached).
    ///
    /// The caller deep-copies into the session (`message.copy()` at the call
    /// site in the data handler) so the cached frame outlives the inbound
    /// dispatch's borrowed/refcounted handle.
    pub fn try_cache_key_frame(&self, message: RtmpMessage<B>) -> bool {
        let set = self.key_frame.set(message).is_ok();
        if set {
            self.readiness.resolve(ReadyState::Complete);
        }
        set
    }

    pub fn state(&self) -> SessionState {
        if self.key_frame.get().is_some() {
            SessionState::Complete
        } else {
            SessionState::Initializing
        }
    }

    pub fn metadata(&self) -> Option<Amf0Value<'static>> {
        self.metadata.lock().expect("metadata mutex poisoned").clone()
    }

    pub fn set_metadata(&self, value: Amf0Value<'static>) {
        *self.metadata.lock().expect("metadata mutex poisoned") = Some(value);
    }

    /// Resolves this (publisher) session's readiness as failed. Used when a
    /// publisher's connection tears down before ever caching a key frame, so
    /// subscribers awaiting readiness observe the failure instead of hanging
    /// forever.
    pub fn fail_readiness(&self) {
        self.readiness.resolve(ReadyState::Failed);
    }

    /// Awaits this (publisher) session's readiness. Resolves immediately,
    /// without suspending, if readiness was already resolved before the call.
    pub async fn wait_ready(&self) -> ReadyState {
        self.readiness.wait().await
    }
}
