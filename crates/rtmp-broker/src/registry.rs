//! The process-wide stream-key -> publisher / subscriber-group directory.
//! Point operations take a short-lived lock; iteration snapshots the
//! subscriber group under the lock and releases it before any write happens,
//! so fan-out never holds the registry lock across an `.await`.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::connection::ConnectionHandle;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("stream key {0:?} already has a publisher")]
    StreamKeyInUse(String),
}

struct RegistryState<C> {
    publishers: HashMap<String, C>,
    subscribers: HashMap<String, Vec<C>>,
}

impl<C> Default for RegistryState<C> {
    fn default() -> Self {
        Self { publishers: HashMap::new(), subscribers: HashMap::new() }
    }
}

/// Process-wide directory mapping a stream key to exactly one publisher
/// connection and an ordered group of subscriber connections.
///
/// Holds no session lifetime: connection handles are cheap capabilities the
/// transport owns, so teardown is driven by the transport calling
/// [`Registry::on_connection_closed`], not by the registry detecting a drop.
pub struct Registry<C: ConnectionHandle> {
    state: Mutex<RegistryState<C>>,
}

impl<C: ConnectionHandle> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ConnectionHandle> Registry<C> {
    pub fn new() -> Self {
        Self { state: Mutex::new(RegistryState::default()) }
    }

    /// Registers `handle` as the publisher for `stream_key`. Fails if a
    /// publisher is already registered for that key; the caller must close
    /// the losing connection.
    pub fn register_publisher(&self, stream_key: &str, handle: C) -> Result<(), RegistryError> {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        if state.publishers.contains_key(stream_key) {
            return Err(RegistryError::StreamKeyInUse(stream_key.to_string()));
        }
        tracing::debug!(stream_key, "publisher registered");
        state.publishers.insert(stream_key.to_string(), handle);
        Ok(())
    }

    /// Removes the publisher entry for `stream_key`, but only if the stored
    /// handle is `handle` — a late teardown must not clobber a replaced
    /// entry.
    pub fn remove_publisher(&self, stream_key: &str, handle: &C) {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        if let std::collections::hash_map::Entry::Occupied(entry) = state.publishers.entry(stream_key.to_string()) {
            if entry.get() == handle {
                tracing::debug!(stream_key, "publisher removed");
                entry.remove();
            }
        }
    }

    pub fn lookup_publisher(&self, stream_key: &str) -> Option<C> {
        self.state.lock().expect("registry mutex poisoned").publishers.get(stream_key).cloned()
    }

    /// Idempotent: adding a handle already in the group is a no-op.
    pub fn add_subscriber(&self, stream_key: &str, handle: C) {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        let group = state.subscribers.entry(stream_key.to_string()).or_default();
        if !group.contains(&handle) {
            group.push(handle);
            tracing::debug!(stream_key, subscribers = group.len(), "subscriber added");
        }
    }

    /// Safe if `handle` is absent. Drops the group entirely once the last
    /// subscriber leaves, for test determinism rather than as a hard memory
    /// requirement.
    pub fn remove_subscriber(&self, stream_key: &str, handle: &C) {
        let mut state = self.state.lock().expect("registry mutex poisoned");
        if let std::collections::hash_map::Entry::Occupied(mut entry) = state.subscribers.entry(stream_key.to_string()) {
            entry.get_mut().retain(|h| h != handle);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }

    /// A snapshot of the subscriber group for `stream_key` as of the moment
    /// this call took the lock. Concurrent `add_subscriber`/`remove_subscriber`
    /// calls that happen after this returns are not observed by the caller —
    /// they'll be picked up by the next fan-out frame.
    pub fn subscribers_snapshot(&self, stream_key: &str) -> Vec<C> {
        self.state
            .lock()
            .expect("registry mutex poisoned")
            .subscribers
            .get(stream_key)
            .cloned()
            .unwrap_or_default()
    }

    /// Core-provided teardown hook: the transport calls this when a
    /// connection closes. Removes the
    /// connection's publisher entry (if it was the registered publisher for
    /// its stream key) and its subscriber-group membership (if any).
    /// Idempotent and safe for a connection that was never registered.
    pub fn on_connection_closed(&self, handle: &C) {
        let Some(stream_key) = handle.session().stream_key().map(str::to_string) else {
            return;
        };
        self.remove_publisher(&stream_key, handle);
        self.remove_subscriber(&stream_key, handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::TestConnection;

    #[test]
    fn register_publisher_rejects_duplicate() {
        let registry: Registry<TestConnection> = Registry::new();
        let a = TestConnection::new();
        let b = TestConnection::new();

        registry.register_publisher("live/cam1", a.clone()).unwrap();
        let err = registry.register_publisher("live/cam1", b).unwrap_err();
        assert!(matches!(err, RegistryError::StreamKeyInUse(key) if key == "live/cam1"));
    }

    #[test]
    fn remove_publisher_only_removes_matching_handle() {
        let registry: Registry<TestConnection> = Registry::new();
        let a = TestConnection::new();
        let b = TestConnection::new();

        registry.register_publisher("live/cam1", a.clone()).unwrap();
        // b never registered; removing with b must not clobber a's entry
        registry.remove_publisher("live/cam1", &b);
        assert_eq!(registry.lookup_publisher("live/cam1"), Some(a));
    }

    #[test]
    fn add_subscriber_is_idempotent() {
        let registry: Registry<TestConnection> = Registry::new();
        let sub = TestConnection::new();

        registry.add_subscriber("live/cam1", sub.clone());
        registry.add_subscriber("live/cam1", sub.clone());

        assert_eq!(registry.subscribers_snapshot("live/cam1").len(), 1);
    }

    #[test]
    fn last_subscriber_leaving_drops_the_group() {
        let registry: Registry<TestConnection> = Registry::new();
        let sub = TestConnection::new();

        registry.add_subscriber("live/cam1", sub.clone());
        registry.remove_subscriber("live/cam1", &sub);

        assert!(registry.subscribers_snapshot("live/cam1").is_empty());
    }
}
