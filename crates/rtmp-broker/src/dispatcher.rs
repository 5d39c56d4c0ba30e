//! Routes an inbound [`RtmpMessage`] to the command or data handler by
//! message type, and owns the uniform error-to-connection-state policy.
//! Handlers return typed errors; only this module decides whether an error
//! closes the connection it came from.

use thiserror::Error;

use crate::command::{self, CommandError};
use crate::connection::ConnectionHandle;
use crate::data::{self, DataError};
use crate::message::{RtmpMessage, RtmpMessageType};
use crate::registry::Registry;

#[derive(Debug, Error)]
pub enum RtmpError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Data(#[from] DataError),
}

impl RtmpError {
    /// Whether this error should close the connection it was raised on.
    /// `false` means log and continue —
    /// currently only a publisher's readiness resolving to failure during a
    /// subscriber's `play`/`pause(false)`.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RtmpError::Command(CommandError::PublisherFailed))
    }
}

/// Dispatches one already-assembled inbound message on `conn`.
///
/// Returns the error, if any, so the caller can log it and decide whether to
/// close the connection via [`RtmpError::is_fatal`]. This function never
/// calls `close()` itself — the per-connection loop owns the connection.
pub async fn handle_message<C: ConnectionHandle>(conn: &C, registry: &Registry<C>, message: RtmpMessage<C::Buffer>) -> Result<(), RtmpError> {
    let result = match message.message_type {
        RtmpMessageType::Amf0Command => command::handle_command(conn, registry, &message).await.map_err(RtmpError::from),
        RtmpMessageType::Amf0Data => data::handle_amf0_data(conn, &message).map_err(RtmpError::from),
        RtmpMessageType::AudioData => {
            data::handle_audio_data(conn, registry, &message).await;
            Ok(())
        }
        RtmpMessageType::VideoData => data::handle_video_data(conn, registry, &message).await.map_err(RtmpError::from),
        RtmpMessageType::UserControlMessage => {
            tracing::trace!("user control message acknowledged and ignored");
            Ok(())
        }
        RtmpMessageType::SetChunkSize
        | RtmpMessageType::Abort
        | RtmpMessageType::Acknowledgement
        | RtmpMessageType::WindowAcknowledgementSize
        | RtmpMessageType::SetPeerBandwidth => {
            tracing::trace!(message_type = ?message.message_type, "protocol control message acknowledged and ignored");
            Ok(())
        }
    };
    // The dispatcher owns one refcount share on the inbound handle regardless
    // of how routing went; handlers that cache or fan out take their own
    // independent copy/retain first, so this release never invalidates what
    // they're holding.
    message.release();
    result
}

/// Core-provided teardown hook: the transport calls this once, when a
/// connection closes, regardless of which error (if any) caused the close.
/// Delegates to the registry's own teardown so the registry never has to
/// discover a dropped connection on its own.
pub fn handle_connection_closed<C: ConnectionHandle>(registry: &Registry<C>, conn: &C) {
    registry.on_connection_closed(conn);
    conn.session().fail_readiness();
}

#[cfg(test)]
mod tests {
    use broker_amf0::{Amf0Encoder, Amf0Value};

    use super::*;
    use crate::buffer::PooledBytes;
    use crate::tests_support::TestConnection;

    fn encode(values: &[Amf0Value<'_>]) -> Vec<u8> {
        let mut buf = Vec::new();
        for value in values {
            Amf0Encoder::encode(&mut buf, value).unwrap();
        }
        buf
    }

    #[tokio::test]
    async fn malformed_command_is_fatal() {
        let registry: Registry<TestConnection> = Registry::new();
        let conn = TestConnection::new();
        let message = RtmpMessage::<PooledBytes>::new(RtmpMessageType::Amf0Command, 0, 0, PooledBytes::new(Vec::new()));

        let err = handle_message(&conn, &registry, message).await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn play_before_publish_is_fatal_but_registry_sees_no_entry() {
        let registry: Registry<TestConnection> = Registry::new();
        let conn = TestConnection::new();
        conn.session().set_app("live".to_string());

        let payload = encode(&[Amf0Value::String("play".into()), Amf0Value::Number(4.0), Amf0Value::Null, Amf0Value::String("cam1".into())]);
        let message = RtmpMessage::<PooledBytes>::new(RtmpMessageType::Amf0Command, 0, 0, PooledBytes::new(payload));

        let err = handle_message(&conn, &registry, message).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(registry.subscribers_snapshot("live/cam1").is_empty());
    }

    #[tokio::test]
    async fn user_control_messages_are_acknowledged_without_error() {
        let registry: Registry<TestConnection> = Registry::new();
        let conn = TestConnection::new();
        let message = RtmpMessage::<PooledBytes>::new(RtmpMessageType::UserControlMessage, 0, 0, PooledBytes::new(vec![0, 0, 0, 0, 0, 1]));
        assert!(handle_message(&conn, &registry, message).await.is_ok());
    }
}
