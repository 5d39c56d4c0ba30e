//! Handles inbound `AMF0_DATA` (metadata capture), `AUDIO_DATA`, and
//! `VIDEO_DATA` (publisher ingress → subscriber fan-out).

mod errors;

pub use errors::DataError;

use broker_amf0::{Amf0Decoder, Amf0Value};

use crate::connection::ConnectionHandle;
use crate::message::RtmpMessage;
use crate::registry::Registry;

/// `AMF0_DATA` ingress: scans the decoded sequence for the first `String`
/// equal to `"onMetaData"` at any index and captures the element right after
/// it as the publisher session's metadata. Some encoders prefix a literal
/// `"@setDataFrame"` marker before `"onMetaData"`, so this does not assume
/// the name sits at index 0.
pub fn handle_amf0_data<C: ConnectionHandle>(conn: &C, message: &RtmpMessage<C::Buffer>) -> Result<(), DataError> {
    let mut decoder = Amf0Decoder::new(message.payload.as_bytes());
    let sequence = decoder.decode_all()?;

    if sequence.is_empty() {
        return Err(DataError::MalformedData("AMF0_DATA payload decoded to an empty sequence".into()));
    }

    if let Some(index) = sequence.iter().position(|v| v.as_str() == Some("onMetaData")) {
        if let Some(metadata) = sequence.get(index + 1) {
            conn.session().set_metadata(metadata.clone().into_owned());
        }
    }
    Ok(())
}

/// `AUDIO_DATA` ingress: forwarded verbatim to every non-paused subscriber in
/// the stream key's group. No first-packet (e.g. AAC sequence header)
/// caching is attempted here; if some encoders turn out to need it replayed
/// the way the key frame is, it would mirror `try_cache_key_frame`'s shape.
pub async fn handle_audio_data<C: ConnectionHandle>(conn: &C, registry: &Registry<C>, message: &RtmpMessage<C::Buffer>) {
    fan_out(conn, registry, message).await;
}

/// `VIDEO_DATA` ingress: caches the first key frame (completing publisher
/// readiness and registering the publisher), or fans out any subsequent
/// frame to the subscriber group.
pub async fn handle_video_data<C: ConnectionHandle>(conn: &C, registry: &Registry<C>, message: &RtmpMessage<C::Buffer>) -> Result<(), DataError> {
    let session = conn.session();
    if session.key_frame().is_none() && message.is_key_frame() {
        session.try_cache_key_frame(message.copy());
        if let Some(stream_key) = session.stream_key() {
            registry.register_publisher(stream_key, conn.clone())?;
        }
        return Ok(());
    }
    fan_out(conn, registry, message).await;
    Ok(())
}

/// Snapshot-iterates the subscriber group for `conn`'s stream key and writes
/// `message` (payload retained, refcount +1 per subscriber) to every
/// non-paused member. A write failure here is tolerated, not escalated —
/// backpressure and eventual disconnection are the transport's concern.
async fn fan_out<C: ConnectionHandle>(conn: &C, registry: &Registry<C>, message: &RtmpMessage<C::Buffer>) {
    let Some(stream_key) = conn.session().stream_key() else {
        return;
    };
    for subscriber in registry.subscribers_snapshot(stream_key) {
        if subscriber.session().paused() {
            continue;
        }
        let _ = subscriber.write(message.retain()).await;
    }
}

#[cfg(test)]
mod tests {
    use broker_amf0::{Amf0Encoder, Amf0Value};

    use super::*;
    use crate::buffer::PooledBytes;
    use crate::message::{RtmpMessage, RtmpMessageType};
    use crate::registry::Registry;
    use crate::tests_support::TestConnection;

    fn encode(values: &[Amf0Value<'_>]) -> Vec<u8> {
        let mut buf = Vec::new();
        for value in values {
            Amf0Encoder::encode(&mut buf, value).unwrap();
        }
        buf
    }

    #[test]
    fn on_meta_data_found_after_a_setdataframe_marker_is_captured() {
        let conn = TestConnection::new();
        let payload = encode(&[
            Amf0Value::String("@setDataFrame".into()),
            Amf0Value::String("onMetaData".into()),
            Amf0Value::Object(vec![("width".into(), Amf0Value::Number(1280.0))].into()),
        ]);
        let message = RtmpMessage::<PooledBytes>::new(RtmpMessageType::Amf0Data, 0, 1, PooledBytes::new(payload));

        handle_amf0_data(&conn, &message).unwrap();

        let metadata = conn.session().metadata().unwrap();
        assert_eq!(metadata.get("width").and_then(|v| v.as_f64()), Some(1280.0));
    }

    #[test]
    fn empty_amf0_data_sequence_is_malformed() {
        let conn = TestConnection::new();
        let message = RtmpMessage::<PooledBytes>::new(RtmpMessageType::Amf0Data, 0, 1, PooledBytes::new(Vec::new()));
        assert!(handle_amf0_data(&conn, &message).is_err());
    }

    #[tokio::test]
    async fn first_key_frame_is_cached_and_registers_the_publisher() {
        let registry: Registry<TestConnection> = Registry::new();
        let publisher = TestConnection::new();
        publisher.session().set_app("live".to_string());
        publisher.session().set_stream_name("cam1".to_string());

        let key_frame = RtmpMessage::<PooledBytes>::new(RtmpMessageType::VideoData, 0, 1, PooledBytes::new(vec![0x17, 0x00]));
        handle_video_data(&publisher, &registry, &key_frame).await.unwrap();

        assert!(publisher.session().key_frame().is_some());
        assert_eq!(registry.lookup_publisher("live/cam1"), Some(publisher));
    }

    #[tokio::test]
    async fn non_key_frames_fan_out_to_unpaused_subscribers_only() {
        let registry: Registry<TestConnection> = Registry::new();
        let publisher = TestConnection::new();
        publisher.session().set_app("live".to_string());
        publisher.session().set_stream_name("cam1".to_string());

        let active = TestConnection::new();
        let paused = TestConnection::new();
        paused.session().set_paused(true);
        registry.add_subscriber("live/cam1", active.clone());
        registry.add_subscriber("live/cam1", paused.clone());

        let frame = RtmpMessage::<PooledBytes>::new(RtmpMessageType::VideoData, 0, 1, PooledBytes::new(vec![0x27, 0x00]));
        handle_video_data(&publisher, &registry, &frame).await.unwrap();

        assert_eq!(active.written().len(), 1);
        assert!(paused.written().is_empty());
    }

    #[tokio::test]
    async fn duplicate_publisher_key_frame_is_rejected() {
        let registry: Registry<TestConnection> = Registry::new();
        let first = TestConnection::new();
        first.session().set_app("live".to_string());
        first.session().set_stream_name("cam1".to_string());
        let second = TestConnection::new();
        second.session().set_app("live".to_string());
        second.session().set_stream_name("cam1".to_string());

        let key_frame = RtmpMessage::<PooledBytes>::new(RtmpMessageType::VideoData, 0, 1, PooledBytes::new(vec![0x17]));
        handle_video_data(&first, &registry, &key_frame).await.unwrap();

        let err = handle_video_data(&second, &registry, &key_frame.copy()).await.unwrap_err();
        assert!(matches!(err, DataError::StreamKeyInUse(key) if key == "live/cam1"));
    }
}
