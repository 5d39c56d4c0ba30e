//! End-to-end scenario tests exercising the dispatcher, command handler,
//! data handler, and registry together, the way a real publisher/subscriber
//! pair would drive them over a connection each. Mirrors the literal
//! canonical scenarios this broker is expected to handle correctly.

use broker_amf0::{Amf0Encoder, Amf0Value};

use crate::buffer::{PooledBytes, RefCountedBuffer};
use crate::dispatcher::{handle_connection_closed, handle_message};
use crate::message::{RtmpMessage, RtmpMessageType};
use crate::registry::Registry;
use crate::tests_support::{TestConnection, WrittenMessage};

fn command(values: &[Amf0Value<'_>]) -> RtmpMessage<PooledBytes> {
    let mut buf = Vec::new();
    for value in values {
        Amf0Encoder::encode(&mut buf, value).unwrap();
    }
    RtmpMessage::new(RtmpMessageType::Amf0Command, 0, 0, PooledBytes::new(buf))
}

fn connect(tid: f64, app: &str) -> RtmpMessage<PooledBytes> {
    command(&[
        Amf0Value::String("connect".into()),
        Amf0Value::Number(tid),
        Amf0Value::Object(vec![("app".into(), Amf0Value::String(app.to_string().into()))].into()),
    ])
}

fn create_stream(tid: f64) -> RtmpMessage<PooledBytes> {
    command(&[Amf0Value::String("createStream".into()), Amf0Value::Number(tid), Amf0Value::Null])
}

fn publish(tid: f64, stream_name: &str) -> RtmpMessage<PooledBytes> {
    command(&[
        Amf0Value::String("publish".into()),
        Amf0Value::Number(tid),
        Amf0Value::Null,
        Amf0Value::String(stream_name.to_string().into()),
    ])
}

fn play(tid: f64, stream_name: &str) -> RtmpMessage<PooledBytes> {
    command(&[
        Amf0Value::String("play".into()),
        Amf0Value::Number(tid),
        Amf0Value::Null,
        Amf0Value::String(stream_name.to_string().into()),
    ])
}

fn pause(tid: f64, pausing: bool) -> RtmpMessage<PooledBytes> {
    command(&[Amf0Value::String("pause".into()), Amf0Value::Number(tid), Amf0Value::Null, Amf0Value::Boolean(pausing)])
}

fn meta_data(width: f64) -> RtmpMessage<PooledBytes> {
    let mut buf = Vec::new();
    Amf0Encoder::encode(&mut buf, &Amf0Value::String("onMetaData".into())).unwrap();
    Amf0Encoder::encode(&mut buf, &Amf0Value::Object(vec![("width".into(), Amf0Value::Number(width))].into())).unwrap();
    RtmpMessage::new(RtmpMessageType::Amf0Data, 0, 1, PooledBytes::new(buf))
}

fn video(first_byte: u8) -> RtmpMessage<PooledBytes> {
    RtmpMessage::new(RtmpMessageType::VideoData, 0, 1, PooledBytes::new(vec![first_byte, 0x00]))
}

fn decode(msg: &WrittenMessage) -> Vec<Amf0Value<'static>> {
    let mut decoder = broker_amf0::Amf0Decoder::new(&msg.bytes);
    decoder.decode_all().unwrap().into_iter().map(Amf0Value::into_owned).collect()
}

/// Happy-path publish+play.
#[tokio::test]
async fn happy_path_publish_then_play() {
    let registry: Registry<TestConnection> = Registry::new();
    let publisher = TestConnection::new();

    handle_message(&publisher, &registry, connect(1.0, "live")).await.unwrap();
    handle_message(&publisher, &registry, create_stream(2.0)).await.unwrap();
    handle_message(&publisher, &registry, publish(3.0, "cam1")).await.unwrap();
    handle_message(&publisher, &registry, meta_data(1280.0)).await.unwrap();
    handle_message(&publisher, &registry, video(0x17)).await.unwrap();

    assert!(publisher.session().key_frame().is_some());
    assert_eq!(registry.lookup_publisher("live/cam1"), Some(publisher.clone()));

    let subscriber = TestConnection::new();
    handle_message(&subscriber, &registry, connect(1.0, "live")).await.unwrap();
    handle_message(&subscriber, &registry, create_stream(2.0)).await.unwrap();
    handle_message(&subscriber, &registry, play(3.0, "cam1")).await.unwrap();

    let written = subscriber.written();
    // control triad (connect) + _result (connect) + _result (createStream) +
    // onStatus Play.Start + |RtmpSampleAccess + onMetaData + key frame.
    assert_eq!(written.len(), 9);
    assert_eq!(written[0].message_type, RtmpMessageType::WindowAcknowledgementSize);
    assert_eq!(written[1].message_type, RtmpMessageType::SetPeerBandwidth);
    assert_eq!(written[2].message_type, RtmpMessageType::SetChunkSize);

    let connect_result = decode(&written[3]);
    assert_eq!(connect_result[0].as_str(), Some("_result"));

    let create_stream_result = decode(&written[4]);
    assert_eq!(create_stream_result[0].as_str(), Some("_result"));
    assert_eq!(create_stream_result[3].as_f64(), Some(1.0));

    let on_status = decode(&written[5]);
    assert_eq!(on_status[0].as_str(), Some("onStatus"));
    assert_eq!(on_status[3].get("code").and_then(|v| v.as_str()), Some("NetStream.Play.Start"));

    let sample_access = decode(&written[6]);
    assert_eq!(sample_access[0].as_str(), Some("|RtmpSampleAccess"));

    let on_meta_data = decode(&written[7]);
    assert_eq!(on_meta_data[0].as_str(), Some("onMetaData"));
    assert_eq!(on_meta_data[1].get("width").and_then(|v| v.as_f64()), Some(1280.0));

    let key_frame = &written[8];
    assert_eq!(key_frame.message_type, RtmpMessageType::VideoData);
    assert_eq!(key_frame.bytes, vec![0x17, 0x00]);

    assert_eq!(registry.subscribers_snapshot("live/cam1"), vec![subscriber]);
}

/// Play before publish.
#[tokio::test]
async fn play_before_publish_closes_the_subscriber() {
    let registry: Registry<TestConnection> = Registry::new();
    let subscriber = TestConnection::new();

    handle_message(&subscriber, &registry, connect(1.0, "live")).await.unwrap();
    handle_message(&subscriber, &registry, create_stream(2.0)).await.unwrap();
    let err = handle_message(&subscriber, &registry, play(3.0, "cam1")).await.unwrap_err();
    assert!(err.is_fatal());
    subscriber.close();

    assert!(subscriber.is_closed());
    assert!(registry.subscribers_snapshot("live/cam1").is_empty());
}

/// Fan-out to an existing subscriber group.
#[tokio::test]
async fn fan_out_delivers_one_bit_identical_frame_per_subscriber() {
    let registry: Registry<TestConnection> = Registry::new();
    let publisher = TestConnection::new();
    publisher.session().set_app("live".to_string());
    publisher.session().set_stream_name("cam1".to_string());

    handle_message(&publisher, &registry, video(0x17)).await.unwrap();

    let sub_a = TestConnection::new();
    let sub_b = TestConnection::new();
    registry.add_subscriber("live/cam1", sub_a.clone());
    registry.add_subscriber("live/cam1", sub_b.clone());

    // A probe handle outlives the dispatch so the refcount can be inspected
    // afterward: `frame` itself is moved into `handle_message` and consumed
    // by the dispatcher's end-of-dispatch release.
    let frame = video(0x27);
    let probe = frame.payload.retain();
    handle_message(&publisher, &registry, frame).await.unwrap();

    assert_eq!(sub_a.written().len(), 1);
    assert_eq!(sub_b.written().len(), 1);
    assert_eq!(sub_a.written()[0].bytes, vec![0x27, 0x00]);
    assert_eq!(sub_b.written()[0].bytes, vec![0x27, 0x00]);
    // The dispatcher's own release plus each subscriber write's release
    // exactly cancel the two fan-out retains, leaving only this probe's
    // share: refcount is back to what it was before dispatch.
    assert_eq!(probe.ref_count(), 1);
}

/// Pause/unpause.
#[tokio::test]
async fn pause_then_unpause_replays_the_key_frame() {
    let registry: Registry<TestConnection> = Registry::new();
    let publisher = TestConnection::new();
    publisher.session().set_app("live".to_string());
    publisher.session().set_stream_name("cam1".to_string());
    handle_message(&publisher, &registry, video(0x17)).await.unwrap();

    let subscriber = TestConnection::new();
    subscriber.session().set_app("live".to_string());
    subscriber.session().set_stream_name("cam1".to_string());
    registry.add_subscriber("live/cam1", subscriber.clone());

    handle_message(&subscriber, &registry, pause(4.0, true)).await.unwrap();
    assert!(subscriber.session().paused());

    let written = subscriber.written();
    let on_status = decode(&written[0]);
    assert_eq!(on_status[3].get("code").and_then(|v| v.as_str()), Some("NetStream.Pause.Notify"));
    assert_eq!(written[1].message_type, RtmpMessageType::UserControlMessage);
    let mut expected = 1u16.to_be_bytes().to_vec();
    expected.extend_from_slice(&1u32.to_be_bytes());
    assert_eq!(written[1].bytes, expected);

    // Fan-out frames are skipped while paused.
    handle_message(&publisher, &registry, video(0x27)).await.unwrap();
    assert_eq!(subscriber.written().len(), 2);

    handle_message(&subscriber, &registry, pause(5.0, false)).await.unwrap();
    assert!(!subscriber.session().paused());

    let written = subscriber.written();
    assert_eq!(written.len(), 5);
    let on_status = decode(&written[2]);
    assert_eq!(on_status[3].get("code").and_then(|v| v.as_str()), Some("NetStream.Unpause.Notify"));
    assert_eq!(written[3].message_type, RtmpMessageType::UserControlMessage);
    let mut expected = 0u16.to_be_bytes().to_vec();
    expected.extend_from_slice(&1u32.to_be_bytes());
    assert_eq!(written[3].bytes, expected);
    assert_eq!(written[4].message_type, RtmpMessageType::VideoData);
    assert_eq!(written[4].bytes, vec![0x17, 0x00]);
}

/// Publisher departure.
#[tokio::test]
async fn publisher_departure_removes_the_registry_entry_without_closing_subscribers() {
    let registry: Registry<TestConnection> = Registry::new();
    let publisher = TestConnection::new();
    publisher.session().set_app("live".to_string());
    publisher.session().set_stream_name("cam1".to_string());
    handle_message(&publisher, &registry, video(0x17)).await.unwrap();

    let subscriber = TestConnection::new();
    registry.add_subscriber("live/cam1", subscriber.clone());

    handle_connection_closed(&registry, &publisher);

    assert_eq!(registry.lookup_publisher("live/cam1"), None);
    assert_eq!(registry.subscribers_snapshot("live/cam1"), vec![subscriber.clone()]);
    assert!(!subscriber.is_closed());
}

/// Malformed command.
#[tokio::test]
async fn malformed_command_closes_the_connection_with_no_registry_side_effects() {
    let registry: Registry<TestConnection> = Registry::new();
    let publisher = TestConnection::new();

    let empty = RtmpMessage::new(RtmpMessageType::Amf0Command, 0, 0, PooledBytes::new(Vec::new()));
    let err = handle_message(&publisher, &registry, empty).await.unwrap_err();
    assert!(err.is_fatal());
    publisher.close();

    assert!(publisher.is_closed());
    assert_eq!(registry.lookup_publisher("live/cam1"), None);
}
