//! AMF0 command handling: `connect`, `createStream`, `publish`, `FCPublish`,
//! `play`, `pause`. Each handler decodes the inbound AMF0 sequence, mutates
//! session/registry state, and writes responses back on its own connection.
//! Handlers never call `close()` themselves — the dispatcher maps the
//! returned error to a close/log decision.

mod errors;
mod netconnection;
mod netstream;

pub use errors::CommandError;

use broker_amf0::{Amf0Decoder, Amf0Value};

use crate::connection::ConnectionHandle;
use crate::control_messages::{self, PeerBandwidthLimitType, UserControlEvent};
use crate::message::RtmpMessage;
use crate::registry::Registry;
use crate::session::{ReadyState, SessionRole};

/// Commands recognized but not implemented. A command outside both this list
/// and the `match` below is unrecognized and is logged and ignored rather
/// than treated as an error.
const UNSUPPORTED_COMMANDS: &[&str] = &["call", "close", "play2", "deleteStream", "closeStream", "receiveAudio", "receiveVideo", "seek"];

pub async fn handle_command<C: ConnectionHandle>(
    conn: &C,
    registry: &Registry<C>,
    message: &RtmpMessage<C::Buffer>,
) -> Result<(), CommandError> {
    let mut decoder = Amf0Decoder::new(message.payload.as_bytes());
    let sequence = decoder.decode_all()?;

    let name = sequence
        .first()
        .and_then(Amf0Value::as_str)
        .ok_or_else(|| CommandError::MalformedCommand("command sequence is empty or does not start with a name String".into()))?
        .to_string();

    // Absent in practice, but no command contract here depends on failing
    // when it's missing, so default rather than reject.
    let transaction_id = sequence.get(1).and_then(Amf0Value::as_f64).unwrap_or(0.0);

    match name.as_str() {
        "connect" => connect(conn, &sequence, transaction_id).await,
        "createStream" => create_stream(conn, transaction_id).await,
        "publish" => publish(conn, &sequence).await,
        "FCPublish" => fc_publish(conn).await,
        "play" => play(conn, registry, &sequence).await,
        "pause" => pause(conn, registry, &sequence).await,
        other if UNSUPPORTED_COMMANDS.contains(&other) => Err(CommandError::Unsupported(other.to_string())),
        other => {
            tracing::debug!(command = other, "unknown command ignored");
            Ok(())
        }
    }
}

async fn connect<C: ConnectionHandle>(conn: &C, sequence: &[Amf0Value<'_>], transaction_id: f64) -> Result<(), CommandError> {
    if sequence.len() < 3 {
        return Err(CommandError::MalformedCommand("connect requires a command object at index 2".into()));
    }
    let app = sequence[2]
        .get("app")
        .and_then(Amf0Value::as_str)
        .ok_or_else(|| CommandError::MalformedCommand("connect's command object has no string `app`".into()))?;
    conn.session().set_app(app.to_string());

    conn.write(control_messages::window_acknowledgement_size(5_000_000)).await?;
    conn.write(control_messages::set_peer_bandwidth(5_000_000, PeerBandwidthLimitType::Dynamic)).await?;
    conn.write(control_messages::set_chunk_size(1480)).await?;
    conn.write_and_flush(netconnection::connect_result(transaction_id)?).await?;
    Ok(())
}

async fn create_stream<C: ConnectionHandle>(conn: &C, transaction_id: f64) -> Result<(), CommandError> {
    conn.write_and_flush(netconnection::create_stream_result(transaction_id)?).await?;
    Ok(())
}

fn stream_name_arg<'a>(sequence: &'a [Amf0Value<'a>]) -> Result<&'a str, CommandError> {
    sequence.get(3).and_then(Amf0Value::as_str).ok_or_else(|| CommandError::MalformedCommand("expected a stream name String at index 3".into()))
}

async fn publish<C: ConnectionHandle>(conn: &C, sequence: &[Amf0Value<'_>]) -> Result<(), CommandError> {
    let stream_name = stream_name_arg(sequence)?;
    conn.session().set_role(SessionRole::Publisher).map_err(|err| CommandError::MalformedCommand(err.to_string()))?;
    conn.session().set_stream_name(stream_name.to_string());
    conn.write_and_flush(netstream::on_status("NetStream.Play.Start", "Start publishing")?).await?;
    Ok(())
}

async fn fc_publish<C: ConnectionHandle>(conn: &C) -> Result<(), CommandError> {
    conn.write_and_flush(netstream::on_fc_publish("NetStream.Play.Start", "Start publishing")?).await?;
    Ok(())
}

async fn play<C: ConnectionHandle>(conn: &C, registry: &Registry<C>, sequence: &[Amf0Value<'_>]) -> Result<(), CommandError> {
    let stream_name = stream_name_arg(sequence)?;
    conn.session().set_role(SessionRole::Subscriber).map_err(|err| CommandError::MalformedCommand(err.to_string()))?;
    conn.session().set_stream_name(stream_name.to_string());

    conn.write_and_flush(netstream::on_status("NetStream.Play.Start", "Start publishing")?).await?;
    conn.write_and_flush(netstream::rtmp_sample_access()?).await?;

    let stream_key = conn
        .session()
        .stream_key()
        .ok_or_else(|| CommandError::MalformedCommand("play requires both app and stream name to be set".into()))?
        .to_string();

    let Some(publisher) = registry.lookup_publisher(&stream_key) else {
        return Err(CommandError::PublisherMissing);
    };

    if publisher.session().wait_ready().await != ReadyState::Complete {
        return Err(CommandError::PublisherFailed);
    }

    replay_publisher_state(conn, &publisher).await?;
    registry.add_subscriber(&stream_key, conn.clone());
    Ok(())
}

async fn pause<C: ConnectionHandle>(conn: &C, registry: &Registry<C>, sequence: &[Amf0Value<'_>]) -> Result<(), CommandError> {
    let pausing = sequence
        .get(3)
        .and_then(Amf0Value::as_bool)
        .ok_or_else(|| CommandError::MalformedCommand("expected a Boolean pause flag at index 3".into()))?;

    if pausing {
        conn.session().set_paused(true);
        conn.write_and_flush(netstream::on_status("NetStream.Pause.Notify", "Paused live")?).await?;
        conn.write(control_messages::user_control_event(UserControlEvent::StreamEof, netstream::STREAM_ID)).await?;
        return Ok(());
    }

    conn.write_and_flush(netstream::on_status("NetStream.Unpause.Notify", "Unpaused live")?).await?;
    conn.write(control_messages::user_control_event(UserControlEvent::StreamBegin, netstream::STREAM_ID)).await?;

    let stream_key = conn
        .session()
        .stream_key()
        .ok_or_else(|| CommandError::MalformedCommand("pause(false) requires an established stream key".into()))?
        .to_string();
    let publisher = registry.lookup_publisher(&stream_key).ok_or(CommandError::PublisherMissing)?;

    if publisher.session().wait_ready().await != ReadyState::Complete {
        return Err(CommandError::PublisherFailed);
    }

    replay_publisher_state(conn, &publisher).await?;
    conn.session().set_paused(false);
    Ok(())
}

/// Emits the publisher's cached `onMetaData` (if any) then its cached key
/// frame, re-timestamped to `0`. Shared by `play` and `pause(false)`, which
/// perform the identical replay.
async fn replay_publisher_state<C: ConnectionHandle>(conn: &C, publisher: &C) -> Result<(), CommandError> {
    if let Some(metadata) = publisher.session().metadata() {
        conn.write(netstream::on_meta_data(metadata)?).await?;
    }
    if let Some(key_frame) = publisher.session().key_frame() {
        let mut replay = key_frame.copy();
        replay.timestamp = 0;
        conn.write_and_flush(replay).await?;
    }
    Ok(())
}
