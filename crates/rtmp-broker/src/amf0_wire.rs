//! Encodes an AMF0 value sequence into an outbound [`RtmpMessage`] body.
//! Shared by the command handler's response builders and the data handler's
//! `onMetaData` replay — both ultimately do the same thing: serialize a
//! sequence of [`Amf0Value`]s and wrap the bytes in a message of the right
//! type.

use broker_amf0::{Amf0Encoder, Amf0Value, Amf0WriteError};

use crate::buffer::RefCountedBuffer;
use crate::message::{RtmpMessage, RtmpMessageType};

fn encode_sequence(values: &[Amf0Value<'_>]) -> Result<Vec<u8>, Amf0WriteError> {
    let mut buf = Vec::new();
    for value in values {
        Amf0Encoder::encode(&mut buf, value)?;
    }
    Ok(buf)
}

/// Builds an `AMF0_COMMAND` message carrying `values`, on stream id 0.
pub fn amf0_command<B: RefCountedBuffer>(values: &[Amf0Value<'_>]) -> Result<RtmpMessage<B>, Amf0WriteError> {
    Ok(RtmpMessage::new(RtmpMessageType::Amf0Command, 0, 0, encode_sequence(values)?.into()))
}

/// Builds an `AMF0_DATA` message carrying `values`, on the given stream id.
pub fn amf0_data<B: RefCountedBuffer>(stream_id: u32, values: &[Amf0Value<'_>]) -> Result<RtmpMessage<B>, Amf0WriteError> {
    Ok(RtmpMessage::new(RtmpMessageType::Amf0Data, 0, stream_id, encode_sequence(values)?.into()))
}
