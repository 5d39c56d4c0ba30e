//! Builders for `NetConnection`-scoped command responses: `connect`'s
//! `_result` and `createStream`'s `_result`. Both ride on stream id 0, ahead
//! of the stream id a subsequent `createStream` hands back.

use std::borrow::Cow;

use broker_amf0::{Amf0Value, Amf0WriteError};

use crate::amf0_wire::amf0_command;
use crate::buffer::RefCountedBuffer;
use crate::message::RtmpMessage;

pub fn connect_result<B: RefCountedBuffer>(transaction_id: f64) -> Result<RtmpMessage<B>, Amf0WriteError> {
    let properties = Amf0Value::Object(Cow::Owned(vec![
        (Cow::Borrowed("fmsVer"), Amf0Value::String(Cow::Borrowed("FMS/3,0,1,123"))),
        (Cow::Borrowed("capabilities"), Amf0Value::Number(31.0)),
    ]));
    let info = Amf0Value::Object(Cow::Owned(vec![
        (Cow::Borrowed("level"), Amf0Value::String(Cow::Borrowed("status"))),
        (Cow::Borrowed("code"), Amf0Value::String(Cow::Borrowed("NetConnection.Connect.Success"))),
        (Cow::Borrowed("description"), Amf0Value::String(Cow::Borrowed("Connection succeeded."))),
        (Cow::Borrowed("objectEncoding"), Amf0Value::Number(0.0)),
    ]));
    amf0_command(&[Amf0Value::String(Cow::Borrowed("_result")), Amf0Value::Number(transaction_id), properties, info])
}

/// The returned stream id of `1` is fixed — this broker never multiplexes
/// more than one logical stream per connection.
pub fn create_stream_result<B: RefCountedBuffer>(transaction_id: f64) -> Result<RtmpMessage<B>, Amf0WriteError> {
    amf0_command(&[
        Amf0Value::String(Cow::Borrowed("_result")),
        Amf0Value::Number(transaction_id),
        Amf0Value::Null,
        Amf0Value::Number(1.0),
    ])
}

#[cfg(test)]
mod tests {
    use broker_amf0::Amf0Decoder;

    use super::*;
    use crate::buffer::PooledBytes;

    #[test]
    fn connect_result_sequence_matches_the_fixed_wire_constants() {
        let msg: RtmpMessage<PooledBytes> = connect_result(1.0).unwrap();
        let mut decoder = Amf0Decoder::new(msg.payload.as_bytes());
        let sequence = decoder.decode_all().unwrap();

        assert_eq!(sequence[0].as_str(), Some("_result"));
        assert_eq!(sequence[1].as_f64(), Some(1.0));
        assert_eq!(sequence[2].get("fmsVer").and_then(|v| v.as_str()), Some("FMS/3,0,1,123"));
        assert_eq!(sequence[2].get("capabilities").and_then(|v| v.as_f64()), Some(31.0));
        assert_eq!(sequence[3].get("code").and_then(|v| v.as_str()), Some("NetConnection.Connect.Success"));
        assert_eq!(sequence[3].get("objectEncoding").and_then(|v| v.as_f64()), Some(0.0));
    }

    #[test]
    fn create_stream_result_returns_fixed_stream_id_one() {
        let msg: RtmpMessage<PooledBytes> = create_stream_result(2.0).unwrap();
        let mut decoder = Amf0Decoder::new(msg.payload.as_bytes());
        let sequence = decoder.decode_all().unwrap();
        assert_eq!(sequence[3].as_f64(), Some(1.0));
    }
}
