//! Builders for `NetStream`-scoped responses: `onStatus`, `onFCPublish`,
//! `|RtmpSampleAccess`, `onMetaData`. All ride on [`STREAM_ID`], the fixed
//! stream id `createStream` hands back.

use std::borrow::Cow;

use broker_amf0::{Amf0Value, Amf0WriteError};

use crate::amf0_wire::{amf0_command, amf0_data};
use crate::buffer::RefCountedBuffer;
use crate::message::RtmpMessage;

pub const STREAM_ID: u32 = 1;

fn status_info(code: &str, description: &str) -> Amf0Value<'static> {
    Amf0Value::Object(Cow::Owned(vec![
        (Cow::Borrowed("level"), Amf0Value::String(Cow::Borrowed("status"))),
        (Cow::Borrowed("code"), Amf0Value::String(Cow::Owned(code.to_string()))),
        (Cow::Borrowed("description"), Amf0Value::String(Cow::Owned(description.to_string()))),
    ]))
}

pub fn on_status<B: RefCountedBuffer>(code: &str, description: &str) -> Result<RtmpMessage<B>, Amf0WriteError> {
    amf0_command(&[Amf0Value::String(Cow::Borrowed("onStatus")), Amf0Value::Number(0.0), Amf0Value::Null, status_info(code, description)])
}

/// `onFCPublish` carries a literal `Number(0)` in the transaction-id slot,
/// not the inbound command's transaction id.
pub fn on_fc_publish<B: RefCountedBuffer>(code: &str, description: &str) -> Result<RtmpMessage<B>, Amf0WriteError> {
    amf0_command(&[Amf0Value::String(Cow::Borrowed("onFCPublish")), Amf0Value::Number(0.0), Amf0Value::Null, status_info(code, description)])
}

pub fn rtmp_sample_access<B: RefCountedBuffer>() -> Result<RtmpMessage<B>, Amf0WriteError> {
    amf0_data(STREAM_ID, &[Amf0Value::String(Cow::Borrowed("|RtmpSampleAccess")), Amf0Value::Boolean(true), Amf0Value::Boolean(true)])
}

pub fn on_meta_data<B: RefCountedBuffer>(metadata: Amf0Value<'static>) -> Result<RtmpMessage<B>, Amf0WriteError> {
    amf0_data(STREAM_ID, &[Amf0Value::String(Cow::Borrowed("onMetaData")), metadata])
}

#[cfg(test)]
mod tests {
    use broker_amf0::Amf0Decoder;

    use super::*;
    use crate::buffer::PooledBytes;

    #[test]
    fn on_status_carries_level_code_and_description() {
        let msg: RtmpMessage<PooledBytes> = on_status("NetStream.Play.Start", "Start publishing").unwrap();
        let mut decoder = Amf0Decoder::new(msg.payload.as_bytes());
        let sequence = decoder.decode_all().unwrap();
        assert_eq!(sequence[0].as_str(), Some("onStatus"));
        assert_eq!(sequence[3].get("level").and_then(|v| v.as_str()), Some("status"));
        assert_eq!(sequence[3].get("code").and_then(|v| v.as_str()), Some("NetStream.Play.Start"));
        assert_eq!(sequence[3].get("description").and_then(|v| v.as_str()), Some("Start publishing"));
    }

    #[test]
    fn rtmp_sample_access_is_true_true_on_amf0_data() {
        use crate::message::RtmpMessageType;

        let msg: RtmpMessage<PooledBytes> = rtmp_sample_access().unwrap();
        assert_eq!(msg.message_type, RtmpMessageType::Amf0Data);
        assert_eq!(msg.stream_id, STREAM_ID);
        let mut decoder = Amf0Decoder::new(msg.payload.as_bytes());
        let sequence = decoder.decode_all().unwrap();
        assert_eq!(sequence[0].as_str(), Some("|RtmpSampleAccess"));
        assert_eq!(sequence[1].as_bool(), Some(true));
        assert_eq!(sequence[2].as_bool(), Some(true));
    }

    #[test]
    fn on_meta_data_wraps_the_caller_supplied_value() {
        let metadata = Amf0Value::Object(Cow::Owned(vec![(Cow::Borrowed("width"), Amf0Value::Number(1280.0))]));
        let msg: RtmpMessage<PooledBytes> = on_meta_data(metadata).unwrap();
        let mut decoder = Amf0Decoder::new(msg.payload.as_bytes());
        let sequence = decoder.decode_all().unwrap();
        assert_eq!(sequence[0].as_str(), Some("onMetaData"));
        assert_eq!(sequence[1].get("width").and_then(|v| v.as_f64()), Some(1280.0));
    }
}
