//! The logical RTMP message the chunk-stream layer hands to the core, and
//! the core hands back to be chunked out. No byte-level chunk framing lives
//! here: by the time a [`RtmpMessage`] reaches this crate it has already
//! been reassembled from chunks by an external collaborator.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

use crate::buffer::RefCountedBuffer;

/// The numeric RTMP message type codes this broker understands. Values match
/// the standard RTMP message type IDs. A raw type byte outside this list
/// never becomes an [`RtmpMessage`]: `from_u8` returns `None` and
/// the caller logs and ignores it before a message is ever constructed —
/// that's the "anything else" case in [`crate::dispatcher::handle_message`]'s
/// routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum RtmpMessageType {
    SetChunkSize = 1,
    Abort = 2,
    Acknowledgement = 3,
    UserControlMessage = 4,
    WindowAcknowledgementSize = 5,
    SetPeerBandwidth = 6,
    AudioData = 8,
    VideoData = 9,
    Amf0Data = 18,
    Amf0Command = 20,
}

impl RtmpMessageType {
    pub fn from_u8(value: u8) -> Option<Self> {
        <Self as num_traits::FromPrimitive>::from_u8(value)
    }
}

/// A fully assembled RTMP message.
#[derive(Debug, Clone)]
pub struct RtmpMessage<B: RefCountedBuffer> {
    pub message_type: RtmpMessageType,
    /// Milliseconds; wraps per the RTMP spec. This crate never reinterprets
    /// it beyond passing it through.
    pub timestamp: u32,
    pub stream_id: u32,
    pub payload: B,
}

impl<B: RefCountedBuffer> RtmpMessage<B> {
    pub fn new(message_type: RtmpMessageType, timestamp: u32, stream_id: u32, payload: B) -> Self {
        Self { message_type, timestamp, stream_id, payload }
    }

    /// True iff this is a video message whose first payload byte's high
    /// nibble is `1` (AVC/FLV frame-type nibble for "key frame"). Any other
    /// message type, or an empty payload, is never a key frame.
    pub fn is_key_frame(&self) -> bool {
        self.message_type == RtmpMessageType::VideoData
            && self.payload.as_bytes().first().is_some_and(|&b| b >> 4 == 1)
    }

    /// Same message, payload refcount +1. Cheap: used for fan-out, where N
    /// subscribers each need their own handle to the same bytes.
    pub fn retain(&self) -> Self {
        Self {
            message_type: self.message_type,
            timestamp: self.timestamp,
            stream_id: self.stream_id,
            payload: self.payload.retain(),
        }
    }

    /// A new message with an independent payload copy. Used when caching a
    /// message beyond the lifetime of the inbound dispatch that produced it
    /// (the publisher session's cached key frame).
    pub fn copy(&self) -> Self {
        Self {
            message_type: self.message_type,
            timestamp: self.timestamp,
            stream_id: self.stream_id,
            payload: self.payload.duplicate(),
        }
    }

    /// Releases this handle's share of the payload refcount. Called by the
    /// dispatcher on the inbound message once routing completes, regardless
    /// of outcome: the dispatcher-owned handle is always released at dispatch
    /// return, whatever handlers did with their own copies/retains.
    pub fn release(self) {
        self.payload.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PooledBytes;

    fn video_msg(first_byte: u8) -> RtmpMessage<PooledBytes> {
        RtmpMessage::new(RtmpMessageType::VideoData, 0, 1, PooledBytes::new(vec![first_byte, 0x00]))
    }

    #[test]
    fn key_frame_predicate_true_for_high_nibble_one() {
        assert!(video_msg(0x17).is_key_frame());
    }

    #[test]
    fn key_frame_predicate_false_for_other_nibbles() {
        assert!(!video_msg(0x27).is_key_frame());
    }

    #[test]
    fn key_frame_predicate_false_for_non_video_type() {
        let msg = RtmpMessage::new(RtmpMessageType::AudioData, 0, 1, PooledBytes::new(vec![0x17]));
        assert!(!msg.is_key_frame());
    }

    #[test]
    fn key_frame_predicate_false_for_empty_payload() {
        let msg = RtmpMessage::new(RtmpMessageType::VideoData, 0, 1, PooledBytes::new(Vec::new()));
        assert!(!msg.is_key_frame());
    }

    #[test]
    fn retain_shares_payload_and_bumps_refcount() {
        let msg = video_msg(0x17);
        let retained = msg.retain();
        assert_eq!(msg.payload.ref_count(), 2);
        assert_eq!(retained.payload.as_bytes(), msg.payload.as_bytes());
    }

    #[test]
    fn copy_is_independent_of_original() {
        let msg = video_msg(0x17);
        let copied = msg.copy();
        assert_eq!(msg.payload.ref_count(), 1);
        assert_eq!(copied.payload.ref_count(), 1);
    }
}
