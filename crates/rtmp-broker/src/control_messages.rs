//! Protocol control messages (`SET_CHUNK_SIZE`, `WINDOW_ACKNOWLEDGEMENT_SIZE`,
//! `SET_PEER_BANDWIDTH`) and user control events (`StreamBegin`, `StreamEOF`),
//! built as [`RtmpMessage`]s ready for [`ConnectionHandle::write`].
//! Chunk-stream framing of these messages is the transport's job, not this
//! crate's.

use byteorder::{BigEndian, WriteBytesExt};

use crate::buffer::RefCountedBuffer;
use crate::message::{RtmpMessage, RtmpMessageType};

/// `SET_PEER_BANDWIDTH` limit type byte. Only `Dynamic` is used by this
/// broker — `connect`'s response always sends limit type `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PeerBandwidthLimitType {
    Hard = 0,
    Soft = 1,
    Dynamic = 2,
}

/// `USER_CONTROL_MESSAGE` event codes this broker emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum UserControlEvent {
    StreamBegin = 0,
    StreamEof = 1,
}

pub fn set_chunk_size<B: RefCountedBuffer>(chunk_size: u32) -> RtmpMessage<B> {
    // The top bit is reserved and must be 0 (RTMP spec 5.4.1).
    let chunk_size = chunk_size & 0x7FFF_FFFF;
    RtmpMessage::new(RtmpMessageType::SetChunkSize, 0, 0, chunk_size.to_be_bytes().to_vec().into())
}

pub fn window_acknowledgement_size<B: RefCountedBuffer>(size: u32) -> RtmpMessage<B> {
    RtmpMessage::new(RtmpMessageType::WindowAcknowledgementSize, 0, 0, size.to_be_bytes().to_vec().into())
}

pub fn set_peer_bandwidth<B: RefCountedBuffer>(size: u32, limit_type: PeerBandwidthLimitType) -> RtmpMessage<B> {
    let mut body = Vec::with_capacity(5);
    body.write_u32::<BigEndian>(size).expect("write to Vec cannot fail");
    body.write_u8(limit_type as u8).expect("write to Vec cannot fail");
    RtmpMessage::new(RtmpMessageType::SetPeerBandwidth, 0, 0, body.into())
}

pub fn user_control_event<B: RefCountedBuffer>(event: UserControlEvent, stream_id: u32) -> RtmpMessage<B> {
    let mut body = Vec::with_capacity(6);
    body.write_u16::<BigEndian>(event as u16).expect("write to Vec cannot fail");
    body.write_u32::<BigEndian>(stream_id).expect("write to Vec cannot fail");
    RtmpMessage::new(RtmpMessageType::UserControlMessage, 0, 0, body.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PooledBytes;

    #[test]
    fn set_chunk_size_clears_reserved_bit() {
        let msg: RtmpMessage<PooledBytes> = set_chunk_size(0xFFFF_FFFF);
        assert_eq!(msg.payload.as_bytes(), &0x7FFF_FFFFu32.to_be_bytes());
    }

    #[test]
    fn window_ack_size_is_big_endian_u32() {
        let msg: RtmpMessage<PooledBytes> = window_acknowledgement_size(5_000_000);
        assert_eq!(msg.payload.as_bytes(), &5_000_000u32.to_be_bytes());
    }

    #[test]
    fn set_peer_bandwidth_appends_limit_type_byte() {
        let msg: RtmpMessage<PooledBytes> = set_peer_bandwidth(5_000_000, PeerBandwidthLimitType::Dynamic);
        let mut expected = 5_000_000u32.to_be_bytes().to_vec();
        expected.push(2);
        assert_eq!(msg.payload.as_bytes(), expected.as_slice());
    }

    #[test]
    fn user_control_event_layout_is_event_code_then_stream_id() {
        let msg: RtmpMessage<PooledBytes> = user_control_event(UserControlEvent::StreamEof, 1);
        let mut expected = 1u16.to_be_bytes().to_vec();
        expected.extend_from_slice(&1u32.to_be_bytes());
        assert_eq!(msg.payload.as_bytes(), expected.as_slice());
    }
}
