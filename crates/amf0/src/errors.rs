use thiserror::Error;

#[derive(Debug, Error)]
pub enum Amf0ReadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid utf8 string: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("unknown amf0 marker: {0:#x}")]
    UnknownMarker(u8),
    #[error("unsupported amf0 marker: {0:?}")]
    UnsupportedMarker(crate::Amf0Marker),
    #[error("expected marker {expected:?}, got {actual:?}")]
    WrongType {
        expected: crate::Amf0Marker,
        actual: crate::Amf0Marker,
    },
}

#[derive(Debug, Error)]
pub enum Amf0WriteError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("string of length {len} exceeds the u16 length prefix used by short strings")]
    StringTooLong { len: usize },
}
