//! A pure-rust implementation of the AMF0 encoder and decoder.
//!
//! AMF0 (Action Message Format, version 0) is the tagged-value serialization
//! format Adobe's RTMP command channel uses to carry `connect`/`publish`/`play`
//! arguments and `onStatus`/`onMetaData` payloads. This crate only implements
//! the subset of the format RTMP actually puts on the wire; it does not aim to
//! be a general-purpose Flash/AMF library.

mod define;
mod errors;
mod reader;
mod writer;

pub use define::{Amf0Marker, Amf0Object, Amf0StrictArray, Amf0Value};
pub use errors::{Amf0ReadError, Amf0WriteError};
pub use reader::Amf0Decoder;
pub use writer::Amf0Encoder;

#[cfg(test)]
mod tests;
