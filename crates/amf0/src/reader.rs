use std::borrow::Cow;
use std::io::{Cursor, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};
use num_traits::FromPrimitive;

use crate::define::{Amf0Marker, Amf0Value};
use crate::errors::Amf0ReadError;

/// Decodes a sequence of AMF0 values out of a byte slice.
///
/// The decoder borrows from the input slice: strings and object keys are
/// returned as `Cow::Borrowed` where possible, so decoding a command payload
/// that will be discarded at the end of dispatch costs no allocations beyond
/// the `Vec`s used for object/array bodies.
pub struct Amf0Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Amf0Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(buf) }
    }

    fn is_empty(&self) -> bool {
        self.cursor.position() as usize >= self.cursor.get_ref().len()
    }

    fn remaining(&self) -> &'a [u8] {
        let pos = self.cursor.position() as usize;
        &self.cursor.get_ref()[pos..]
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Amf0ReadError> {
        let buf = self.remaining();
        if buf.len() < len {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        self.cursor.seek(SeekFrom::Current(len as i64))?;
        Ok(&buf[..len])
    }

    fn peek_marker(&mut self) -> Result<Amf0Marker, Amf0ReadError> {
        let pos = self.cursor.position();
        let marker = self.cursor.read_u8()?;
        self.cursor.seek(SeekFrom::Start(pos))?;
        Amf0Marker::from_u8(marker).ok_or(Amf0ReadError::UnknownMarker(marker))
    }

    /// Decodes every value remaining in the buffer. Consumes exactly
    /// `buf.len()` bytes or fails.
    pub fn decode_all(&mut self) -> Result<Vec<Amf0Value<'a>>, Amf0ReadError> {
        let mut values = Vec::new();
        while !self.is_empty() {
            values.push(self.decode_any()?);
        }
        Ok(values)
    }

    /// Decodes a single value, whatever its marker.
    pub fn decode_any(&mut self) -> Result<Amf0Value<'a>, Amf0ReadError> {
        let marker_byte = self.cursor.read_u8()?;
        let marker = Amf0Marker::from_u8(marker_byte).ok_or(Amf0ReadError::UnknownMarker(marker_byte))?;
        self.decode_value(marker)
    }

    /// Decodes a single value, failing unless its marker matches `expected`.
    pub fn decode_with_type(&mut self, expected: Amf0Marker) -> Result<Amf0Value<'a>, Amf0ReadError> {
        let actual = self.peek_marker()?;
        if actual != expected {
            return Err(Amf0ReadError::WrongType { expected, actual });
        }
        self.decode_any()
    }

    fn decode_value(&mut self, marker: Amf0Marker) -> Result<Amf0Value<'a>, Amf0ReadError> {
        match marker {
            Amf0Marker::Number => Ok(Amf0Value::Number(self.cursor.read_f64::<BigEndian>()?)),
            Amf0Marker::Boolean => Ok(Amf0Value::Boolean(self.cursor.read_u8()? != 0)),
            Amf0Marker::String => Ok(Amf0Value::String(Cow::Borrowed(self.read_short_str()?))),
            Amf0Marker::LongString => Ok(Amf0Value::LongString(Cow::Borrowed(self.read_long_str()?))),
            Amf0Marker::Null => Ok(Amf0Value::Null),
            Amf0Marker::Undefined => Ok(Amf0Value::Undefined),
            Amf0Marker::Reference => Ok(Amf0Value::Reference(self.cursor.read_u16::<BigEndian>()?)),
            Amf0Marker::Object => Ok(Amf0Value::Object(Cow::Owned(self.read_pairs()?))),
            Amf0Marker::EcmaArray => {
                // Associative count: advisory only, we read until the sentinel regardless.
                let _assoc_count = self.cursor.read_u32::<BigEndian>()?;
                Ok(Amf0Value::EcmaArray(Cow::Owned(self.read_pairs()?)))
            }
            Amf0Marker::StrictArray => {
                let len = self.cursor.read_u32::<BigEndian>()?;
                let mut values = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    values.push(self.decode_any()?);
                }
                Ok(Amf0Value::StrictArray(Cow::Owned(values)))
            }
            Amf0Marker::Date => {
                let unix_ms = self.cursor.read_f64::<BigEndian>()?;
                let timezone = self.cursor.read_i16::<BigEndian>()?;
                Ok(Amf0Value::Date { unix_ms, timezone })
            }
            Amf0Marker::ObjectEnd => Err(Amf0ReadError::UnsupportedMarker(marker)),
        }
    }

    fn read_short_str(&mut self) -> Result<&'a str, Amf0ReadError> {
        let len = self.cursor.read_u16::<BigEndian>()?;
        let bytes = self.take(len as usize)?;
        Ok(std::str::from_utf8(bytes)?)
    }

    fn read_long_str(&mut self) -> Result<&'a str, Amf0ReadError> {
        let len = self.cursor.read_u32::<BigEndian>()?;
        let bytes = self.take(len as usize)?;
        Ok(std::str::from_utf8(bytes)?)
    }

    /// Returns true and consumes the sentinel if the next 3 bytes are the
    /// empty-key + `ObjectEnd` marker sequence that terminates an
    /// `Object`/`EcmaArray` body.
    fn at_object_end(&mut self) -> Result<bool, Amf0ReadError> {
        if self.remaining().len() < 3 {
            return Ok(false);
        }
        let pos = self.cursor.position();
        let key_len = self.cursor.read_u16::<BigEndian>()?;
        if key_len == 0 {
            let marker = self.cursor.read_u8()?;
            if marker == Amf0Marker::ObjectEnd as u8 {
                return Ok(true);
            }
        }
        self.cursor.seek(SeekFrom::Start(pos))?;
        Ok(false)
    }

    fn read_pairs(&mut self) -> Result<Vec<(Cow<'a, str>, Amf0Value<'a>)>, Amf0ReadError> {
        let mut pairs = Vec::new();
        loop {
            if self.at_object_end()? {
                break;
            }
            let key = self.read_short_str()?;
            let value = self.decode_any()?;
            pairs.push((Cow::Borrowed(key), value));
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Amf0Encoder;

    #[test]
    fn decode_empty_buffer() {
        let buf = [];
        let mut decoder = Amf0Decoder::new(&buf);
        assert!(decoder.decode_all().unwrap().is_empty());
    }

    #[test]
    fn decode_number() {
        let buf = [0x00, 0x40, 0x09, 0x21, 0xFB, 0x54, 0x44, 0x2D, 0x18]; // pi
        let mut decoder = Amf0Decoder::new(&buf);
        let value = decoder.decode_any().unwrap();
        assert!((value.as_f64().unwrap() - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn wrong_type_is_rejected() {
        let mut buf = Vec::new();
        Amf0Encoder::encode_number(&mut buf, 1.0).unwrap();
        let mut decoder = Amf0Decoder::new(&buf);
        let err = decoder.decode_with_type(Amf0Marker::String).unwrap_err();
        assert!(matches!(err, Amf0ReadError::WrongType { .. }));
    }

    #[test]
    fn unknown_marker_fails() {
        let buf = [0xFF];
        let mut decoder = Amf0Decoder::new(&buf);
        assert!(matches!(decoder.decode_any(), Err(Amf0ReadError::UnknownMarker(0xFF))));
    }
}
