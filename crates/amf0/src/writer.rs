use byteorder::{BigEndian, WriteBytesExt};

use crate::define::{Amf0Marker, Amf0Value};
use crate::errors::Amf0WriteError;

/// Encodes AMF0 values onto a `Vec<u8>` (or any `std::io::Write`).
///
/// There is no `Amf0Encoder` value — every method is a free function taking
/// the writer explicitly, mirroring the teacher crate's writer modules where
/// encoding is a set of stateless functions rather than a stateful type.
pub struct Amf0Encoder;

impl Amf0Encoder {
    pub fn encode(writer: &mut impl std::io::Write, value: &Amf0Value<'_>) -> Result<(), Amf0WriteError> {
        match value {
            Amf0Value::Number(n) => Self::encode_number(writer, *n),
            Amf0Value::Boolean(b) => Self::encode_boolean(writer, *b),
            Amf0Value::String(s) => Self::encode_string(writer, s),
            Amf0Value::LongString(s) => Self::encode_long_string(writer, s),
            Amf0Value::Null => Self::encode_null(writer),
            Amf0Value::Undefined => Self::encode_undefined(writer),
            Amf0Value::Reference(idx) => Self::encode_reference(writer, *idx),
            Amf0Value::Object(pairs) => Self::encode_object(writer, pairs),
            Amf0Value::EcmaArray(pairs) => Self::encode_ecma_array(writer, pairs),
            Amf0Value::StrictArray(values) => Self::encode_strict_array(writer, values),
            Amf0Value::Date { unix_ms, timezone } => Self::encode_date(writer, *unix_ms, *timezone),
        }
    }

    pub fn encode_number(writer: &mut impl std::io::Write, n: f64) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::Number as u8)?;
        writer.write_f64::<BigEndian>(n)?;
        Ok(())
    }

    pub fn encode_boolean(writer: &mut impl std::io::Write, b: bool) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::Boolean as u8)?;
        writer.write_u8(b as u8)?;
        Ok(())
    }

    fn encode_short_str_body(writer: &mut impl std::io::Write, s: &str) -> Result<(), Amf0WriteError> {
        if s.len() > u16::MAX as usize {
            return Err(Amf0WriteError::StringTooLong { len: s.len() });
        }
        writer.write_u16::<BigEndian>(s.len() as u16)?;
        writer.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn encode_string(writer: &mut impl std::io::Write, s: &str) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::String as u8)?;
        Self::encode_short_str_body(writer, s)
    }

    pub fn encode_long_string(writer: &mut impl std::io::Write, s: &str) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::LongString as u8)?;
        writer.write_u32::<BigEndian>(s.len() as u32)?;
        writer.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn encode_null(writer: &mut impl std::io::Write) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::Null as u8)?;
        Ok(())
    }

    pub fn encode_undefined(writer: &mut impl std::io::Write) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::Undefined as u8)?;
        Ok(())
    }

    pub fn encode_reference(writer: &mut impl std::io::Write, index: u16) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::Reference as u8)?;
        writer.write_u16::<BigEndian>(index)?;
        Ok(())
    }

    fn encode_object_end(writer: &mut impl std::io::Write) -> Result<(), Amf0WriteError> {
        writer.write_u16::<BigEndian>(0)?;
        writer.write_u8(Amf0Marker::ObjectEnd as u8)?;
        Ok(())
    }

    pub fn encode_object(writer: &mut impl std::io::Write, pairs: &[(std::borrow::Cow<'_, str>, Amf0Value<'_>)]) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::Object as u8)?;
        for (key, value) in pairs {
            Self::encode_short_str_body(writer, key)?;
            Self::encode(writer, value)?;
        }
        Self::encode_object_end(writer)
    }

    pub fn encode_ecma_array(writer: &mut impl std::io::Write, pairs: &[(std::borrow::Cow<'_, str>, Amf0Value<'_>)]) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::EcmaArray as u8)?;
        writer.write_u32::<BigEndian>(pairs.len() as u32)?;
        for (key, value) in pairs {
            Self::encode_short_str_body(writer, key)?;
            Self::encode(writer, value)?;
        }
        Self::encode_object_end(writer)
    }

    pub fn encode_strict_array(writer: &mut impl std::io::Write, values: &[Amf0Value<'_>]) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::StrictArray as u8)?;
        writer.write_u32::<BigEndian>(values.len() as u32)?;
        for value in values {
            Self::encode(writer, value)?;
        }
        Ok(())
    }

    pub fn encode_date(writer: &mut impl std::io::Write, unix_ms: f64, timezone: i16) -> Result<(), Amf0WriteError> {
        writer.write_u8(Amf0Marker::Date as u8)?;
        writer.write_f64::<BigEndian>(unix_ms)?;
        writer.write_i16::<BigEndian>(timezone)?;
        Ok(())
    }
}
