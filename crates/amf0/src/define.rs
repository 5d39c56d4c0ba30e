use std::borrow::Cow;

use num_derive::FromPrimitive;

/// The marker byte that precedes every AMF0-encoded value on the wire.
///
/// See the Adobe AMF0 spec, section 2.1, for the canonical list. We only
/// decode/encode the markers RTMP actually uses; anything else is rejected by
/// [`crate::Amf0Decoder`] as [`crate::Amf0ReadError::UnknownMarker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum Amf0Marker {
    Number = 0x00,
    Boolean = 0x01,
    String = 0x02,
    Object = 0x03,
    // MovieClip = 0x04, not implemented, reserved, not used by RTMP
    Null = 0x05,
    Undefined = 0x06,
    Reference = 0x07,
    EcmaArray = 0x08,
    ObjectEnd = 0x09,
    StrictArray = 0x0A,
    Date = 0x0B,
    LongString = 0x0C,
    // Unsupported = 0x0D, not implemented
    // RecordSet = 0x0E, not implemented
    // XmlDocument = 0x0F, not implemented
    // TypedObject = 0x10, not implemented
    // Avmplus = 0x11, not implemented (AMF3 switch-over marker)
}

/// An AMF0 `Object`/`EcmaArray` body: an insertion-order-preserving list of
/// key/value pairs. A `HashMap` would silently reorder keys on round-trip,
/// which real encoders (and this crate's own round-trip tests) don't
/// tolerate.
pub type Amf0Object<'a> = Cow<'a, [(Cow<'a, str>, Amf0Value<'a>)]>;

/// An AMF0 `StrictArray` body.
pub type Amf0StrictArray<'a> = Cow<'a, [Amf0Value<'a>]>;

/// A single AMF0-encoded value.
///
/// `Object` and `EcmaArray` are kept as two variants (rather than collapsed
/// into one) because they carry different on-wire framing (`EcmaArray` has a
/// leading associative-count `u32`) even though they decode to the same
/// logical shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Amf0Value<'a> {
    Number(f64),
    Boolean(bool),
    String(Cow<'a, str>),
    Object(Amf0Object<'a>),
    Null,
    Undefined,
    /// `u16` reference index into the AMF0 object/array table. RTMP command
    /// payloads never populate this table in practice; we decode/encode the
    /// marker faithfully without maintaining a reference table.
    Reference(u16),
    EcmaArray(Amf0Object<'a>),
    StrictArray(Amf0StrictArray<'a>),
    /// Milliseconds since epoch, plus a timezone offset in minutes that the
    /// spec says must always be `0` and that readers must ignore.
    Date { unix_ms: f64, timezone: i16 },
    LongString(Cow<'a, str>),
}

impl<'a> Amf0Value<'a> {
    /// Clones into a value with no borrowed data, so it can outlive the
    /// buffer it was decoded from (used when caching `onMetaData` on a
    /// publisher session).
    pub fn into_owned(self) -> Amf0Value<'static> {
        match self {
            Amf0Value::Number(n) => Amf0Value::Number(n),
            Amf0Value::Boolean(b) => Amf0Value::Boolean(b),
            Amf0Value::String(s) => Amf0Value::String(Cow::Owned(s.into_owned())),
            Amf0Value::Object(o) => Amf0Value::Object(Cow::Owned(owned_pairs(o))),
            Amf0Value::Null => Amf0Value::Null,
            Amf0Value::Undefined => Amf0Value::Undefined,
            Amf0Value::Reference(r) => Amf0Value::Reference(r),
            Amf0Value::EcmaArray(o) => Amf0Value::EcmaArray(Cow::Owned(owned_pairs(o))),
            Amf0Value::StrictArray(a) => {
                Amf0Value::StrictArray(Cow::Owned(a.into_owned().into_iter().map(Amf0Value::into_owned).collect()))
            }
            Amf0Value::Date { unix_ms, timezone } => Amf0Value::Date { unix_ms, timezone },
            Amf0Value::LongString(s) => Amf0Value::LongString(Cow::Owned(s.into_owned())),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Amf0Value::String(s) | Amf0Value::LongString(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Amf0Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Amf0Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(Cow<'a, str>, Amf0Value<'a>)]> {
        match self {
            Amf0Value::Object(o) | Amf0Value::EcmaArray(o) => Some(o),
            _ => None,
        }
    }

    /// Looks up a key in an `Object`/`EcmaArray` value. Returns `None` both
    /// when `self` isn't an object and when the key is absent.
    pub fn get(&self, key: &str) -> Option<&Amf0Value<'a>> {
        self.as_object()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

fn owned_pairs(pairs: Amf0Object<'_>) -> Vec<(Cow<'static, str>, Amf0Value<'static>)> {
    pairs
        .into_owned()
        .into_iter()
        .map(|(k, v)| (Cow::Owned(k.into_owned()), v.into_owned()))
        .collect()
}
