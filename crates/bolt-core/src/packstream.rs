//! PackStream — the self-describing binary value format underpinning Bolt.
//!
//! Encoding always picks the smallest marker family that fits a value;
//! decoding accepts any marker regardless of size and is the strict
//! inverse of encoding. Neither direction touches a socket — callers
//! hand this module whole buffers (see `bolt-connection::transport` for
//! the chunked-envelope layer that assembles those buffers from the wire).

use bytes::{BufMut, BytesMut};
use std::collections::HashMap;

use crate::error::CodecError;

/// Maximum field count a Structure's TINY_STRUCT marker can carry before
/// the encoder must fall back to the 8/16-bit length markers.
const TINY_MAX: usize = 15;

/// A single decoded PackStream value.
///
/// `Map` is a `HashMap` rather than an ordered association list: the
/// specification is explicit that insertion order is not part of Map
/// equivalence, and a `HashMap`'s derived `PartialEq` already compares
/// two maps as unordered key/value sets.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Bytes(Vec<u8>),
    String(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    Structure { signature: u8, fields: Vec<Value> },
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn map(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Map(entries.into_iter().collect())
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

// ── Markers ───────────────────────────────────────────────────────────────────

mod marker {
    pub const NULL: u8 = 0xC0;
    pub const FALSE: u8 = 0xC2;
    pub const TRUE: u8 = 0xC3;
    pub const FLOAT: u8 = 0xC1;
    pub const INT_8: u8 = 0xC8;
    pub const INT_16: u8 = 0xC9;
    pub const INT_32: u8 = 0xCA;
    pub const INT_64: u8 = 0xCB;
    pub const BYTES_8: u8 = 0xCC;
    pub const BYTES_16: u8 = 0xCD;
    pub const BYTES_32: u8 = 0xCE;
    pub const TINY_STRING: u8 = 0x80;
    pub const STRING_8: u8 = 0xD0;
    pub const STRING_16: u8 = 0xD1;
    pub const STRING_32: u8 = 0xD2;
    pub const TINY_LIST: u8 = 0x90;
    pub const LIST_8: u8 = 0xD4;
    pub const LIST_16: u8 = 0xD5;
    pub const LIST_32: u8 = 0xD6;
    pub const TINY_MAP: u8 = 0xA0;
    pub const MAP_8: u8 = 0xD8;
    pub const MAP_16: u8 = 0xD9;
    pub const MAP_32: u8 = 0xDA;
    pub const TINY_STRUCT: u8 = 0xB0;
    pub const STRUCT_8: u8 = 0xDC;
    pub const STRUCT_16: u8 = 0xDD;
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes `value` onto `out`, always choosing the smallest marker family
/// that fits. This is a hard requirement, not a nicety: reference servers
/// and the round-trip property in the spec both depend on it.
pub fn encode_value(value: &Value, out: &mut BytesMut) {
    match value {
        Value::Null => out.put_u8(marker::NULL),
        Value::Boolean(false) => out.put_u8(marker::FALSE),
        Value::Boolean(true) => out.put_u8(marker::TRUE),
        Value::Integer(i) => encode_integer(*i, out),
        Value::Float(f) => {
            out.put_u8(marker::FLOAT);
            out.put_f64(*f);
        }
        Value::Bytes(b) => encode_sized(b.len(), marker::BYTES_8, marker::BYTES_16, marker::BYTES_32, out, |out| out.put_slice(b)),
        Value::String(s) => encode_string(s, out),
        Value::List(items) => {
            encode_len_marker(items.len(), marker::TINY_LIST, marker::LIST_8, marker::LIST_16, marker::LIST_32, out);
            for item in items {
                encode_value(item, out);
            }
        }
        Value::Map(map) => {
            encode_len_marker(map.len(), marker::TINY_MAP, marker::MAP_8, marker::MAP_16, marker::MAP_32, out);
            for (k, v) in map {
                encode_string(k, out);
                encode_value(v, out);
            }
        }
        Value::Structure { signature, fields } => {
            encode_struct_header(fields.len(), out);
            out.put_u8(*signature);
            for field in fields {
                encode_value(field, out);
            }
        }
    }
}

fn encode_integer(i: i64, out: &mut BytesMut) {
    if (-16..=127).contains(&i) {
        out.put_i8(i as i8);
    } else if (i8::MIN as i64..=i8::MAX as i64).contains(&i) {
        out.put_u8(marker::INT_8);
        out.put_i8(i as i8);
    } else if (i16::MIN as i64..=i16::MAX as i64).contains(&i) {
        out.put_u8(marker::INT_16);
        out.put_i16(i as i16);
    } else if (i32::MIN as i64..=i32::MAX as i64).contains(&i) {
        out.put_u8(marker::INT_32);
        out.put_i32(i as i32);
    } else {
        out.put_u8(marker::INT_64);
        out.put_i64(i);
    }
}

fn encode_string(s: &str, out: &mut BytesMut) {
    let bytes = s.as_bytes();
    if bytes.len() <= TINY_MAX {
        out.put_u8(marker::TINY_STRING | bytes.len() as u8);
        out.put_slice(bytes);
    } else {
        encode_sized(bytes.len(), marker::STRING_8, marker::STRING_16, marker::STRING_32, out, |out| out.put_slice(bytes));
    }
}

fn encode_sized(
    len: usize,
    m8: u8,
    m16: u8,
    m32: u8,
    out: &mut BytesMut,
    write_payload: impl FnOnce(&mut BytesMut),
) {
    if len <= u8::MAX as usize {
        out.put_u8(m8);
        out.put_u8(len as u8);
    } else if len <= u16::MAX as usize {
        out.put_u8(m16);
        out.put_u16(len as u16);
    } else {
        out.put_u8(m32);
        out.put_u32(len as u32);
    }
    write_payload(out);
}

fn encode_len_marker(len: usize, tiny: u8, m8: u8, m16: u8, m32: u8, out: &mut BytesMut) {
    if len <= TINY_MAX {
        out.put_u8(tiny | len as u8);
    } else if len <= u8::MAX as usize {
        out.put_u8(m8);
        out.put_u8(len as u8);
    } else if len <= u16::MAX as usize {
        out.put_u8(m16);
        out.put_u16(len as u16);
    } else {
        out.put_u8(m32);
        out.put_u32(len as u32);
    }
}

fn encode_struct_header(len: usize, out: &mut BytesMut) {
    if len <= TINY_MAX {
        out.put_u8(marker::TINY_STRUCT | len as u8);
    } else if len <= u8::MAX as usize {
        out.put_u8(marker::STRUCT_8);
        out.put_u8(len as u8);
    } else {
        out.put_u8(marker::STRUCT_16);
        out.put_u16(len as u16);
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// A bounds-checked cursor over a decode buffer. Every read returns
/// `CodecError::UnexpectedEof` instead of panicking when the buffer runs
/// short — malformed input from the wire must never crash the driver.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof {
                needed: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn i8(&mut self) -> Result<i8, CodecError> {
        Ok(self.u8()? as i8)
    }

    fn i16(&mut self) -> Result<i16, CodecError> {
        Ok(i16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn f64(&mut self) -> Result<f64, CodecError> {
        Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }
}

/// Decodes exactly one value from `reader`. Any trailing bytes are left
/// untouched — callers decide whether a fully-consumed buffer was expected.
pub fn decode_value(reader: &mut Reader<'_>) -> Result<Value, CodecError> {
    let marker = reader.u8()?;
    decode_with_marker(marker, reader)
}

fn decode_with_marker(marker: u8, reader: &mut Reader<'_>) -> Result<Value, CodecError> {
    match marker {
        self::marker::NULL => Ok(Value::Null),
        self::marker::FALSE => Ok(Value::Boolean(false)),
        self::marker::TRUE => Ok(Value::Boolean(true)),
        self::marker::FLOAT => Ok(Value::Float(reader.f64()?)),
        self::marker::INT_8 => Ok(Value::Integer(reader.i8()? as i64)),
        self::marker::INT_16 => Ok(Value::Integer(reader.i16()? as i64)),
        self::marker::INT_32 => Ok(Value::Integer(reader.i32()? as i64)),
        self::marker::INT_64 => Ok(Value::Integer(reader.i64()?)),
        self::marker::BYTES_8 => {
            let len = reader.u8()? as usize;
            Ok(Value::Bytes(reader.take(len)?.to_vec()))
        }
        self::marker::BYTES_16 => {
            let len = reader.u16()? as usize;
            Ok(Value::Bytes(reader.take(len)?.to_vec()))
        }
        self::marker::BYTES_32 => {
            let len = reader.u32()? as usize;
            Ok(Value::Bytes(reader.take(len)?.to_vec()))
        }
        self::marker::STRING_8 => decode_string(reader.u8()? as usize, reader),
        self::marker::STRING_16 => decode_string(reader.u16()? as usize, reader),
        self::marker::STRING_32 => decode_string(reader.u32()? as usize, reader),
        self::marker::LIST_8 => decode_list(reader.u8()? as usize, reader),
        self::marker::LIST_16 => decode_list(reader.u16()? as usize, reader),
        self::marker::LIST_32 => decode_list(reader.u32()? as usize, reader),
        self::marker::MAP_8 => decode_map(reader.u8()? as usize, reader),
        self::marker::MAP_16 => decode_map(reader.u16()? as usize, reader),
        self::marker::MAP_32 => decode_map(reader.u32()? as usize, reader),
        self::marker::STRUCT_8 => decode_struct(reader.u8()? as usize, reader),
        self::marker::STRUCT_16 => decode_struct(reader.u16()? as usize, reader),
        // TINY families: top nibble identifies the family, bottom nibble/byte
        // (or bit for booleans, already handled above) carries the length.
        m if (0x80..=0x8F).contains(&m) => decode_string((m & 0x0F) as usize, reader),
        m if (0x90..=0x9F).contains(&m) => decode_list((m & 0x0F) as usize, reader),
        m if (0xA0..=0xAF).contains(&m) => decode_map((m & 0x0F) as usize, reader),
        m if (0xB0..=0xBF).contains(&m) => decode_struct((m & 0x0F) as usize, reader),
        // TINY_INT occupies two disjoint byte ranges: 0x00..=0x7F (0..127)
        // and 0xF0..=0xFF (-16..=-1). Everything else is an unassigned marker.
        m @ 0x00..=0x7F => Ok(Value::Integer(m as i64)),
        m @ 0xF0..=0xFF => Ok(Value::Integer(m as i8 as i64)),
        m => Err(CodecError::UnknownMarker(m)),
    }
}

fn decode_string(len: usize, reader: &mut Reader<'_>) -> Result<Value, CodecError> {
    let bytes = reader.take(len)?;
    let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
    Ok(Value::String(s.to_string()))
}

fn decode_list(len: usize, reader: &mut Reader<'_>) -> Result<Value, CodecError> {
    let mut items = Vec::with_capacity(len.min(4096));
    for _ in 0..len {
        items.push(decode_value(reader)?);
    }
    Ok(Value::List(items))
}

fn decode_map(len: usize, reader: &mut Reader<'_>) -> Result<Value, CodecError> {
    let mut map = HashMap::with_capacity(len.min(4096));
    for _ in 0..len {
        let key = match decode_value(reader)? {
            Value::String(s) => s,
            _ => return Err(CodecError::NonStringMapKey),
        };
        let value = decode_value(reader)?;
        map.insert(key, value);
    }
    Ok(Value::Map(map))
}

fn decode_struct(len: usize, reader: &mut Reader<'_>) -> Result<Value, CodecError> {
    let signature = reader.u8()?;
    let mut fields = Vec::with_capacity(len.min(64));
    for _ in 0..len {
        fields.push(decode_value(reader)?);
    }
    Ok(Value::Structure { signature, fields })
}
