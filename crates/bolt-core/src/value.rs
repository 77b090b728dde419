//! Domain value types — graph entities and temporal/spatial values that
//! ride inside PackStream Structures.
//!
//! Each type knows its own structure signature and how to build itself
//! from (or flatten itself into) a `Structure` field list. The message
//! catalog (`crate::message`) decides *when* a structure is expected to
//! be one of these; this module only knows how to translate once that
//! decision has been made.

use std::collections::HashMap;

use crate::error::ProtocolError;
use crate::packstream::Value;

/// Structure signature bytes for domain entities, as assigned by Bolt.
pub mod signature {
    pub const NODE: u8 = 0x4E; // 'N'
    pub const RELATIONSHIP: u8 = 0x52; // 'R'
    pub const UNBOUND_RELATIONSHIP: u8 = 0x72; // 'r'
    pub const PATH: u8 = 0x50; // 'P'
    pub const POINT_2D: u8 = 0x58; // 'X'
    pub const POINT_3D: u8 = 0x59; // 'Y'
    pub const DATE: u8 = 0x44; // 'D'
    pub const TIME: u8 = 0x54; // 'T'
    pub const LOCAL_TIME: u8 = 0x74; // 't'
    pub const DURATION: u8 = 0x45; // 'E'
    pub const LOCAL_DATE_TIME: u8 = 0x64; // 'd'
    /// Legacy (pre-5.0) DateTime with a UTC offset in seconds.
    pub const DATE_TIME_OFFSET_LEGACY: u8 = 0x46; // 'F'
    /// Legacy (pre-5.0) DateTime with a named time zone.
    pub const DATE_TIME_ZONE_ID_LEGACY: u8 = 0x66; // 'f'
    /// v5+ UTC-preferring DateTime with a UTC offset in seconds.
    pub const DATE_TIME_OFFSET_UTC: u8 = 0x49; // 'I'
    /// v5+ UTC-preferring DateTime with a named time zone.
    pub const DATE_TIME_ZONE_ID_UTC: u8 = 0x69; // 'i'
}

fn expect_struct(value: Value, expected_sig: u8) -> Result<Vec<Value>, ProtocolError> {
    match value {
        Value::Structure { signature, fields } if signature == expected_sig => Ok(fields),
        Value::Structure { signature, .. } => Err(ProtocolError::UnknownSignature(signature)),
        _ => Err(ProtocolError::NotAStructure),
    }
}

fn field(fields: &mut std::vec::IntoIter<Value>) -> Result<Value, ProtocolError> {
    fields
        .next()
        .ok_or_else(|| ProtocolError::MalformedValue("missing field".into()))
}

fn as_i64(v: Value) -> Result<i64, ProtocolError> {
    v.as_integer()
        .ok_or_else(|| ProtocolError::MalformedValue("expected an Integer".into()))
}

fn as_f64(v: Value) -> Result<f64, ProtocolError> {
    match v {
        Value::Float(f) => Ok(f),
        Value::Integer(i) => Ok(i as f64),
        _ => Err(ProtocolError::MalformedValue("expected a Float".into())),
    }
}

fn as_string(v: Value) -> Result<String, ProtocolError> {
    match v {
        Value::String(s) => Ok(s),
        _ => Err(ProtocolError::MalformedValue("expected a String".into())),
    }
}

fn as_string_list(v: Value) -> Result<Vec<String>, ProtocolError> {
    match v {
        Value::List(items) => items.into_iter().map(as_string).collect(),
        _ => Err(ProtocolError::MalformedValue("expected a List".into())),
    }
}

fn as_map(v: Value) -> Result<HashMap<String, Value>, ProtocolError> {
    match v {
        Value::Map(m) => Ok(m),
        _ => Err(ProtocolError::MalformedValue("expected a Map".into())),
    }
}

fn as_optional_string(v: Value) -> Result<Option<String>, ProtocolError> {
    match v {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        _ => Err(ProtocolError::MalformedValue("expected a String or null".into())),
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    pub labels: Vec<String>,
    pub properties: HashMap<String, Value>,
    /// Present from Bolt 5.0 onward; `None` on earlier negotiated versions.
    pub element_id: Option<String>,
}

impl Node {
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let fields = expect_struct(value, signature::NODE)?;
        let mut it = fields.into_iter();
        let id = as_i64(field(&mut it)?)?;
        let labels = as_string_list(field(&mut it)?)?;
        let properties = as_map(field(&mut it)?)?;
        let element_id = match it.next() {
            Some(v) => as_optional_string(v)?,
            None => None,
        };
        Ok(Node {
            id,
            labels,
            properties,
            element_id,
        })
    }

    pub fn into_value(self) -> Value {
        let mut fields = vec![
            Value::Integer(self.id),
            Value::List(self.labels.into_iter().map(Value::String).collect()),
            Value::Map(self.properties),
        ];
        if let Some(eid) = self.element_id {
            fields.push(Value::String(eid));
        }
        Value::Structure {
            signature: signature::NODE,
            fields,
        }
    }
}

// ── Relationship ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: i64,
    pub start_id: i64,
    pub end_id: i64,
    pub rel_type: String,
    pub properties: HashMap<String, Value>,
    pub element_id: Option<String>,
    pub start_element_id: Option<String>,
    pub end_element_id: Option<String>,
}

impl Relationship {
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let fields = expect_struct(value, signature::RELATIONSHIP)?;
        let mut it = fields.into_iter();
        let id = as_i64(field(&mut it)?)?;
        let start_id = as_i64(field(&mut it)?)?;
        let end_id = as_i64(field(&mut it)?)?;
        let rel_type = as_string(field(&mut it)?)?;
        let properties = as_map(field(&mut it)?)?;
        let element_id = it.next().map(as_optional_string).transpose()?.flatten();
        let start_element_id = it.next().map(as_optional_string).transpose()?.flatten();
        let end_element_id = it.next().map(as_optional_string).transpose()?.flatten();
        Ok(Relationship {
            id,
            start_id,
            end_id,
            rel_type,
            properties,
            element_id,
            start_element_id,
            end_element_id,
        })
    }

    pub fn into_value(self) -> Value {
        let mut fields = vec![
            Value::Integer(self.id),
            Value::Integer(self.start_id),
            Value::Integer(self.end_id),
            Value::String(self.rel_type),
            Value::Map(self.properties),
        ];
        if let Some(v) = self.element_id {
            fields.push(Value::String(v));
        }
        if let Some(v) = self.start_element_id {
            fields.push(Value::String(v));
        }
        if let Some(v) = self.end_element_id {
            fields.push(Value::String(v));
        }
        Value::Structure {
            signature: signature::RELATIONSHIP,
            fields,
        }
    }
}

// ── UnboundRelationship ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct UnboundRelationship {
    pub id: i64,
    pub rel_type: String,
    pub properties: HashMap<String, Value>,
    pub element_id: Option<String>,
}

impl UnboundRelationship {
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let fields = expect_struct(value, signature::UNBOUND_RELATIONSHIP)?;
        let mut it = fields.into_iter();
        let id = as_i64(field(&mut it)?)?;
        let rel_type = as_string(field(&mut it)?)?;
        let properties = as_map(field(&mut it)?)?;
        let element_id = it.next().map(as_optional_string).transpose()?.flatten();
        Ok(UnboundRelationship {
            id,
            rel_type,
            properties,
            element_id,
        })
    }

    pub fn into_value(self) -> Value {
        let mut fields = vec![
            Value::Integer(self.id),
            Value::String(self.rel_type),
            Value::Map(self.properties),
        ];
        if let Some(v) = self.element_id {
            fields.push(Value::String(v));
        }
        Value::Structure {
            signature: signature::UNBOUND_RELATIONSHIP,
            fields,
        }
    }
}

// ── Path ──────────────────────────────────────────────────────────────────────

/// A graph path: alternating nodes and relationships.
///
/// `sequence` alternates `(rel_index, node_index)` pairs; the sign of
/// `rel_index` encodes traversal direction (negative = traversed against
/// the relationship's natural direction). Indices are 1-based into
/// `relationships`/`nodes` per the Bolt wire encoding — `0` is never a
/// valid index since `nodes[0]` is always the path's start node and is
/// implicit, not indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub nodes: Vec<Node>,
    pub relationships: Vec<UnboundRelationship>,
    pub sequence: Vec<i64>,
}

impl Path {
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let fields = expect_struct(value, signature::PATH)?;
        let mut it = fields.into_iter();
        let nodes = match field(&mut it)? {
            Value::List(items) => items
                .into_iter()
                .map(Node::decode)
                .collect::<Result<Vec<_>, _>>()?,
            _ => {
                return Err(ProtocolError::MalformedValue("expected a List".into()))
            }
        };
        let relationships = match field(&mut it)? {
            Value::List(items) => items
                .into_iter()
                .map(UnboundRelationship::decode)
                .collect::<Result<Vec<_>, _>>()?,
            _ => {
                return Err(ProtocolError::MalformedValue("expected a List".into()))
            }
        };
        let sequence = match field(&mut it)? {
            Value::List(items) => items.into_iter().map(as_i64).collect::<Result<_, _>>()?,
            _ => {
                return Err(ProtocolError::MalformedValue("expected a List".into()))
            }
        };
        Ok(Path {
            nodes,
            relationships,
            sequence,
        })
    }

    pub fn into_value(self) -> Value {
        Value::Structure {
            signature: signature::PATH,
            fields: vec![
                Value::List(self.nodes.into_iter().map(Node::into_value).collect()),
                Value::List(
                    self.relationships
                        .into_iter()
                        .map(UnboundRelationship::into_value)
                        .collect(),
                ),
                Value::List(self.sequence.into_iter().map(Value::Integer).collect()),
            ],
        }
    }
}

// ── Point ─────────────────────────────────────────────────────────────────────

/// Coordinate reference system, derived from `srid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    Wgs84,
    Wgs843D,
    Cartesian,
    Cartesian3D,
    Unknown(i32),
}

impl Crs {
    pub fn from_srid(srid: i32) -> Self {
        match srid {
            4326 => Crs::Wgs84,
            4979 => Crs::Wgs843D,
            7203 => Crs::Cartesian,
            9157 => Crs::Cartesian3D,
            other => Crs::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub srid: i32,
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Point {
    pub fn crs(&self) -> Crs {
        Crs::from_srid(self.srid)
    }

    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        match value {
            Value::Structure { signature, fields } if signature == signature::POINT_2D => {
                let mut it = fields.into_iter();
                let srid = as_i64(field(&mut it)?)? as i32;
                let x = as_f64(field(&mut it)?)?;
                let y = as_f64(field(&mut it)?)?;
                Ok(Point { srid, x, y, z: None })
            }
            Value::Structure { signature, fields } if signature == signature::POINT_3D => {
                let mut it = fields.into_iter();
                let srid = as_i64(field(&mut it)?)? as i32;
                let x = as_f64(field(&mut it)?)?;
                let y = as_f64(field(&mut it)?)?;
                let z = as_f64(field(&mut it)?)?;
                Ok(Point {
                    srid,
                    x,
                    y,
                    z: Some(z),
                })
            }
            _ => Err(ProtocolError::MalformedValue("unrecognized structure shape".into())),
        }
    }

    pub fn into_value(self) -> Value {
        match self.z {
            None => Value::Structure {
                signature: signature::POINT_2D,
                fields: vec![
                    Value::Integer(self.srid as i64),
                    Value::Float(self.x),
                    Value::Float(self.y),
                ],
            },
            Some(z) => Value::Structure {
                signature: signature::POINT_3D,
                fields: vec![
                    Value::Integer(self.srid as i64),
                    Value::Float(self.x),
                    Value::Float(self.y),
                    Value::Float(z),
                ],
            },
        }
    }
}

// ── Temporal types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duration {
    pub months: i64,
    pub days: i64,
    pub seconds: i64,
    pub nanoseconds: i64,
}

impl Duration {
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let fields = expect_struct(value, signature::DURATION)?;
        let mut it = fields.into_iter();
        Ok(Duration {
            months: as_i64(field(&mut it)?)?,
            days: as_i64(field(&mut it)?)?,
            seconds: as_i64(field(&mut it)?)?,
            nanoseconds: as_i64(field(&mut it)?)?,
        })
    }

    pub fn into_value(self) -> Value {
        Value::Structure {
            signature: signature::DURATION,
            fields: vec![
                Value::Integer(self.months),
                Value::Integer(self.days),
                Value::Integer(self.seconds),
                Value::Integer(self.nanoseconds),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub days_since_epoch: i64,
}

impl Date {
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let fields = expect_struct(value, signature::DATE)?;
        let mut it = fields.into_iter();
        Ok(Date {
            days_since_epoch: as_i64(field(&mut it)?)?,
        })
    }

    pub fn into_value(self) -> Value {
        Value::Structure {
            signature: signature::DATE,
            fields: vec![Value::Integer(self.days_since_epoch)],
        }
    }

    /// Convenience conversion only — the wire representation (days since
    /// the Unix epoch) remains the canonical form the codec round-trips.
    pub fn to_chrono(self) -> Option<chrono::NaiveDate> {
        chrono::NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(chrono::Duration::days(self.days_since_epoch))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub nanoseconds_of_day: i64,
    pub tz_offset_seconds: i32,
}

impl Time {
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let fields = expect_struct(value, signature::TIME)?;
        let mut it = fields.into_iter();
        Ok(Time {
            nanoseconds_of_day: as_i64(field(&mut it)?)?,
            tz_offset_seconds: as_i64(field(&mut it)?)? as i32,
        })
    }

    pub fn into_value(self) -> Value {
        Value::Structure {
            signature: signature::TIME,
            fields: vec![
                Value::Integer(self.nanoseconds_of_day),
                Value::Integer(self.tz_offset_seconds as i64),
            ],
        }
    }

    /// Convenience conversion only — the wire representation remains the
    /// canonical form the codec round-trips.
    pub fn to_chrono(self) -> Option<(chrono::NaiveTime, chrono::FixedOffset)> {
        let time = chrono::NaiveTime::from_num_seconds_from_midnight_opt(
            (self.nanoseconds_of_day / 1_000_000_000) as u32,
            (self.nanoseconds_of_day % 1_000_000_000) as u32,
        )?;
        let offset = chrono::FixedOffset::east_opt(self.tz_offset_seconds)?;
        Some((time, offset))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub nanoseconds_of_day: i64,
}

impl LocalTime {
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let fields = expect_struct(value, signature::LOCAL_TIME)?;
        let mut it = fields.into_iter();
        Ok(LocalTime {
            nanoseconds_of_day: as_i64(field(&mut it)?)?,
        })
    }

    pub fn into_value(self) -> Value {
        Value::Structure {
            signature: signature::LOCAL_TIME,
            fields: vec![Value::Integer(self.nanoseconds_of_day)],
        }
    }

    /// Convenience conversion only — the wire representation remains the
    /// canonical form the codec round-trips.
    pub fn to_chrono(self) -> Option<chrono::NaiveTime> {
        chrono::NaiveTime::from_num_seconds_from_midnight_opt(
            (self.nanoseconds_of_day / 1_000_000_000) as u32,
            (self.nanoseconds_of_day % 1_000_000_000) as u32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDateTime {
    pub seconds: i64,
    pub nanoseconds: i64,
}

impl LocalDateTime {
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let fields = expect_struct(value, signature::LOCAL_DATE_TIME)?;
        let mut it = fields.into_iter();
        Ok(LocalDateTime {
            seconds: as_i64(field(&mut it)?)?,
            nanoseconds: as_i64(field(&mut it)?)?,
        })
    }

    pub fn into_value(self) -> Value {
        Value::Structure {
            signature: signature::LOCAL_DATE_TIME,
            fields: vec![Value::Integer(self.seconds), Value::Integer(self.nanoseconds)],
        }
    }

    /// Convenience conversion only — the wire representation remains the
    /// canonical form the codec round-trips. `self.seconds` is wall-clock
    /// seconds with no zone attached, so it's read here as if it were a
    /// Unix timestamp to recover the same year/month/day/h/m/s fields.
    pub fn to_chrono(self) -> Option<chrono::NaiveDateTime> {
        Some(chrono::DateTime::from_timestamp(self.seconds, self.nanoseconds as u32)?.naive_utc())
    }
}

/// Where a DateTime's zone information comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Zone {
    Offset(i32),
    Id(String),
}

/// A zoned date-time. `utc_preferred` distinguishes the v5+ structure
/// signatures (seconds are UTC) from the legacy ones (seconds are local) —
/// decoders must tell these apart by signature byte, never by value shape.
#[derive(Debug, Clone, PartialEq)]
pub struct DateTime {
    pub seconds: i64,
    pub nanoseconds: i64,
    pub zone: Zone,
    pub utc_preferred: bool,
}

impl DateTime {
    pub fn decode(value: Value) -> Result<Self, ProtocolError> {
        let (sig, fields) = match value {
            Value::Structure { signature, fields } => (signature, fields),
            _ => return Err(ProtocolError::NotAStructure),
        };
        let mut it = fields.into_iter();
        let seconds = as_i64(field(&mut it)?)?;
        let nanoseconds = as_i64(field(&mut it)?)?;
        let zone_field = field(&mut it)?;
        match sig {
            self::signature::DATE_TIME_OFFSET_LEGACY => Ok(DateTime {
                seconds,
                nanoseconds,
                zone: Zone::Offset(as_i64(zone_field)? as i32),
                utc_preferred: false,
            }),
            self::signature::DATE_TIME_OFFSET_UTC => Ok(DateTime {
                seconds,
                nanoseconds,
                zone: Zone::Offset(as_i64(zone_field)? as i32),
                utc_preferred: true,
            }),
            self::signature::DATE_TIME_ZONE_ID_LEGACY => Ok(DateTime {
                seconds,
                nanoseconds,
                zone: Zone::Id(as_string(zone_field)?),
                utc_preferred: false,
            }),
            self::signature::DATE_TIME_ZONE_ID_UTC => Ok(DateTime {
                seconds,
                nanoseconds,
                zone: Zone::Id(as_string(zone_field)?),
                utc_preferred: true,
            }),
            other => Err(ProtocolError::UnknownSignature(other)),
        }
    }

    pub fn into_value(self) -> Value {
        let sig = match (&self.zone, self.utc_preferred) {
            (Zone::Offset(_), false) => signature::DATE_TIME_OFFSET_LEGACY,
            (Zone::Offset(_), true) => signature::DATE_TIME_OFFSET_UTC,
            (Zone::Id(_), false) => signature::DATE_TIME_ZONE_ID_LEGACY,
            (Zone::Id(_), true) => signature::DATE_TIME_ZONE_ID_UTC,
        };
        let zone_field = match self.zone {
            Zone::Offset(off) => Value::Integer(off as i64),
            Zone::Id(id) => Value::String(id),
        };
        Value::Structure {
            signature: sig,
            fields: vec![
                Value::Integer(self.seconds),
                Value::Integer(self.nanoseconds),
                zone_field,
            ],
        }
    }

    /// The UTC instant this represents, when the zone is a fixed offset.
    /// Convenience only — see module docs; returns `None` for a
    /// named-zone `DateTime` (use [`DateTime::to_chrono_tz`] instead).
    pub fn to_chrono_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let offset_seconds = match self.zone {
            Zone::Offset(off) => off as i64,
            Zone::Id(_) => return None,
        };
        let utc_seconds = if self.utc_preferred {
            self.seconds
        } else {
            self.seconds - offset_seconds
        };
        chrono::DateTime::from_timestamp(utc_seconds, self.nanoseconds as u32)
    }

    /// The same instant resolved against its named IANA zone. Convenience
    /// only — see module docs; returns `None` for a fixed-offset
    /// `DateTime` (use [`DateTime::to_chrono_utc`] instead) or an
    /// unrecognized zone id.
    pub fn to_chrono_tz(&self) -> Option<chrono::DateTime<chrono_tz::Tz>> {
        use chrono::TimeZone;
        let id = match &self.zone {
            Zone::Id(id) => id,
            Zone::Offset(_) => return None,
        };
        let tz: chrono_tz::Tz = id.parse().ok()?;
        if self.utc_preferred {
            let utc = chrono::DateTime::from_timestamp(self.seconds, self.nanoseconds as u32)?;
            Some(utc.with_timezone(&tz))
        } else {
            let naive =
                chrono::DateTime::from_timestamp(self.seconds, self.nanoseconds as u32)?.naive_utc();
            tz.from_local_datetime(&naive).single()
        }
    }
}
