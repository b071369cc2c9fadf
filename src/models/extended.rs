//! Canonical Extended JSON helpers.
//!
//! Extended scalar types are represented as ordinary JSON objects using the
//! canonical Extended JSON v2 wrappers, so they survive a text round-trip
//! through the corpus unchanged:
//!
//! | Type      | Representation                                          |
//! |-----------|---------------------------------------------------------|
//! | Object id | `{"$oid": "<24 hex>"}`                                  |
//! | Date      | `{"$date": {"$numberLong": "<millis>"}}`                |
//! | Int64     | `{"$numberLong": "<digits>"}`                           |
//! | Binary    | `{"$binary": {"base64": "<data>", "subType": "<hex>"}}` |

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};

static OBJECT_ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A 12-byte document identifier: 4-byte timestamp, 5 random bytes, 3-byte counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Generates a new object id for the current time.
    pub fn new() -> Self {
        let mut bytes = [0u8; 12];
        let seconds = Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&uuid::Uuid::new_v4().as_bytes()[..5]);
        let counter = OBJECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Creates an object id from raw bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Parses a 24-character hex string.
    pub fn parse_str(hex: &str) -> Option<Self> {
        if hex.len() != 24 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 12];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }

    /// Reads an object id from its `{"$oid": ...}` wrapper.
    pub fn from_value(value: &JsonValue) -> Option<Self> {
        let object = value.as_object()?;
        if object.len() != 1 {
            return None;
        }
        Self::parse_str(object.get("$oid")?.as_str()?)
    }

    /// Returns the lowercase hex form.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<ObjectId> for JsonValue {
    fn from(id: ObjectId) -> Self {
        json!({ "$oid": id.to_hex() })
    }
}

/// Wraps a timestamp as a canonical 64-bit date.
pub fn date(at: DateTime<Utc>) -> JsonValue {
    json!({ "$date": { "$numberLong": at.timestamp_millis().to_string() } })
}

/// Reads a canonical 64-bit date.
pub fn parse_date(value: &JsonValue) -> Option<DateTime<Utc>> {
    let millis = value.get("$date")?.get("$numberLong")?.as_str()?;
    DateTime::from_timestamp_millis(millis.parse().ok()?)
}

/// Wraps a 64-bit integer so its full precision survives JSON.
pub fn number_long(value: i64) -> JsonValue {
    json!({ "$numberLong": value.to_string() })
}

/// Wraps binary data with its subtype.
pub fn binary(data: &[u8], sub_type: u8) -> JsonValue {
    json!({
        "$binary": {
            "base64": STANDARD.encode(data),
            "subType": format!("{:02x}", sub_type),
        }
    })
}

/// Reads binary data and its subtype.
pub fn parse_binary(value: &JsonValue) -> Option<(Vec<u8>, u8)> {
    let inner = value.get("$binary")?;
    let data = STANDARD.decode(inner.get("base64")?.as_str()?).ok()?;
    let sub_type = u8::from_str_radix(inner.get("subType")?.as_str()?, 16).ok()?;
    Some((data, sub_type))
}
