//! BSON document model.
//!
//! This module provides [`Document`], an ordered map of keys to [`Bson`]
//! values, and the supporting leaf types [`ObjectId`] and [`Timestamp`].
//!
//! BSON has no native array type on the wire: an array is a document whose
//! keys are `"0"`, `"1"`, ... in order, carried under a different type tag.
//! [`Bson::SubArray`] therefore holds a [`Document`] too, and keeps whatever
//! keys the bytes contained. The decoder looks at those keys, not at the tag,
//! when it decides whether a node is positional.
//!
//! ## Examples
//!
//! ```rust
//! use ndbson::{Bson, Document};
//!
//! let mut doc = Document::new();
//! doc.insert("name", Bson::from("sensor"));
//! doc.insert("gain", Bson::from(1.5));
//! doc.insert("taps", Bson::array(vec![Bson::from(1), Bson::from(2)]));
//!
//! assert_eq!(doc.len(), 3);
//! assert_eq!(doc.get("name").and_then(|v| v.as_str()), Some("sensor"));
//! assert!(doc.get("taps").unwrap().as_array().unwrap().is_array_keyed());
//! ```

use crate::mapping::ElementType;
use crate::{Error, Result};
use chrono::{TimeZone, Utc};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An ordered map of string keys to BSON values.
///
/// A thin wrapper around [`IndexMap`] that keeps insertion order, which BSON
/// requires: field order is part of the document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document(IndexMap<String, Bson>);

impl Document {
    /// Creates an empty `Document`.
    #[must_use]
    pub fn new() -> Self {
        Document(IndexMap::new())
    }

    /// Creates an empty `Document` with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Document(IndexMap::with_capacity(capacity))
    }

    /// Builds an array-keyed document (`"0"`, `"1"`, ...) from a sequence of values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndbson::{Bson, Document};
    ///
    /// let doc = Document::from_array(vec![Bson::from(true), Bson::Null]);
    /// let keys: Vec<_> = doc.keys().cloned().collect();
    /// assert_eq!(keys, vec!["0", "1"]);
    /// ```
    pub fn from_array<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Bson>,
    {
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect()
    }

    /// Inserts a key-value pair, returning the previous value for the key.
    ///
    /// A replaced key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: Bson) -> Option<Bson> {
        self.0.insert(key.into(), value)
    }

    /// Returns a reference to the value corresponding to the key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Bson> {
        self.0.get(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Bson> {
        self.0.get_mut(key)
    }

    /// Returns `true` if the document contains the key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the document has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` when the keys are exactly `"0"`, `"1"`, ..., `"n-1"` in order.
    ///
    /// An empty document is trivially array-keyed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndbson::{Bson, Document};
    ///
    /// let mut doc = Document::new();
    /// doc.insert("0", Bson::Null);
    /// doc.insert("2", Bson::Null);
    /// assert!(!doc.is_array_keyed());
    /// ```
    #[must_use]
    pub fn is_array_keyed(&self) -> bool {
        self.0
            .keys()
            .enumerate()
            .all(|(i, key)| is_index_key(key, i))
    }

    /// Returns an iterator over the keys, in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, Bson> {
        self.0.keys()
    }

    /// Returns an iterator over the values, in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, String, Bson> {
        self.0.values()
    }

    /// Returns an iterator over the key-value pairs, in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Bson> {
        self.0.iter()
    }
}

/// Returns `true` if `key` is the canonical decimal rendering of `index`.
pub(crate) fn is_index_key(key: &str, index: usize) -> bool {
    let bytes = key.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    key.parse::<usize>().map_or(false, |n| n == index)
}

impl IntoIterator for Document {
    type Item = (String, Bson);
    type IntoIter = indexmap::map::IntoIter<String, Bson>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Bson);
    type IntoIter = indexmap::map::Iter<'a, String, Bson>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, Bson)> for Document {
    fn from_iter<T: IntoIterator<Item = (String, Bson)>>(iter: T) -> Self {
        Document(IndexMap::from_iter(iter))
    }
}

/// A 12-byte BSON object identifier, rendered as 24 lowercase hex characters.
///
/// # Examples
///
/// ```rust
/// use ndbson::ObjectId;
///
/// let oid: ObjectId = "507f1f77bcf86cd799439011".parse().unwrap();
/// assert_eq!(oid.to_hex(), "507f1f77bcf86cd799439011");
/// assert!("507f1f77".parse::<ObjectId>().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Wraps raw identifier bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    /// Returns the raw identifier bytes.
    #[must_use]
    pub const fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Parses 24 hex characters.
    pub fn parse_str(s: &str) -> Result<Self> {
        if s.len() != 24 {
            return Err(Error::custom(format!(
                "object id must be 24 hex characters, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| Error::custom(format!("invalid object id '{}': {}", s, e)))?;
        Ok(ObjectId(bytes))
    }

    /// Renders the identifier as 24 lowercase hex characters.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns `true` if `s` is exactly what [`ObjectId::to_hex`] renders:
    /// 24 lowercase hex characters.
    #[must_use]
    pub fn is_valid_hex(s: &str) -> bool {
        s.len() == 24 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ObjectId::parse_str(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The internal BSON timestamp: seconds since the epoch plus an ordinal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub time: u32,
    pub increment: u32,
}

/// A single BSON value.
///
/// Covers the full standard tag set. The encoder only emits the subset listed
/// in [`ElementType`]'s documentation; the rest are accepted from foreign
/// documents.
#[derive(Clone, Debug, PartialEq)]
pub enum Bson {
    Double(f64),
    Str(String),
    SubDocument(Document),
    SubArray(Document),
    Binary { subtype: u8, bytes: Vec<u8> },
    Undefined,
    ObjectId(ObjectId),
    Bool(bool),
    /// Signed count of [`DateUnit`](crate::DateUnit)s since the Unix epoch.
    DateTime(i64),
    Null,
    Regex { pattern: String, options: String },
    DbPointer { namespace: String, id: ObjectId },
    Code(String),
    Symbol(String),
    CodeWithScope { code: String, scope: Document },
    Int32(i32),
    Timestamp(Timestamp),
    Int64(i64),
    Decimal128([u8; 16]),
    MinKey,
    MaxKey,
}

impl Bson {
    /// Builds an array value with canonical keys.
    pub fn array<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Bson>,
    {
        Bson::SubArray(Document::from_array(values))
    }

    /// Builds a generic (subtype 0x00) binary value.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Bson::Binary {
            subtype: 0x00,
            bytes: bytes.into(),
        }
    }

    /// Returns the wire type of this value.
    #[must_use]
    pub const fn element_type(&self) -> ElementType {
        match self {
            Bson::Double(_) => ElementType::Double,
            Bson::Str(_) => ElementType::String,
            Bson::SubDocument(_) => ElementType::Document,
            Bson::SubArray(_) => ElementType::Array,
            Bson::Binary { .. } => ElementType::Binary,
            Bson::Undefined => ElementType::Undefined,
            Bson::ObjectId(_) => ElementType::ObjectId,
            Bson::Bool(_) => ElementType::Bool,
            Bson::DateTime(_) => ElementType::DateTime,
            Bson::Null => ElementType::Null,
            Bson::Regex { .. } => ElementType::Regex,
            Bson::DbPointer { .. } => ElementType::DbPointer,
            Bson::Code(_) => ElementType::Code,
            Bson::Symbol(_) => ElementType::Symbol,
            Bson::CodeWithScope { .. } => ElementType::CodeWithScope,
            Bson::Int32(_) => ElementType::Int32,
            Bson::Timestamp(_) => ElementType::Timestamp,
            Bson::Int64(_) => ElementType::Int64,
            Bson::Decimal128(_) => ElementType::Decimal128,
            Bson::MinKey => ElementType::MinKey,
            Bson::MaxKey => ElementType::MaxKey,
        }
    }

    /// Returns `true` if the value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Bson::Null)
    }

    /// If the value is a string, returns it.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Bson::Str(s) => Some(s),
            _ => None,
        }
    }

    /// If the value is a double, returns it.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Bson::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// If the value is an embedded document, returns it.
    #[must_use]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Bson::SubDocument(doc) => Some(doc),
            _ => None,
        }
    }

    /// If the value is an embedded array, returns its underlying document.
    #[must_use]
    pub fn as_array(&self) -> Option<&Document> {
        match self {
            Bson::SubArray(doc) => Some(doc),
            _ => None,
        }
    }
}

impl fmt::Display for Bson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bson::Double(v) => write!(f, "{}", v),
            Bson::Str(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Bson::SubDocument(doc) => {
                write!(f, "{{")?;
                for (i, (k, v)) in doc.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Bson::SubArray(doc) => write!(
                f,
                "[{}]",
                doc.values()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Bson::Binary { subtype, bytes } => {
                write!(f, "Binary(0x{:02x}, {})", subtype, hex::encode(bytes))
            }
            Bson::Undefined => write!(f, "undefined"),
            Bson::ObjectId(oid) => write!(f, "ObjectId(\"{}\")", oid),
            Bson::Bool(b) => write!(f, "{}", b),
            Bson::DateTime(n) => match Utc.timestamp_millis_opt(*n).single() {
                Some(dt) => write!(f, "DateTime(\"{}\")", dt.to_rfc3339()),
                None => write!(f, "DateTime({})", n),
            },
            Bson::Null => write!(f, "null"),
            Bson::Regex { pattern, options } => write!(f, "/{}/{}", pattern, options),
            Bson::DbPointer { namespace, id } => write!(f, "DBPointer({}, {})", namespace, id),
            Bson::Code(code) => write!(f, "Code({})", code),
            Bson::Symbol(s) => write!(f, "Symbol({})", s),
            Bson::CodeWithScope { code, .. } => write!(f, "CodeWithScope({})", code),
            Bson::Int32(v) => write!(f, "{}", v),
            Bson::Timestamp(ts) => write!(f, "Timestamp({}, {})", ts.time, ts.increment),
            Bson::Int64(v) => write!(f, "NumberLong({})", v),
            Bson::Decimal128(bytes) => write!(f, "Decimal128({})", hex::encode(bytes)),
            Bson::MinKey => write!(f, "MinKey"),
            Bson::MaxKey => write!(f, "MaxKey"),
        }
    }
}

#[derive(Serialize)]
struct BinaryBody<'a> {
    #[serde(rename = "subType")]
    subtype: String,
    hex: &'a str,
}

#[derive(Serialize)]
struct RegexBody<'a> {
    pattern: &'a str,
    options: &'a str,
}

#[derive(Serialize)]
struct TimestampBody {
    t: u32,
    i: u32,
}

/// Relaxed extended-JSON view, for logging and inspection.
impl Serialize for Bson {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        fn tagged<S: Serializer, V: Serialize + ?Sized>(
            serializer: S,
            tag: &str,
            value: &V,
        ) -> std::result::Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry(tag, value)?;
            map.end()
        }

        match self {
            Bson::Double(v) if v.is_finite() => serializer.serialize_f64(*v),
            Bson::Double(v) => {
                let text = if v.is_nan() {
                    "NaN"
                } else if *v > 0.0 {
                    "Infinity"
                } else {
                    "-Infinity"
                };
                tagged(serializer, "$numberDouble", text)
            }
            Bson::Str(s) => serializer.serialize_str(s),
            Bson::SubDocument(doc) => doc.serialize(serializer),
            Bson::SubArray(doc) => serializer.collect_seq(doc.values()),
            Bson::Binary { subtype, bytes } => {
                let encoded = hex::encode(bytes);
                let body = BinaryBody {
                    subtype: format!("{:02x}", subtype),
                    hex: &encoded,
                };
                tagged(serializer, "$binary", &body)
            }
            Bson::Undefined => tagged(serializer, "$undefined", &true),
            Bson::ObjectId(oid) => tagged(serializer, "$oid", &oid.to_hex()),
            Bson::Bool(b) => serializer.serialize_bool(*b),
            Bson::DateTime(n) => tagged(serializer, "$date", n),
            Bson::Null => serializer.serialize_unit(),
            Bson::Regex { pattern, options } => {
                tagged(serializer, "$regularExpression", &RegexBody { pattern, options })
            }
            Bson::DbPointer { namespace, id } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("$ref", namespace)?;
                map.serialize_entry("$id", &id.to_hex())?;
                map.end()
            }
            Bson::Code(code) => tagged(serializer, "$code", code),
            Bson::Symbol(s) => tagged(serializer, "$symbol", s),
            Bson::CodeWithScope { code, scope } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("$code", code)?;
                map.serialize_entry("$scope", scope)?;
                map.end()
            }
            Bson::Int32(v) => serializer.serialize_i32(*v),
            Bson::Timestamp(ts) => tagged(
                serializer,
                "$timestamp",
                &TimestampBody {
                    t: ts.time,
                    i: ts.increment,
                },
            ),
            Bson::Int64(v) => serializer.serialize_i64(*v),
            Bson::Decimal128(bytes) => tagged(serializer, "$numberDecimalBytes", &hex::encode(bytes)),
            Bson::MinKey => tagged(serializer, "$minKey", &1),
            Bson::MaxKey => tagged(serializer, "$maxKey", &1),
        }
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

impl From<f64> for Bson {
    fn from(value: f64) -> Self {
        Bson::Double(value)
    }
}

impl From<i32> for Bson {
    fn from(value: i32) -> Self {
        Bson::Int32(value)
    }
}

impl From<i64> for Bson {
    fn from(value: i64) -> Self {
        Bson::Int64(value)
    }
}

impl From<bool> for Bson {
    fn from(value: bool) -> Self {
        Bson::Bool(value)
    }
}

impl From<&str> for Bson {
    fn from(value: &str) -> Self {
        Bson::Str(value.to_string())
    }
}

impl From<String> for Bson {
    fn from(value: String) -> Self {
        Bson::Str(value)
    }
}

impl From<ObjectId> for Bson {
    fn from(value: ObjectId) -> Self {
        Bson::ObjectId(value)
    }
}

impl From<Document> for Bson {
    fn from(value: Document) -> Self {
        Bson::SubDocument(value)
    }
}

impl From<Vec<Bson>> for Bson {
    fn from(value: Vec<Bson>) -> Self {
        Bson::array(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_key_is_strict() {
        assert!(is_index_key("0", 0));
        assert!(is_index_key("10", 10));
        assert!(!is_index_key("01", 1));
        assert!(!is_index_key("", 0));
        assert!(!is_index_key("+1", 1));
        assert!(!is_index_key("1", 0));
    }

    #[test]
    fn test_replaced_key_keeps_position() {
        let mut doc = Document::new();
        doc.insert("a", Bson::from(1));
        doc.insert("b", Bson::from(2));
        assert_eq!(doc.insert("a", Bson::from(3)), Some(Bson::Int32(1)));
        let keys: Vec<_> = doc.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(doc.get("a"), Some(&Bson::Int32(3)));
    }

    #[test]
    fn test_object_id_hex_roundtrip() {
        let bytes = [0x50, 0x7f, 0x1f, 0x77, 0xbc, 0xf8, 0x6c, 0xd7, 0x99, 0x43, 0x90, 0x11];
        let oid = ObjectId::from_bytes(bytes);
        assert_eq!(oid.to_hex(), "507f1f77bcf86cd799439011");
        assert_eq!(ObjectId::parse_str("507F1F77BCF86CD799439011").unwrap(), oid);
        assert!(ObjectId::parse_str("507f1f77bcf86cd79943901z").is_err());
        assert!(ObjectId::is_valid_hex("507f1f77bcf86cd799439011"));
        assert!(!ObjectId::is_valid_hex("507f1f77bcf86cd79943901"));
        assert!(!ObjectId::is_valid_hex("507F1F77BCF86CD799439011"));
    }

    #[test]
    fn test_extended_json_view() {
        let mut doc = Document::new();
        doc.insert("_id", Bson::ObjectId("507f1f77bcf86cd799439011".parse().unwrap()));
        doc.insert("n", Bson::Int32(3));
        doc.insert("xs", Bson::array(vec![Bson::Double(1.5), Bson::Null]));
        doc.insert("when", Bson::DateTime(1_000));
        doc.insert("blob", Bson::binary(vec![0xde, 0xad]));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "_id": {"$oid": "507f1f77bcf86cd799439011"},
                "n": 3,
                "xs": [1.5, null],
                "when": {"$date": 1000},
                "blob": {"$binary": {"subType": "00", "hex": "dead"}}
            })
        );
    }

    #[test]
    fn test_display() {
        let value = Bson::array(vec![Bson::from(1), Bson::from("a")]);
        assert_eq!(value.to_string(), "[1, \"a\"]");
        assert_eq!(Bson::DateTime(0).to_string(), "DateTime(\"1970-01-01T00:00:00+00:00\")");
    }
}
