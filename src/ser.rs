//! Encoding native values into BSON documents.
//!
//! This module provides the [`Encoder`], a depth-first walk of a
//! [`NativeValue`] tree that produces a [`Document`].
//!
//! ## Overview
//!
//! - **Shape splitting**: arrays with more than one non-trivial extent are
//!   split along their last axis first, so a matrix is written as an array
//!   of its rows
//! - **Scalar collapse**: a size-1 array is written as a bare scalar and a
//!   size-0 array as null
//! - **Query mode**: a container of `key, value` pairs is written as named
//!   fields instead of a positional array
//! - **Object ids**: the `id_` text field of a top-level record is written as
//!   an ObjectId under `_id`
//!
//! ## Usage
//!
//! Most users should use the functions in the crate root:
//!
//! ```rust
//! use ndbson::{to_document, Bson, NativeValue, Record};
//!
//! let mut rec = Record::new();
//! rec.insert("gain", NativeValue::from(vec![0.5]));
//! rec.insert("taps", NativeValue::from(vec![1i32, 2]));
//!
//! let doc = to_document(&NativeValue::Record(rec)).unwrap();
//! assert_eq!(doc.get("gain"), Some(&Bson::Double(0.5)));
//! assert_eq!(doc.get("taps"), Some(&Bson::array([Bson::Int32(1), Bson::Int32(2)])));
//! ```
//!
//! ## Direct Encoder Usage
//!
//! ```rust
//! use ndbson::ser::Encoder;
//! use ndbson::{Bson, CodecOptions, NativeValue};
//!
//! let options = CodecOptions::query();
//! let mut encoder = Encoder::new(&options);
//!
//! let predicate = NativeValue::from(vec![
//!     NativeValue::from("$gt"),
//!     NativeValue::from(5.0),
//!     NativeValue::from("$lt"),
//!     NativeValue::from(10.0),
//! ]);
//! let doc = encoder.encode(&predicate).unwrap();
//! assert_eq!(doc.get("$gt"), Some(&Bson::Double(5.0)));
//! assert_eq!(doc.get("$lt"), Some(&Bson::Double(10.0)));
//! ```

use crate::document::{Bson, Document, ObjectId};
use crate::sanitize::ID_KEY;
use crate::shape;
use crate::value::{ArrayData, CellArray, NativeValue, NdArray, Record, RecordArray, Scalar};
use crate::{CodecOptions, Error, Result};
use std::fmt::Write as _;

enum Segment {
    Field(String),
    Index(usize),
}

/// The BSON encoder.
///
/// Holds the options and the path of the value being encoded, which is
/// reported in [`Error::Encode`].
pub struct Encoder<'o> {
    options: &'o CodecOptions,
    path: Vec<Segment>,
}

impl<'o> Encoder<'o> {
    pub fn new(options: &'o CodecOptions) -> Self {
        Encoder {
            options,
            path: Vec::new(),
        }
    }

    /// Encodes a value as a top-level document.
    ///
    /// Records become the document itself. Arrays and containers put their
    /// elements under the keys `"0"`, `"1"`, ...; any other value is stored
    /// under `"0"`. An empty value becomes an empty document.
    pub fn encode(&mut self, value: &NativeValue) -> Result<Document> {
        self.path.clear();
        match value {
            NativeValue::Record(record) => self.encode_top_record(record),
            NativeValue::RecordArray(records) if records.len() == 1 => {
                self.encode_top_record(&records.records()[0])
            }
            NativeValue::Container(cells) if self.is_pair_list(cells) => self.encode_pairs(cells),
            _ if value.is_empty() => Ok(Document::new()),
            _ => match self.encode_value(value)? {
                Bson::SubArray(doc) | Bson::SubDocument(doc) => Ok(doc),
                other => Ok(Document::from_array([other])),
            },
        }
    }

    fn render_path(&self) -> String {
        let mut rendered = String::from("$");
        for segment in &self.path {
            // Writing to a String cannot fail.
            let _ = match segment {
                Segment::Field(name) => write!(rendered, ".{}", name.escape_debug()),
                Segment::Index(i) => write!(rendered, "[{}]", i),
            };
        }
        rendered
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::encode(self.render_path(), reason)
    }

    fn nested<T>(
        &mut self,
        segment: Segment,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.path.len() >= self.options.max_depth {
            return Err(self.error(format!(
                "nesting exceeds the depth limit of {}",
                self.options.max_depth
            )));
        }
        self.path.push(segment);
        let result = f(self);
        self.path.pop();
        result
    }

    fn encode_top_record(&mut self, record: &Record) -> Result<Document> {
        let mut doc = Document::with_capacity(record.len());
        for (name, value) in record {
            match value {
                NativeValue::Text(text)
                    if *name == self.options.id_field && ObjectId::is_valid_hex(text) =>
                {
                    let oid = ObjectId::parse_str(text).map_err(|e| self.error(e.to_string()))?;
                    doc.insert(ID_KEY, Bson::ObjectId(oid));
                }
                _ => {
                    let bson = self.encode_field(name, value)?;
                    doc.insert(name.as_str(), bson);
                }
            }
        }
        Ok(doc)
    }

    /// Encodes one named field. BSON keys are NUL-terminated, so a name
    /// holding NUL is rejected here where the path is known.
    fn encode_field(&mut self, name: &str, value: &NativeValue) -> Result<Bson> {
        self.nested(Segment::Field(name.to_string()), |enc| {
            if name.contains('\0') {
                return Err(enc.error("field name contains a NUL byte"));
            }
            enc.encode_value(value)
        })
    }

    /// A container is a pair list in query mode when it is one-dimensional,
    /// has an even number of elements and at least one non-empty text at an
    /// even position.
    fn is_pair_list(&self, cells: &CellArray) -> bool {
        self.options.is_query()
            && !cells.is_empty()
            && !shape::is_multidimensional(cells.shape())
            && cells.len() % 2 == 0
            && cells
                .elements()
                .iter()
                .step_by(2)
                .any(|e| e.as_str().map_or(false, |s| !s.is_empty()))
    }

    fn encode_pairs(&mut self, cells: &CellArray) -> Result<Document> {
        let mut doc = Document::with_capacity(cells.len() / 2);
        for (i, pair) in cells.elements().chunks_exact(2).enumerate() {
            let key = match &pair[0] {
                NativeValue::Text(key) => key,
                other => {
                    self.path.push(Segment::Index(2 * i));
                    return Err(self.error(format!(
                        "query key must be text, found {}",
                        other.kind_name()
                    )));
                }
            };
            let value = self.encode_field(key, &pair[1])?;
            doc.insert(key.as_str(), value);
        }
        Ok(doc)
    }

    fn encode_value(&mut self, value: &NativeValue) -> Result<Bson> {
        match value {
            NativeValue::Scalar(s) => self.encode_scalar(*s),
            NativeValue::Logical(b) => Ok(Bson::Bool(*b)),
            NativeValue::Text(s) => Ok(Bson::Str(s.clone())),
            NativeValue::Binary(bytes) => Ok(Bson::binary(bytes.clone())),
            NativeValue::DateTime(secs) => self.encode_datetime(*secs),
            NativeValue::Array(array) => self.encode_array(value, array),
            NativeValue::Container(cells) => self.encode_container(value, cells),
            NativeValue::Record(record) => self.encode_record(record).map(Bson::SubDocument),
            NativeValue::RecordArray(records) => self.encode_record_array(value, records),
            NativeValue::Opaque(class) => {
                Err(self.error(format!("unsupported value of class {}", class)))
            }
        }
    }

    fn encode_scalar(&self, scalar: Scalar) -> Result<Bson> {
        Ok(match scalar {
            Scalar::Float32(v) => Bson::Double(f64::from(v)),
            Scalar::Float64(v) => Bson::Double(v),
            Scalar::Int8(v) => Bson::Int32(i32::from(v)),
            Scalar::UInt8(v) => Bson::Int32(i32::from(v)),
            Scalar::Int16(v) => Bson::Int32(i32::from(v)),
            Scalar::UInt16(v) => Bson::Int32(i32::from(v)),
            Scalar::Int32(v) => Bson::Int32(v),
            Scalar::UInt32(v) => Bson::Int64(i64::from(v)),
            Scalar::Int64(v) => Bson::Int64(v),
            Scalar::UInt64(v) => Bson::Int64(i64::try_from(v).map_err(|_| {
                self.error(format!("uint64 value {} exceeds the signed 64-bit range", v))
            })?),
        })
    }

    fn encode_datetime(&self, secs: f64) -> Result<Bson> {
        let count = (secs * self.options.date_unit.per_second()).round();
        if !count.is_finite() || count < i64::MIN as f64 || count >= i64::MAX as f64 {
            return Err(self.error(format!("datetime {} is out of range", secs)));
        }
        Ok(Bson::DateTime(count as i64))
    }

    /// Encodes each piece of a split value under its index.
    fn encode_pieces(&mut self, pieces: &CellArray) -> Result<Bson> {
        let mut doc = Document::with_capacity(pieces.len());
        for (i, piece) in pieces.elements().iter().enumerate() {
            let bson = self.nested(Segment::Index(i), |enc| enc.encode_value(piece))?;
            doc.insert(i.to_string(), bson);
        }
        Ok(Bson::SubArray(doc))
    }

    fn encode_array(&mut self, value: &NativeValue, array: &NdArray) -> Result<Bson> {
        match array.numel() {
            0 => return Ok(Bson::Null),
            1 => {
                return match array.data().element(0) {
                    Some(element) => self.encode_value(&element),
                    None => Ok(Bson::Null),
                }
            }
            _ => {}
        }
        if let Some(pieces) = shape::split(value) {
            return self.encode_pieces(&pieces);
        }
        let elements: Vec<Bson> = match array.data() {
            ArrayData::Int8(v) => return Ok(Bson::binary(v.iter().map(|&b| b as u8).collect::<Vec<_>>())),
            ArrayData::UInt8(v) => return Ok(Bson::binary(v.clone())),
            ArrayData::Float32(v) => v.iter().map(|&x| Bson::Double(f64::from(x))).collect(),
            ArrayData::Float64(v) => v.iter().map(|&x| Bson::Double(x)).collect(),
            ArrayData::Int16(v) => v.iter().map(|&x| Bson::Int32(i32::from(x))).collect(),
            ArrayData::UInt16(v) => v.iter().map(|&x| Bson::Int32(i32::from(x))).collect(),
            ArrayData::Int32(v) => v.iter().map(|&x| Bson::Int32(x)).collect(),
            ArrayData::UInt32(v) => v.iter().map(|&x| Bson::Int64(i64::from(x))).collect(),
            ArrayData::Int64(v) => v.iter().map(|&x| Bson::Int64(x)).collect(),
            ArrayData::UInt64(v) => {
                let mut out = Vec::with_capacity(v.len());
                for (i, &x) in v.iter().enumerate() {
                    out.push(self.nested(Segment::Index(i), |enc| {
                        enc.encode_scalar(Scalar::UInt64(x))
                    })?);
                }
                out
            }
            ArrayData::Logical(v) => v.iter().map(|&b| Bson::Bool(b)).collect(),
            ArrayData::DateTime(v) => {
                let mut out = Vec::with_capacity(v.len());
                for (i, &secs) in v.iter().enumerate() {
                    out.push(self.nested(Segment::Index(i), |enc| enc.encode_datetime(secs))?);
                }
                out
            }
        };
        Ok(Bson::array(elements))
    }

    fn encode_container(&mut self, value: &NativeValue, cells: &CellArray) -> Result<Bson> {
        if cells.is_empty() {
            return Ok(Bson::Null);
        }
        if let Some(pieces) = shape::split(value) {
            return self.encode_pieces(&pieces);
        }
        if self.is_pair_list(cells) {
            return self.encode_pairs(cells).map(Bson::SubDocument);
        }
        let mut doc = Document::with_capacity(cells.len());
        for (i, element) in cells.elements().iter().enumerate() {
            let bson = self.nested(Segment::Index(i), |enc| enc.encode_value(element))?;
            doc.insert(i.to_string(), bson);
        }
        Ok(Bson::SubArray(doc))
    }

    fn encode_record(&mut self, record: &Record) -> Result<Document> {
        let mut doc = Document::with_capacity(record.len());
        for (name, value) in record {
            let bson = self.encode_field(name, value)?;
            doc.insert(name.as_str(), bson);
        }
        Ok(doc)
    }

    fn encode_record_array(
        &mut self,
        value: &NativeValue,
        records: &RecordArray,
    ) -> Result<Bson> {
        match records.len() {
            0 => return Ok(Bson::Null),
            1 => return self.encode_record(&records.records()[0]).map(Bson::SubDocument),
            _ => {}
        }
        if let Some(pieces) = shape::split(value) {
            return self.encode_pieces(&pieces);
        }
        let mut doc = Document::with_capacity(records.len());
        for (i, record) in records.records().iter().enumerate() {
            let bson = self.nested(Segment::Index(i), |enc| enc.encode_record(record))?;
            doc.insert(i.to_string(), Bson::SubDocument(bson));
        }
        Ok(Bson::SubArray(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EncodeMode;

    fn encode(value: &NativeValue) -> Result<Document> {
        let options = CodecOptions::new();
        Encoder::new(&options).encode(value)
    }

    fn encode_query(value: &NativeValue) -> Result<Document> {
        let options = CodecOptions::new().with_mode(EncodeMode::Query);
        Encoder::new(&options).encode(value)
    }

    fn record(fields: Vec<(&str, NativeValue)>) -> NativeValue {
        NativeValue::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    #[test]
    fn test_scalar_kinds() {
        let doc = encode(&record(vec![
            ("f", NativeValue::from(1.5f32)),
            ("b", NativeValue::from(7u8)),
            ("s", NativeValue::from(-3i16)),
            ("u", NativeValue::from(4_000_000_000u32)),
            ("l", NativeValue::from(true)),
        ]))
        .unwrap();
        assert_eq!(doc.get("f"), Some(&Bson::Double(1.5)));
        assert_eq!(doc.get("b"), Some(&Bson::Int32(7)));
        assert_eq!(doc.get("s"), Some(&Bson::Int32(-3)));
        assert_eq!(doc.get("u"), Some(&Bson::Int64(4_000_000_000)));
        assert_eq!(doc.get("l"), Some(&Bson::Bool(true)));
    }

    #[test]
    fn test_size_collapse() {
        let doc = encode(&record(vec![
            ("one", NativeValue::from(vec![2.0])),
            ("none", NativeValue::empty()),
            ("cell", NativeValue::from(vec![NativeValue::from(2.0)])),
        ]))
        .unwrap();
        assert_eq!(doc.get("one"), Some(&Bson::Double(2.0)));
        assert_eq!(doc.get("none"), Some(&Bson::Null));
        assert_eq!(doc.get("cell"), Some(&Bson::array([Bson::Double(2.0)])));
    }

    #[test]
    fn test_matrix_written_as_rows() {
        let m = NdArray::matrix(2, 2, vec![1i32, 2, 3, 4]).unwrap();
        let doc = encode(&record(vec![("m", NativeValue::Array(m))])).unwrap();
        assert_eq!(
            doc.get("m"),
            Some(&Bson::array([
                Bson::array([Bson::Int32(1), Bson::Int32(2)]),
                Bson::array([Bson::Int32(3), Bson::Int32(4)]),
            ]))
        );
    }

    #[test]
    fn test_byte_arrays_become_binary() {
        let doc = encode(&record(vec![
            ("raw", NativeValue::from(vec![1u8, 2, 3])),
            ("signed", NativeValue::Array(NdArray::row(vec![-1i8, 1]))),
        ]))
        .unwrap();
        assert_eq!(doc.get("raw"), Some(&Bson::binary(vec![1, 2, 3])));
        assert_eq!(doc.get("signed"), Some(&Bson::binary(vec![0xff, 1])));
    }

    #[test]
    fn test_uint64_overflow_is_rejected_with_path() {
        let value = record(vec![(
            "counts",
            NativeValue::Array(NdArray::row(vec![1u64, u64::MAX])),
        )]);
        let err = encode(&value).unwrap_err();
        assert_eq!(
            err,
            Error::encode(
                "$.counts[1]",
                format!("uint64 value {} exceeds the signed 64-bit range", u64::MAX)
            )
        );
    }

    #[test]
    fn test_opaque_is_rejected() {
        let value = record(vec![(
            "items",
            NativeValue::from(vec![NativeValue::from(1.0), NativeValue::Opaque("handle".into())]),
        )]);
        let err = encode(&value).unwrap_err();
        assert!(err.is_encode());
        assert!(err.to_string().contains("$.items[1]"));
    }

    #[test]
    fn test_top_level_object_id() {
        let hex = "507f1f77bcf86cd799439011";
        let doc = encode(&record(vec![("id_", NativeValue::from(hex))])).unwrap();
        let oid = ObjectId::parse_str(hex).unwrap();
        assert_eq!(doc.get("_id"), Some(&Bson::ObjectId(oid)));
        assert!(doc.get("id_").is_none());
    }

    #[test]
    fn test_nested_id_field_stays_text() {
        let hex = "507f1f77bcf86cd799439011";
        let inner = record(vec![("id_", NativeValue::from(hex))]);
        let doc = encode(&record(vec![("ref", inner)])).unwrap();
        let nested = doc.get("ref").and_then(Bson::as_document).unwrap();
        assert_eq!(nested.get("id_"), Some(&Bson::Str(hex.to_string())));
    }

    #[test]
    fn test_query_pairs() {
        let predicate = NativeValue::from(vec![
            NativeValue::from("$gt"),
            NativeValue::from(5.0),
            NativeValue::from("$lt"),
            NativeValue::from(10.0),
        ]);
        let doc = encode_query(&record(vec![("age", predicate.clone())])).unwrap();
        let nested = doc.get("age").and_then(Bson::as_document).unwrap();
        assert_eq!(nested.keys().collect::<Vec<_>>(), vec!["$gt", "$lt"]);

        let plain = encode(&record(vec![("age", predicate)])).unwrap();
        assert!(plain.get("age").and_then(Bson::as_array).is_some());
    }

    #[test]
    fn test_query_pair_with_non_text_key() {
        let predicate = NativeValue::from(vec![
            NativeValue::from("$gt"),
            NativeValue::from(5.0),
            NativeValue::from(1.0),
            NativeValue::from(10.0),
        ]);
        let err = encode_query(&predicate).unwrap_err();
        assert_eq!(
            err,
            Error::encode("$[2]", "query key must be text, found double")
        );
    }

    #[test]
    fn test_query_matrix_splits_into_pair_rows() {
        let cells = CellArray::new(
            vec![2, 2],
            vec![
                NativeValue::from("$gt"),
                NativeValue::from("$lt"),
                NativeValue::from(5.0),
                NativeValue::from(10.0),
            ],
        )
        .unwrap();
        let doc = encode_query(&record(vec![("age", NativeValue::Container(cells))])).unwrap();
        let mut gt = Document::new();
        gt.insert("$gt", Bson::Double(5.0));
        let mut lt = Document::new();
        lt.insert("$lt", Bson::Double(10.0));
        assert_eq!(
            doc.get("age"),
            Some(&Bson::array([Bson::SubDocument(gt), Bson::SubDocument(lt)]))
        );
    }

    #[test]
    fn test_nul_in_field_name_reports_path() {
        let mut inner = Record::new();
        inner.insert("a\0b", NativeValue::from(1.0));
        let value = record(vec![
            ("ok", NativeValue::from(1.0)),
            ("nested", NativeValue::Record(inner)),
        ]);
        let err = encode(&value).unwrap_err();
        assert!(err.is_encode());
        assert_eq!(
            err,
            Error::encode("$.nested.a\\0b", "field name contains a NUL byte")
        );
    }

    #[test]
    fn test_nul_in_query_key_is_rejected() {
        let predicate = NativeValue::from(vec![NativeValue::from("$g\0t"), NativeValue::from(5.0)]);
        let err = encode_query(&record(vec![("age", predicate)])).unwrap_err();
        assert!(err.is_encode());
        assert!(err.to_string().contains("$.age."));
    }

    #[test]
    fn test_top_level_non_record() {
        let doc = encode(&NativeValue::from(vec![1.0, 2.0])).unwrap();
        assert_eq!(doc, Document::from_array([Bson::Double(1.0), Bson::Double(2.0)]));
        let doc = encode(&NativeValue::from("x")).unwrap();
        assert_eq!(doc, Document::from_array([Bson::Str("x".into())]));
        assert!(encode(&NativeValue::empty()).unwrap().is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let mut value = NativeValue::from(1.0);
        for _ in 0..5 {
            value = record(vec![("a", value)]);
        }
        let options = CodecOptions::new().with_max_depth(4);
        let err = Encoder::new(&options).encode(&value).unwrap_err();
        assert_eq!(
            err,
            Error::encode("$.a.a.a.a", "nesting exceeds the depth limit of 4")
        );
        let options = CodecOptions::new().with_max_depth(5);
        assert!(Encoder::new(&options).encode(&value).is_ok());
    }

    #[test]
    fn test_datetime_units() {
        let value = record(vec![("t", NativeValue::DateTime(1.5))]);
        assert_eq!(encode(&value).unwrap().get("t"), Some(&Bson::DateTime(1500)));
        let options = CodecOptions::new().with_date_unit(crate::DateUnit::Seconds);
        let doc = Encoder::new(&options).encode(&value).unwrap();
        assert_eq!(doc.get("t"), Some(&Bson::DateTime(2)));
    }
}
