//! Decoding BSON documents into native values.
//!
//! This module provides the [`Decoder`]. Every document node is handled in
//! two passes: a scan over its entries decides how the node materializes,
//! then a build pass constructs the value.
//!
//! ## Scan
//!
//! The scan records whether the keys run `"0"`, `"1"`, ... `"n-1"` (an array
//! candidate) and folds the entries' [`ElementClass`]es together. Any other
//! key sequence makes the node a record.
//!
//! ## Build
//!
//! - Double, Int32, Int64 or Bool entries become a row vector of that kind
//! - String or Binary entries become a list of text or blobs
//! - a single entry of a primitive class becomes the bare scalar
//! - anything else becomes a container, which is then offered to
//!   [`shape::merge`] so rows restack into matrices and records into record
//!   arrays
//!
//! ```rust
//! use ndbson::{from_document, Bson, Document, NativeValue};
//!
//! let mut doc = Document::new();
//! doc.insert("m", Bson::array([
//!     Bson::array([Bson::Double(1.0), Bson::Double(2.0)]),
//!     Bson::array([Bson::Double(3.0), Bson::Double(4.0)]),
//! ]));
//!
//! let value = from_document(&doc).unwrap();
//! let m = value.as_record().and_then(|r| r.get("m")).and_then(NativeValue::as_array).unwrap();
//! assert_eq!(m.shape(), &[2, 2]);
//! assert_eq!(m.get(&[1, 0]), Some(NativeValue::from(3.0)));
//! ```

use crate::document::{is_index_key, Bson, Document};
use crate::mapping::ElementClass;
use crate::sanitize::sanitize_keys;
use crate::shape;
use crate::value::{ArrayData, CellArray, NativeValue, NdArray, Record, Scalar};
use crate::{CodecOptions, Error, Result};

/// Where a document node sits; only matters for empty nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Document,
    Array,
}

/// What the scan pass learned about a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Scan {
    len: usize,
    is_array: bool,
    class: ElementClass,
}

fn scan(doc: &Document) -> Scan {
    let mut class = None;
    let mut is_array = true;
    for (i, (key, value)) in doc.iter().enumerate() {
        is_array &= is_index_key(key, i);
        let next = value.element_type().element_class();
        class = Some(class.map_or(next, |c: ElementClass| c.unify(next)));
    }
    Scan {
        len: doc.len(),
        is_array,
        class: class.unwrap_or(ElementClass::Generic),
    }
}

/// The BSON decoder.
pub struct Decoder<'o> {
    options: &'o CodecOptions,
    depth: usize,
}

impl<'o> Decoder<'o> {
    pub fn new(options: &'o CodecOptions) -> Self {
        Decoder { options, depth: 0 }
    }

    /// Decodes a top-level document.
    ///
    /// A document with keys `"0"`, `"1"`, ... decodes like an embedded array,
    /// any other document as a record. An empty document is an empty record.
    pub fn decode(&mut self, doc: &Document) -> Result<NativeValue> {
        self.depth = 0;
        self.decode_node(doc, Origin::Document)
    }

    fn decode_nested(&mut self, doc: &Document, origin: Origin) -> Result<NativeValue> {
        if self.depth + 1 >= self.options.max_depth {
            return Err(Error::depth_limit(self.options.max_depth));
        }
        self.depth += 1;
        let result = self.decode_node(doc, origin);
        self.depth -= 1;
        result
    }

    fn decode_node(&mut self, doc: &Document, origin: Origin) -> Result<NativeValue> {
        let scan = scan(doc);
        if scan.len == 0 {
            return Ok(match origin {
                Origin::Array => NativeValue::Container(CellArray::row(Vec::new())),
                Origin::Document => NativeValue::Record(Record::new()),
            });
        }
        if !scan.is_array {
            return self.decode_record(doc).map(NativeValue::Record);
        }
        match scan.class {
            class if class.is_vector() => Ok(build_vector(doc, scan)),
            ElementClass::String | ElementClass::Binary if scan.len == 1 => {
                self.decode_first(doc)
            }
            ElementClass::String | ElementClass::Binary => {
                let elements = doc
                    .values()
                    .map(|v| self.decode_value(v))
                    .collect::<Result<Vec<_>>>()?;
                Ok(NativeValue::Container(CellArray::row(elements)))
            }
            _ => {
                let elements = doc
                    .values()
                    .map(|v| self.decode_value(v))
                    .collect::<Result<Vec<_>>>()?;
                Ok(shape::merge(CellArray::row(elements)))
            }
        }
    }

    fn decode_first(&mut self, doc: &Document) -> Result<NativeValue> {
        match doc.values().next() {
            Some(value) => self.decode_value(value),
            None => Ok(NativeValue::empty()),
        }
    }

    fn decode_record(&mut self, doc: &Document) -> Result<Record> {
        let names = sanitize_keys(
            doc.keys().map(String::as_str),
            &self.options.id_field,
            self.options.max_identifier_len,
        )?;
        let mut record = Record::with_capacity(doc.len());
        for (name, value) in names.into_iter().zip(doc.values()) {
            let decoded = self.decode_value(value)?;
            record.insert(name, decoded);
        }
        Ok(record)
    }

    /// Decodes a single value; embedded documents recurse through the scan.
    pub fn decode_value(&mut self, value: &Bson) -> Result<NativeValue> {
        Ok(match value {
            Bson::Double(v) => NativeValue::Scalar(Scalar::Float64(*v)),
            Bson::Int32(v) => NativeValue::Scalar(Scalar::Int32(*v)),
            Bson::Int64(v) => NativeValue::Scalar(Scalar::Int64(*v)),
            Bson::Bool(b) => NativeValue::Logical(*b),
            Bson::Str(s) | Bson::Symbol(s) | Bson::Code(s) => NativeValue::Text(s.clone()),
            Bson::CodeWithScope { code, .. } => NativeValue::Text(code.clone()),
            Bson::Regex { pattern, .. } => NativeValue::Text(pattern.clone()),
            Bson::ObjectId(oid) => NativeValue::Text(oid.to_hex()),
            Bson::Binary { bytes, .. } => NativeValue::Binary(bytes.clone()),
            Bson::DateTime(count) => {
                NativeValue::DateTime(*count as f64 / self.options.date_unit.per_second())
            }
            Bson::Timestamp(ts) => NativeValue::DateTime(f64::from(ts.time)),
            Bson::SubDocument(doc) => return self.decode_nested(doc, Origin::Document),
            Bson::SubArray(doc) => return self.decode_nested(doc, Origin::Array),
            Bson::Null => NativeValue::empty(),
            Bson::Undefined
            | Bson::DbPointer { .. }
            | Bson::Decimal128(_)
            | Bson::MinKey
            | Bson::MaxKey => {
                tracing::warn!(
                    element_type = %value.element_type(),
                    "unsupported element decoded as empty array"
                );
                NativeValue::empty()
            }
        })
    }
}

/// Builds a row vector from entries the scan found to share one numeric or
/// logical class. A single entry becomes the bare scalar.
fn build_vector(doc: &Document, scan: Scan) -> NativeValue {
    let data = match scan.class {
        ElementClass::Double => ArrayData::Float64(
            doc.values()
                .map(|v| match v {
                    Bson::Double(x) => *x,
                    _ => f64::NAN,
                })
                .collect(),
        ),
        ElementClass::Int32 => ArrayData::Int32(
            doc.values()
                .map(|v| match v {
                    Bson::Int32(x) => *x,
                    _ => 0,
                })
                .collect(),
        ),
        ElementClass::Int64 => ArrayData::Int64(
            doc.values()
                .map(|v| match v {
                    Bson::Int64(x) => *x,
                    _ => 0,
                })
                .collect(),
        ),
        _ => ArrayData::Logical(doc.values().map(|v| matches!(v, Bson::Bool(true))).collect()),
    };
    if scan.len == 1 {
        if let Some(scalar) = data.element(0) {
            return scalar;
        }
    }
    NativeValue::Array(NdArray::row(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ObjectId, Timestamp};
    use crate::DateUnit;

    fn decode(doc: &Document) -> Result<NativeValue> {
        let options = CodecOptions::new();
        Decoder::new(&options).decode(doc)
    }

    fn field<'a>(value: &'a NativeValue, name: &str) -> &'a NativeValue {
        value.as_record().and_then(|r| r.get(name)).unwrap()
    }

    #[test]
    fn test_scan_classifies_nodes() {
        let doubles = Document::from_array([Bson::Double(1.0), Bson::Double(2.0)]);
        assert_eq!(
            scan(&doubles),
            Scan {
                len: 2,
                is_array: true,
                class: ElementClass::Double
            }
        );
        let mixed = Document::from_array([Bson::Double(1.0), Bson::Int32(2)]);
        assert_eq!(scan(&mixed).class, ElementClass::Generic);

        let mut skipped = Document::new();
        skipped.insert("0", Bson::Double(1.0));
        skipped.insert("2", Bson::Double(1.0));
        assert!(!scan(&skipped).is_array);

        let mut padded = Document::new();
        padded.insert("00", Bson::Double(1.0));
        assert!(!scan(&padded).is_array);
    }

    #[test]
    fn test_vectors_and_scalars() {
        let mut doc = Document::new();
        doc.insert("v", Bson::array([Bson::Int32(1), Bson::Int32(2)]));
        doc.insert("s", Bson::array([Bson::Int64(7)]));
        doc.insert("b", Bson::array([Bson::Bool(true), Bson::Bool(false)]));
        let value = decode(&doc).unwrap();
        assert_eq!(field(&value, "v"), &NativeValue::from(vec![1i32, 2]));
        assert_eq!(field(&value, "s"), &NativeValue::from(7i64));
        assert_eq!(field(&value, "b"), &NativeValue::from(vec![true, false]));
    }

    #[test]
    fn test_heterogeneous_array_stays_container() {
        let mut doc = Document::new();
        doc.insert("x", Bson::array([Bson::Str("a".into()), Bson::Double(1.0)]));
        let value = decode(&doc).unwrap();
        let cells = field(&value, "x").as_container().unwrap();
        assert_eq!(cells.elements(), &[NativeValue::from("a"), NativeValue::from(1.0)]);
    }

    #[test]
    fn test_text_lists_are_not_merged() {
        let mut doc = Document::new();
        doc.insert("one", Bson::array([Bson::Str("ab".into())]));
        doc.insert("two", Bson::array([Bson::Str("ab".into()), Bson::Str("cd".into())]));
        let value = decode(&doc).unwrap();
        assert_eq!(field(&value, "one"), &NativeValue::from("ab"));
        assert_eq!(field(&value, "two").as_container().map(CellArray::len), Some(2));
    }

    #[test]
    fn test_records_merge_into_record_array() {
        let rec = |x: f64| {
            let mut d = Document::new();
            d.insert("x", Bson::Double(x));
            Bson::SubDocument(d)
        };
        let mut doc = Document::new();
        doc.insert("items", Bson::array([rec(1.0), rec(2.0), rec(3.0)]));
        let value = decode(&doc).unwrap();
        let items = field(&value, "items").as_record_array().unwrap();
        assert_eq!(items.shape(), &[1, 3]);
        assert_eq!(items.records()[2].get("x"), Some(&NativeValue::from(3.0)));
    }

    #[test]
    fn test_keys_are_sanitized() {
        let mut doc = Document::new();
        doc.insert("_id", Bson::ObjectId(ObjectId::from_bytes([0xab; 12])));
        doc.insert("first name", Bson::Str("Ada".into()));
        doc.insert("first-name", Bson::Str("Lovelace".into()));
        let value = decode(&doc).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            vec!["id_", "first_name", "first_name0"]
        );
        assert_eq!(record.get("id_"), Some(&NativeValue::from("ab".repeat(12))));
    }

    #[test]
    fn test_leaf_conversions() {
        let mut doc = Document::new();
        doc.insert("null", Bson::Null);
        doc.insert("re", Bson::Regex { pattern: "^a".into(), options: "i".into() });
        doc.insert("code", Bson::Code("f()".into()));
        doc.insert("date", Bson::DateTime(1_500));
        doc.insert("ts", Bson::Timestamp(Timestamp { time: 10, increment: 3 }));
        doc.insert("dec", Bson::Decimal128([0; 16]));
        let value = decode(&doc).unwrap();
        assert_eq!(field(&value, "null"), &NativeValue::empty());
        assert_eq!(field(&value, "re"), &NativeValue::from("^a"));
        assert_eq!(field(&value, "code"), &NativeValue::from("f()"));
        assert_eq!(field(&value, "date"), &NativeValue::DateTime(1.5));
        assert_eq!(field(&value, "ts"), &NativeValue::DateTime(10.0));
        assert_eq!(field(&value, "dec"), &NativeValue::empty());
    }

    #[test]
    fn test_seconds_date_unit() {
        let mut doc = Document::new();
        doc.insert("date", Bson::DateTime(1_500));
        let options = CodecOptions::new().with_date_unit(DateUnit::Seconds);
        let value = Decoder::new(&options).decode(&doc).unwrap();
        assert_eq!(field(&value, "date"), &NativeValue::DateTime(1_500.0));
    }

    #[test]
    fn test_empty_nodes() {
        let mut doc = Document::new();
        doc.insert("d", Bson::SubDocument(Document::new()));
        doc.insert("a", Bson::SubArray(Document::new()));
        let value = decode(&doc).unwrap();
        assert_eq!(field(&value, "d"), &NativeValue::Record(Record::new()));
        assert!(field(&value, "a").as_container().map_or(false, CellArray::is_empty));
        assert_eq!(decode(&Document::new()).unwrap(), NativeValue::Record(Record::new()));
    }

    #[test]
    fn test_top_level_array_document() {
        let doc = Document::from_array([Bson::Double(1.0), Bson::Double(2.0)]);
        assert_eq!(decode(&doc).unwrap(), NativeValue::from(vec![1.0, 2.0]));
        let doc = Document::from_array([Bson::Str("x".into())]);
        assert_eq!(decode(&doc).unwrap(), NativeValue::from("x"));
    }

    #[test]
    fn test_unresolvable_collision() {
        let mut doc = Document::new();
        doc.insert("abc", Bson::Double(1.0));
        doc.insert("abc!", Bson::Double(2.0));
        let options = CodecOptions::new().with_max_identifier_len(3);
        let err = Decoder::new(&options).decode(&doc).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_depth_limit() {
        let mut doc = Document::new();
        for _ in 0..5 {
            let mut outer = Document::new();
            outer.insert("a", Bson::SubDocument(doc));
            doc = outer;
        }
        let options = CodecOptions::new().with_max_depth(5);
        assert_eq!(Decoder::new(&options).decode(&doc).unwrap_err(), Error::depth_limit(5));
        let options = CodecOptions::new().with_max_depth(6);
        assert!(Decoder::new(&options).decode(&doc).is_ok());
    }
}
