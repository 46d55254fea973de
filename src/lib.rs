//! # ndbson
//!
//! A codec between the N-dimensional, heterogeneous value model of numerical
//! hosts and BSON documents.
//!
//! ## What does it do?
//!
//! Numerical environments work with typed scalars, N-d arrays, text, cell
//! containers and struct arrays. BSON has typed scalars and nested documents
//! but no multi-dimensional arrays; an array is just a document whose keys
//! are `"0"`, `"1"`, .... This crate maps one onto the other and back:
//!
//! - **Shape splitting**: a matrix is written as an array of its rows and an
//!   N-d array as nested arrays over its last axis; decoding stacks them back
//! - **Type inference**: every decoded array is scanned first, so uniform
//!   doubles become a numeric vector while mixed entries stay a container
//! - **Scalar collapse**: size-1 arrays are written as bare scalars and size-0
//!   arrays as null
//! - **Key sanitization**: document keys become valid, unique field names
//! - **Query mode**: `{"$gt", 5, "$lt", 10}` becomes `{ $gt: 5, $lt: 10 }`
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! ndbson = "0.1"
//! ```
//!
//! ### Round trip
//!
//! ```rust
//! use ndbson::{from_slice, to_vec, NativeValue, NdArray, Record};
//!
//! let mut rec = Record::new();
//! rec.insert("name", NativeValue::from("sensor"));
//! rec.insert("weights", NdArray::matrix(3, 4, (0..12).map(f64::from).collect::<Vec<_>>()).unwrap().into());
//! let value = NativeValue::Record(rec);
//!
//! let bytes = to_vec(&value).unwrap();
//! let back = from_slice(&bytes).unwrap();
//! assert_eq!(back, value);
//! ```
//!
//! ### Query documents
//!
//! ```rust
//! use ndbson::{encode, doc, wire, NativeValue, Record};
//!
//! let mut query = Record::new();
//! query.insert("age", NativeValue::from(vec![
//!     NativeValue::from("$gt"), NativeValue::from(5.0),
//!     NativeValue::from("$lt"), NativeValue::from(10.0),
//! ]));
//!
//! let bytes = encode(&NativeValue::Record(query), true).unwrap();
//! let expected = doc! { "age": { "$gt": 5.0, "$lt": 10.0 } };
//! assert_eq!(wire::read_document(&bytes, 100).unwrap(), expected);
//! ```
//!
//! ## Lossy corners
//!
//! - A size-1 array decodes as a scalar and a size-0 array as the empty array
//! - Column vectors decode as row vectors
//! - Byte arrays decode as binary blobs
//! - `uint64` values above `i64::MAX` are rejected when encoding
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - Declared lengths are validated before any read
//! - Nesting depth is bounded by [`CodecOptions::max_depth`]
//! - No panics in the public API; every failure is an [`Error`]

pub mod de;
pub mod document;
pub mod error;
pub mod macros;
pub mod mapping;
pub mod options;
pub mod sanitize;
pub mod ser;
pub mod shape;
pub mod value;
pub mod wire;

pub use de::Decoder;
pub use document::{Bson, Document, ObjectId, Timestamp};
pub use error::{Error, Result};
pub use mapping::{ElementClass, ElementType};
pub use options::{CodecOptions, DateUnit, EncodeMode};
pub use ser::Encoder;
pub use value::{
    ArrayData, ArrayKind, CellArray, NativeValue, NdArray, NumericKind, Record, RecordArray,
    Scalar,
};

use std::io;

/// Encode a native value into a BSON document with default options.
///
/// # Examples
///
/// ```rust
/// use ndbson::{to_document, Bson, NativeValue};
///
/// let doc = to_document(&NativeValue::from(vec![1.0, 2.0])).unwrap();
/// assert_eq!(doc.get("1"), Some(&Bson::Double(2.0)));
/// ```
///
/// # Errors
///
/// Returns an error if the value holds something BSON cannot represent.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_document(value: &NativeValue) -> Result<Document> {
    to_document_with_options(value, &CodecOptions::default())
}

/// Encode a native value into a BSON document with custom options.
///
/// # Errors
///
/// Returns an error if the value holds something BSON cannot represent or
/// nests deeper than `options.max_depth`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_document_with_options(value: &NativeValue, options: &CodecOptions) -> Result<Document> {
    tracing::debug!(kind = %value.kind_name(), mode = ?options.mode, "encoding value");
    Encoder::new(options).encode(value)
}

/// Encode a native value into BSON bytes.
///
/// # Errors
///
/// Returns an error if encoding fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec(value: &NativeValue) -> Result<Vec<u8>> {
    to_vec_with_options(value, &CodecOptions::default())
}

/// Encode a native value into BSON bytes with custom options.
///
/// # Errors
///
/// Returns an error if encoding fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_vec_with_options(value: &NativeValue, options: &CodecOptions) -> Result<Vec<u8>> {
    let doc = to_document_with_options(value, options)?;
    wire::write_document(&doc)
}

/// Encode a native value as BSON into a writer.
///
/// # Examples
///
/// ```rust
/// use ndbson::{to_writer, NativeValue};
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &NativeValue::from(1.0)).unwrap();
/// assert_eq!(buffer.len(), 16);
/// ```
///
/// # Errors
///
/// Returns an error if encoding fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W>(mut writer: W, value: &NativeValue) -> Result<()>
where
    W: io::Write,
{
    let bytes = to_vec(value)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Decode a BSON document into a native value with default options.
///
/// # Errors
///
/// Returns an error if the field names of a record cannot be made unique or
/// the document nests too deeply.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_document(doc: &Document) -> Result<NativeValue> {
    from_document_with_options(doc, &CodecOptions::default())
}

/// Decode a BSON document into a native value with custom options.
///
/// # Errors
///
/// Returns an error if decoding fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_document_with_options(doc: &Document, options: &CodecOptions) -> Result<NativeValue> {
    tracing::debug!(fields = doc.len(), "decoding document");
    Decoder::new(options).decode(doc)
}

/// Decode BSON bytes into a native value.
///
/// # Examples
///
/// ```rust
/// use ndbson::{from_slice, NativeValue};
///
/// // { "a": Int32(1) }
/// let bytes = [0x0c, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0];
/// let value = from_slice(&bytes).unwrap();
/// assert_eq!(value.as_record().and_then(|r| r.get("a")), Some(&NativeValue::from(1i32)));
/// ```
///
/// # Errors
///
/// Returns an error if the bytes are not a well-formed BSON document or the
/// document cannot be decoded.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice(bytes: &[u8]) -> Result<NativeValue> {
    from_slice_with_options(bytes, &CodecOptions::default())
}

/// Decode BSON bytes into a native value with custom options.
///
/// # Errors
///
/// Returns an error if the bytes are malformed or decoding fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice_with_options(bytes: &[u8], options: &CodecOptions) -> Result<NativeValue> {
    tracing::debug!(len = bytes.len(), "reading document");
    let doc = wire::read_document(bytes, options.max_depth)?;
    from_document_with_options(&doc, options)
}

/// Decode one BSON document from an I/O stream.
///
/// The whole stream is read; trailing bytes after the document are an error.
///
/// # Errors
///
/// Returns an error if reading fails or the bytes cannot be decoded.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R>(mut reader: R) -> Result<NativeValue>
where
    R: io::Read,
{
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    from_slice(&bytes)
}

/// Encode a native value into BSON bytes, optionally as a query document.
///
/// # Errors
///
/// Returns an error if encoding fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn encode(value: &NativeValue, query_mode: bool) -> Result<Vec<u8>> {
    let mode = if query_mode {
        EncodeMode::Query
    } else {
        EncodeMode::Plain
    };
    to_vec_with_options(value, &CodecOptions::new().with_mode(mode))
}

/// Decode BSON bytes into a native value.
///
/// # Errors
///
/// Returns an error if the bytes are malformed or decoding fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn decode(bytes: &[u8]) -> Result<NativeValue> {
    from_slice(bytes)
}
