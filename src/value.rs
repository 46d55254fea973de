//! Native value model.
//!
//! This module provides [`NativeValue`], the dynamically-typed value a
//! numerical host works with: typed scalars, N-dimensional numeric, logical
//! and date arrays, text, binary blobs, heterogeneous containers, records and
//! record arrays.
//!
//! ## Storage order
//!
//! Array elements are stored first-axis-fastest (column-major), the way the
//! host lays them out: element `(i, j)` of an `r x c` matrix lives at
//! `i + j * r`, and the last axis is the outermost. Shapes always have at
//! least two extents; trailing singleton extents past the second are dropped.
//!
//! ## Creating Values
//!
//! ```rust
//! use ndbson::{NativeValue, NdArray, Record};
//!
//! let gain = NativeValue::from(1.5);
//! let name = NativeValue::from("sensor");
//! let taps = NativeValue::from(vec![1i32, 2, 3]);
//!
//! // A 2 x 3 matrix given row by row
//! let m = NdArray::matrix(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//! assert_eq!(m.shape(), &[2, 3]);
//!
//! let mut rec = Record::new();
//! rec.insert("gain", gain);
//! rec.insert("name", name);
//! rec.insert("taps", taps);
//! rec.insert("weights", NativeValue::Array(m));
//! assert_eq!(rec.len(), 4);
//! ```

use crate::shape;
use crate::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use std::fmt;

/// Serial day number of 1970-01-01 in the host's day count (days since year 0).
pub const UNIX_EPOCH_DATENUM: f64 = 719_529.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Converts the host's serial day number to seconds since the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use ndbson::value::{datenum_to_unix_seconds, UNIX_EPOCH_DATENUM};
///
/// assert_eq!(datenum_to_unix_seconds(UNIX_EPOCH_DATENUM + 1.0), 86_400.0);
/// ```
#[must_use]
pub fn datenum_to_unix_seconds(datenum: f64) -> f64 {
    (datenum - UNIX_EPOCH_DATENUM) * SECONDS_PER_DAY
}

/// Converts seconds since the Unix epoch to the host's serial day number.
#[must_use]
pub fn unix_seconds_to_datenum(seconds: f64) -> f64 {
    seconds / SECONDS_PER_DAY + UNIX_EPOCH_DATENUM
}

/// Numeric element kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Float32,
    Float64,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NumericKind::Float32 => "single",
            NumericKind::Float64 => "double",
            NumericKind::Int8 => "int8",
            NumericKind::UInt8 => "uint8",
            NumericKind::Int16 => "int16",
            NumericKind::UInt16 => "uint16",
            NumericKind::Int32 => "int32",
            NumericKind::UInt32 => "uint32",
            NumericKind::Int64 => "int64",
            NumericKind::UInt64 => "uint64",
        };
        f.write_str(name)
    }
}

/// A single typed number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Float32(f32),
    Float64(f64),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
}

impl Scalar {
    /// Returns the numeric kind of this scalar.
    #[must_use]
    pub const fn kind(&self) -> NumericKind {
        match self {
            Scalar::Float32(_) => NumericKind::Float32,
            Scalar::Float64(_) => NumericKind::Float64,
            Scalar::Int8(_) => NumericKind::Int8,
            Scalar::UInt8(_) => NumericKind::UInt8,
            Scalar::Int16(_) => NumericKind::Int16,
            Scalar::UInt16(_) => NumericKind::UInt16,
            Scalar::Int32(_) => NumericKind::Int32,
            Scalar::UInt32(_) => NumericKind::UInt32,
            Scalar::Int64(_) => NumericKind::Int64,
            Scalar::UInt64(_) => NumericKind::UInt64,
        }
    }

    /// Converts to `f64`, rounding wide integers to the nearest double.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::Float32(v) => f64::from(v),
            Scalar::Float64(v) => v,
            Scalar::Int8(v) => f64::from(v),
            Scalar::UInt8(v) => f64::from(v),
            Scalar::Int16(v) => f64::from(v),
            Scalar::UInt16(v) => f64::from(v),
            Scalar::Int32(v) => f64::from(v),
            Scalar::UInt32(v) => f64::from(v),
            Scalar::Int64(v) => v as f64,
            Scalar::UInt64(v) => v as f64,
        }
    }

    fn to_array_data(self) -> ArrayData {
        match self {
            Scalar::Float32(v) => ArrayData::Float32(vec![v]),
            Scalar::Float64(v) => ArrayData::Float64(vec![v]),
            Scalar::Int8(v) => ArrayData::Int8(vec![v]),
            Scalar::UInt8(v) => ArrayData::UInt8(vec![v]),
            Scalar::Int16(v) => ArrayData::Int16(vec![v]),
            Scalar::UInt16(v) => ArrayData::UInt16(vec![v]),
            Scalar::Int32(v) => ArrayData::Int32(vec![v]),
            Scalar::UInt32(v) => ArrayData::UInt32(vec![v]),
            Scalar::Int64(v) => ArrayData::Int64(vec![v]),
            Scalar::UInt64(v) => ArrayData::UInt64(vec![v]),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Float32(v) => write!(f, "{}", v),
            Scalar::Float64(v) => write!(f, "{}", v),
            Scalar::Int8(v) => write!(f, "{}", v),
            Scalar::UInt8(v) => write!(f, "{}", v),
            Scalar::Int16(v) => write!(f, "{}", v),
            Scalar::UInt16(v) => write!(f, "{}", v),
            Scalar::Int32(v) => write!(f, "{}", v),
            Scalar::UInt32(v) => write!(f, "{}", v),
            Scalar::Int64(v) => write!(f, "{}", v),
            Scalar::UInt64(v) => write!(f, "{}", v),
        }
    }
}

/// Element kind of a homogeneous array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    Numeric(NumericKind),
    Logical,
    DateTime,
}

/// Flat element storage of a homogeneous array.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int8(Vec<i8>),
    UInt8(Vec<u8>),
    Int16(Vec<i16>),
    UInt16(Vec<u16>),
    Int32(Vec<i32>),
    UInt32(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Logical(Vec<bool>),
    /// Seconds since the Unix epoch.
    DateTime(Vec<f64>),
}

macro_rules! map_data {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::Float32($v) => ArrayData::Float32($body),
            ArrayData::Float64($v) => ArrayData::Float64($body),
            ArrayData::Int8($v) => ArrayData::Int8($body),
            ArrayData::UInt8($v) => ArrayData::UInt8($body),
            ArrayData::Int16($v) => ArrayData::Int16($body),
            ArrayData::UInt16($v) => ArrayData::UInt16($body),
            ArrayData::Int32($v) => ArrayData::Int32($body),
            ArrayData::UInt32($v) => ArrayData::UInt32($body),
            ArrayData::Int64($v) => ArrayData::Int64($body),
            ArrayData::UInt64($v) => ArrayData::UInt64($body),
            ArrayData::Logical($v) => ArrayData::Logical($body),
            ArrayData::DateTime($v) => ArrayData::DateTime($body),
        }
    };
}

macro_rules! with_data {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::Float32($v) => $body,
            ArrayData::Float64($v) => $body,
            ArrayData::Int8($v) => $body,
            ArrayData::UInt8($v) => $body,
            ArrayData::Int16($v) => $body,
            ArrayData::UInt16($v) => $body,
            ArrayData::Int32($v) => $body,
            ArrayData::UInt32($v) => $body,
            ArrayData::Int64($v) => $body,
            ArrayData::UInt64($v) => $body,
            ArrayData::Logical($v) => $body,
            ArrayData::DateTime($v) => $body,
        }
    };
}

impl ArrayData {
    /// Returns the element kind.
    #[must_use]
    pub const fn kind(&self) -> ArrayKind {
        match self {
            ArrayData::Float32(_) => ArrayKind::Numeric(NumericKind::Float32),
            ArrayData::Float64(_) => ArrayKind::Numeric(NumericKind::Float64),
            ArrayData::Int8(_) => ArrayKind::Numeric(NumericKind::Int8),
            ArrayData::UInt8(_) => ArrayKind::Numeric(NumericKind::UInt8),
            ArrayData::Int16(_) => ArrayKind::Numeric(NumericKind::Int16),
            ArrayData::UInt16(_) => ArrayKind::Numeric(NumericKind::UInt16),
            ArrayData::Int32(_) => ArrayKind::Numeric(NumericKind::Int32),
            ArrayData::UInt32(_) => ArrayKind::Numeric(NumericKind::UInt32),
            ArrayData::Int64(_) => ArrayKind::Numeric(NumericKind::Int64),
            ArrayData::UInt64(_) => ArrayKind::Numeric(NumericKind::UInt64),
            ArrayData::Logical(_) => ArrayKind::Logical,
            ArrayData::DateTime(_) => ArrayKind::DateTime,
        }
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        with_data!(self, v => v.len())
    }

    /// Returns `true` if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Picks elements by flat index, in the given order.
    ///
    /// Callers guarantee every index is in bounds.
    pub(crate) fn gather(&self, indices: &[usize]) -> ArrayData {
        map_data!(self, v => indices.iter().map(|&i| v[i]).collect())
    }

    /// Returns the element at flat index `i` as a scalar value.
    #[must_use]
    pub fn element(&self, i: usize) -> Option<NativeValue> {
        Some(match self {
            ArrayData::Float32(v) => NativeValue::Scalar(Scalar::Float32(*v.get(i)?)),
            ArrayData::Float64(v) => NativeValue::Scalar(Scalar::Float64(*v.get(i)?)),
            ArrayData::Int8(v) => NativeValue::Scalar(Scalar::Int8(*v.get(i)?)),
            ArrayData::UInt8(v) => NativeValue::Scalar(Scalar::UInt8(*v.get(i)?)),
            ArrayData::Int16(v) => NativeValue::Scalar(Scalar::Int16(*v.get(i)?)),
            ArrayData::UInt16(v) => NativeValue::Scalar(Scalar::UInt16(*v.get(i)?)),
            ArrayData::Int32(v) => NativeValue::Scalar(Scalar::Int32(*v.get(i)?)),
            ArrayData::UInt32(v) => NativeValue::Scalar(Scalar::UInt32(*v.get(i)?)),
            ArrayData::Int64(v) => NativeValue::Scalar(Scalar::Int64(*v.get(i)?)),
            ArrayData::UInt64(v) => NativeValue::Scalar(Scalar::UInt64(*v.get(i)?)),
            ArrayData::Logical(v) => NativeValue::Logical(*v.get(i)?),
            ArrayData::DateTime(v) => NativeValue::DateTime(*v.get(i)?),
        })
    }

    /// Appends `other` if it has the same kind; returns `false` otherwise.
    pub(crate) fn extend_from(&mut self, other: &ArrayData) -> bool {
        match (self, other) {
            (ArrayData::Float32(a), ArrayData::Float32(b)) => a.extend_from_slice(b),
            (ArrayData::Float64(a), ArrayData::Float64(b)) => a.extend_from_slice(b),
            (ArrayData::Int8(a), ArrayData::Int8(b)) => a.extend_from_slice(b),
            (ArrayData::UInt8(a), ArrayData::UInt8(b)) => a.extend_from_slice(b),
            (ArrayData::Int16(a), ArrayData::Int16(b)) => a.extend_from_slice(b),
            (ArrayData::UInt16(a), ArrayData::UInt16(b)) => a.extend_from_slice(b),
            (ArrayData::Int32(a), ArrayData::Int32(b)) => a.extend_from_slice(b),
            (ArrayData::UInt32(a), ArrayData::UInt32(b)) => a.extend_from_slice(b),
            (ArrayData::Int64(a), ArrayData::Int64(b)) => a.extend_from_slice(b),
            (ArrayData::UInt64(a), ArrayData::UInt64(b)) => a.extend_from_slice(b),
            (ArrayData::Logical(a), ArrayData::Logical(b)) => a.extend_from_slice(b),
            (ArrayData::DateTime(a), ArrayData::DateTime(b)) => a.extend_from_slice(b),
            _ => return false,
        }
        true
    }
}

macro_rules! array_data_from_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for ArrayData {
                fn from(value: Vec<$ty>) -> Self {
                    ArrayData::$variant(value)
                }
            }
        )*
    };
}

array_data_from_vec! {
    f32 => Float32,
    f64 => Float64,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    bool => Logical,
}

/// A homogeneous N-dimensional array.
#[derive(Clone, Debug, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: ArrayData,
}

impl NdArray {
    /// Creates an array from a shape and column-major data.
    ///
    /// # Errors
    ///
    /// Returns an error if the element count does not match the shape.
    pub fn new(shape: Vec<usize>, data: impl Into<ArrayData>) -> Result<Self> {
        let shape = shape::normalize(shape);
        let data = data.into();
        let expected = shape::numel(&shape);
        if expected != data.len() {
            return Err(Error::custom(format!(
                "shape {:?} holds {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(NdArray { shape, data })
    }

    /// Creates a `1 x n` row vector.
    pub fn row(data: impl Into<ArrayData>) -> Self {
        let data = data.into();
        NdArray {
            shape: vec![1, data.len()],
            data,
        }
    }

    /// Creates a `rows x cols` matrix from row-major data.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndbson::{NativeValue, NdArray};
    ///
    /// let m = NdArray::matrix(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    /// assert_eq!(m.get(&[0, 1]), Some(NativeValue::from(2.0)));
    /// assert_eq!(m.get(&[1, 0]), Some(NativeValue::from(3.0)));
    /// ```
    pub fn matrix(rows: usize, cols: usize, row_major: impl Into<ArrayData>) -> Result<Self> {
        let data = row_major.into();
        if data.len() != rows * cols {
            return Err(Error::custom(format!(
                "{} x {} matrix needs {} elements, got {}",
                rows,
                cols,
                rows * cols,
                data.len()
            )));
        }
        let order: Vec<usize> = (0..cols)
            .flat_map(|j| (0..rows).map(move |i| i * cols + j))
            .collect();
        NdArray::new(vec![rows, cols], data.gather(&order))
    }

    /// Creates the empty `0 x 0` double array used for BSON null.
    #[must_use]
    pub fn empty() -> Self {
        NdArray {
            shape: vec![0, 0],
            data: ArrayData::Float64(Vec::new()),
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    #[must_use]
    pub fn kind(&self) -> ArrayKind {
        self.data.kind()
    }

    #[must_use]
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Returns the element at a multi-dimensional index.
    #[must_use]
    pub fn get(&self, index: &[usize]) -> Option<NativeValue> {
        self.data.element(shape::linear_index(&self.shape, index)?)
    }

    pub fn into_parts(self) -> (Vec<usize>, ArrayData) {
        (self.shape, self.data)
    }
}

/// A heterogeneous N-dimensional container of native values.
#[derive(Clone, Debug, PartialEq)]
pub struct CellArray {
    shape: Vec<usize>,
    elements: Vec<NativeValue>,
}

impl CellArray {
    /// Creates a container from a shape and column-major elements.
    pub fn new(shape: Vec<usize>, elements: Vec<NativeValue>) -> Result<Self> {
        let shape = shape::normalize(shape);
        let expected = shape::numel(&shape);
        if expected != elements.len() {
            return Err(Error::custom(format!(
                "shape {:?} holds {} elements, got {}",
                shape,
                expected,
                elements.len()
            )));
        }
        Ok(CellArray { shape, elements })
    }

    /// Creates a `1 x n` container.
    #[must_use]
    pub fn row(elements: Vec<NativeValue>) -> Self {
        CellArray {
            shape: vec![1, elements.len()],
            elements,
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn elements(&self) -> &[NativeValue] {
        &self.elements
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the element at a multi-dimensional index.
    #[must_use]
    pub fn get(&self, index: &[usize]) -> Option<&NativeValue> {
        self.elements.get(shape::linear_index(&self.shape, index)?)
    }

    pub(crate) fn gather(&self, indices: &[usize]) -> Vec<NativeValue> {
        indices.iter().map(|&i| self.elements[i].clone()).collect()
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<NativeValue>) {
        (self.shape, self.elements)
    }
}

/// A single struct instance: ordered field names mapped to values.
///
/// # Examples
///
/// ```rust
/// use ndbson::{NativeValue, Record};
///
/// let mut rec = Record::new();
/// rec.insert("b", NativeValue::from(1.0));
/// rec.insert("a", NativeValue::from(2.0));
///
/// let fields: Vec<_> = rec.keys().cloned().collect();
/// assert_eq!(fields, vec!["b", "a"]);
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Record(IndexMap<String, NativeValue>);

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Record(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Record(IndexMap::with_capacity(capacity))
    }

    /// Inserts a field, returning the previous value for the name.
    pub fn insert(&mut self, name: impl Into<String>, value: NativeValue) -> Option<NativeValue> {
        self.0.insert(name.into(), value)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&NativeValue> {
        self.0.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if the field names are exactly `fields`, in order.
    #[must_use]
    pub fn has_fields(&self, fields: &[String]) -> bool {
        self.len() == fields.len() && self.keys().eq(fields.iter())
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, NativeValue> {
        self.0.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, String, NativeValue> {
        self.0.values()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, NativeValue> {
        self.0.iter()
    }
}

impl IntoIterator for Record {
    type Item = (String, NativeValue);
    type IntoIter = indexmap::map::IntoIter<String, NativeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a NativeValue);
    type IntoIter = indexmap::map::Iter<'a, String, NativeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, NativeValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, NativeValue)>>(iter: T) -> Self {
        Record(IndexMap::from_iter(iter))
    }
}

/// An N-dimensional array of records that all share one ordered field list.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordArray {
    shape: Vec<usize>,
    fields: Vec<String>,
    records: Vec<Record>,
}

impl RecordArray {
    /// Creates a record array from a shape, its field list and column-major records.
    ///
    /// # Errors
    ///
    /// Returns an error if the record count does not match the shape or any
    /// record's field names differ from `fields`.
    pub fn new(shape: Vec<usize>, fields: Vec<String>, records: Vec<Record>) -> Result<Self> {
        let shape = shape::normalize(shape);
        let expected = shape::numel(&shape);
        if expected != records.len() {
            return Err(Error::custom(format!(
                "shape {:?} holds {} records, got {}",
                shape,
                expected,
                records.len()
            )));
        }
        if let Some(pos) = records
            .iter()
            .position(|r| !r.has_fields(&fields))
        {
            return Err(Error::custom(format!(
                "record {} does not have the fields {:?}",
                pos, fields
            )));
        }
        Ok(RecordArray {
            shape,
            fields,
            records,
        })
    }

    /// Creates a `1 x n` record array, taking the field list from the first record.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndbson::{NativeValue, Record, RecordArray};
    ///
    /// let rec = |x: f64| -> Record {
    ///     [("x".to_string(), NativeValue::from(x))].into_iter().collect()
    /// };
    /// let arr = RecordArray::from_records(vec![rec(1.0), rec(2.0)]).unwrap();
    /// assert_eq!(arr.shape(), &[1, 2]);
    /// assert_eq!(arr.fields(), &["x".to_string()]);
    /// ```
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let fields = records
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        RecordArray::new(vec![1, records.len()], fields, records)
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the record at a multi-dimensional index.
    #[must_use]
    pub fn get(&self, index: &[usize]) -> Option<&Record> {
        self.records.get(shape::linear_index(&self.shape, index)?)
    }

    pub(crate) fn gather(&self, indices: &[usize]) -> Vec<Record> {
        indices.iter().map(|&i| self.records[i].clone()).collect()
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<String>, Vec<Record>) {
        (self.shape, self.fields, self.records)
    }
}

/// A dynamically-typed native value.
///
/// # Examples
///
/// ```rust
/// use ndbson::{NativeValue, Scalar};
///
/// let v = NativeValue::from(3i32);
/// assert_eq!(v, NativeValue::Scalar(Scalar::Int32(3)));
/// assert!(v.is_scalar());
/// assert!(NativeValue::empty().is_empty());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum NativeValue {
    Scalar(Scalar),
    Logical(bool),
    Text(String),
    Binary(Vec<u8>),
    /// Seconds since the Unix epoch.
    DateTime(f64),
    Array(NdArray),
    Container(CellArray),
    Record(Record),
    RecordArray(RecordArray),
    /// A host object the codec cannot represent, identified by its class name.
    Opaque(String),
}

impl NativeValue {
    /// The empty array that BSON null decodes to.
    #[must_use]
    pub fn empty() -> Self {
        NativeValue::Array(NdArray::empty())
    }

    /// Creates a datetime from a `chrono` timestamp.
    #[must_use]
    pub fn from_chrono(dt: DateTime<Utc>) -> Self {
        NativeValue::DateTime(dt.timestamp_millis() as f64 / 1000.0)
    }

    /// Creates a datetime from the host's serial day number.
    #[must_use]
    pub fn from_datenum(datenum: f64) -> Self {
        NativeValue::DateTime(datenum_to_unix_seconds(datenum))
    }

    /// Returns the element count: 1 for scalars, text and binary blobs.
    #[must_use]
    pub fn numel(&self) -> usize {
        match self {
            NativeValue::Array(a) => a.numel(),
            NativeValue::Container(c) => c.len(),
            NativeValue::RecordArray(r) => r.len(),
            _ => 1,
        }
    }

    /// Returns `true` for arrays, containers and record arrays with no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(
            self,
            NativeValue::Array(_) | NativeValue::Container(_) | NativeValue::RecordArray(_)
        ) && self.numel() == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, NativeValue::Scalar(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, NativeValue::Text(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_record(&self) -> bool {
        matches!(self, NativeValue::Record(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, NativeValue::Container(_))
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            NativeValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar().map(Scalar::as_f64)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            NativeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            NativeValue::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_container(&self) -> Option<&CellArray> {
        match self {
            NativeValue::Container(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            NativeValue::Record(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record_array(&self) -> Option<&RecordArray> {
        match self {
            NativeValue::RecordArray(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the datetime as a `chrono` timestamp, at millisecond precision.
    #[must_use]
    pub fn as_chrono(&self) -> Option<DateTime<Utc>> {
        match self {
            NativeValue::DateTime(secs) => Utc
                .timestamp_millis_opt((secs * 1000.0).round() as i64)
                .single(),
            _ => None,
        }
    }

    /// Returns a short human-readable kind name used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> String {
        match self {
            NativeValue::Scalar(s) => s.kind().to_string(),
            NativeValue::Logical(_) => "logical".to_string(),
            NativeValue::Text(_) => "char".to_string(),
            NativeValue::Binary(_) => "binary".to_string(),
            NativeValue::DateTime(_) => "datetime".to_string(),
            NativeValue::Array(a) => match a.kind() {
                ArrayKind::Numeric(k) => format!("{} array", k),
                ArrayKind::Logical => "logical array".to_string(),
                ArrayKind::DateTime => "datetime array".to_string(),
            },
            NativeValue::Container(_) => "cell".to_string(),
            NativeValue::Record(_) => "struct".to_string(),
            NativeValue::RecordArray(_) => "struct array".to_string(),
            NativeValue::Opaque(class) => class.clone(),
        }
    }

    /// Views scalars and homogeneous arrays as shaped element data.
    ///
    /// Scalars, logicals and datetimes count as `1 x 1` arrays.
    pub(crate) fn to_array_view(&self) -> Option<(Vec<usize>, ArrayData)> {
        match self {
            NativeValue::Scalar(s) => Some((vec![1, 1], s.to_array_data())),
            NativeValue::Logical(b) => Some((vec![1, 1], ArrayData::Logical(vec![*b]))),
            NativeValue::DateTime(t) => Some((vec![1, 1], ArrayData::DateTime(vec![*t]))),
            NativeValue::Array(a) => Some((a.shape.clone(), a.data.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Scalar(s) => write!(f, "{}", s),
            NativeValue::Logical(b) => write!(f, "{}", b),
            NativeValue::Text(s) => write!(f, "'{}'", s),
            NativeValue::Binary(b) => write!(f, "<{} bytes>", b.len()),
            NativeValue::DateTime(_) => match self.as_chrono() {
                Some(dt) => write!(f, "{}", dt.to_rfc3339()),
                None => write!(f, "<invalid datetime>"),
            },
            NativeValue::Array(a) => write!(f, "[{} {}]", shape::describe(a.shape()), self.kind_name()),
            NativeValue::Container(c) => write!(f, "{{{} cell}}", shape::describe(c.shape())),
            NativeValue::Record(r) => write!(
                f,
                "struct({})",
                r.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
            NativeValue::RecordArray(r) => write!(
                f,
                "[{} struct({})]",
                shape::describe(r.shape()),
                r.fields().join(", ")
            ),
            NativeValue::Opaque(class) => write!(f, "<{}>", class),
        }
    }
}

macro_rules! native_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for NativeValue {
                fn from(value: $ty) -> Self {
                    NativeValue::Scalar(Scalar::$variant(value))
                }
            }
        )*
    };
}

native_from_scalar! {
    f32 => Float32,
    f64 => Float64,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
}

macro_rules! native_from_vec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for NativeValue {
                fn from(value: Vec<$ty>) -> Self {
                    NativeValue::Array(NdArray::row(value))
                }
            }
        )*
    };
}

native_from_vec!(f32, f64, i8, i16, u16, i32, u32, i64, u64, bool);

impl From<bool> for NativeValue {
    fn from(value: bool) -> Self {
        NativeValue::Logical(value)
    }
}

impl From<&str> for NativeValue {
    fn from(value: &str) -> Self {
        NativeValue::Text(value.to_string())
    }
}

impl From<String> for NativeValue {
    fn from(value: String) -> Self {
        NativeValue::Text(value)
    }
}

/// Byte vectors become binary blobs, the host's `uint8` arrays.
impl From<Vec<u8>> for NativeValue {
    fn from(value: Vec<u8>) -> Self {
        NativeValue::Binary(value)
    }
}

impl From<NdArray> for NativeValue {
    fn from(value: NdArray) -> Self {
        NativeValue::Array(value)
    }
}

impl From<Vec<NativeValue>> for NativeValue {
    fn from(value: Vec<NativeValue>) -> Self {
        NativeValue::Container(CellArray::row(value))
    }
}

impl From<CellArray> for NativeValue {
    fn from(value: CellArray) -> Self {
        NativeValue::Container(value)
    }
}

impl From<Record> for NativeValue {
    fn from(value: Record) -> Self {
        NativeValue::Record(value)
    }
}

impl From<RecordArray> for NativeValue {
    fn from(value: RecordArray) -> Self {
        NativeValue::RecordArray(value)
    }
}

impl From<DateTime<Utc>> for NativeValue {
    fn from(value: DateTime<Utc>) -> Self {
        NativeValue::from_chrono(value)
    }
}

impl TryFrom<NativeValue> for f64 {
    type Error = Error;

    fn try_from(value: NativeValue) -> Result<Self> {
        match value {
            NativeValue::Scalar(s) => Ok(s.as_f64()),
            other => Err(Error::custom(format!(
                "expected numeric scalar, found {}",
                other.kind_name()
            ))),
        }
    }
}

impl TryFrom<NativeValue> for String {
    type Error = Error;

    fn try_from(value: NativeValue) -> Result<Self> {
        match value {
            NativeValue::Text(s) => Ok(s),
            other => Err(Error::custom(format!(
                "expected char, found {}",
                other.kind_name()
            ))),
        }
    }
}
