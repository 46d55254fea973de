//! Type mapping between native values and BSON.
//!
//! This module holds the table both directions of the codec agree on, plus
//! the element classification the decoder's scan pass runs over sibling
//! entries.
//!
//! # Encoding (native → BSON)
//!
//! | Native value | BSON |
//! |--------------|------|
//! | `float32`, `float64` | Double (0x01) |
//! | `int8`, `uint8` arrays | Binary (0x05), subtype 0x00 |
//! | `int8`, `uint8` scalars, `int16`, `uint16`, `int32` | Int32 (0x10) |
//! | `uint32`, `int64` | Int64 (0x12) |
//! | `uint64` | Int64 (0x12); values above `i64::MAX` are rejected |
//! | logical | Bool (0x08) |
//! | text | String (0x02) |
//! | datetime | UTC datetime (0x09) |
//! | record | Document (0x03) |
//! | container, vector, record array | Array (0x04) |
//! | size-0 array of any kind | Null (0x0A) |
//! | size-1 array of any kind | the bare scalar |
//! | `id_` field of a top-level record holding 24 lowercase hex characters | ObjectId (0x07) under `_id` |
//!
//! # Decoding (BSON → native)
//!
//! | BSON | Native value |
//! |------|--------------|
//! | Double | `float64` scalar |
//! | Int32 | `int32` scalar |
//! | Int64 | `int64` scalar |
//! | Bool | logical |
//! | String, Symbol | text |
//! | Binary | binary |
//! | ObjectId | 24 hex character text |
//! | UTC datetime, Timestamp | datetime |
//! | Regex, Code, CodeWithScope | text of the pattern or source |
//! | Null | empty array |
//! | Undefined, DBPointer, Decimal128, MinKey, MaxKey | empty array (placeholder) |
//!
//! # Array classification
//!
//! Every document node is scanned once before it is built. When all entries
//! share one of the primitive classes below, the node becomes a vector of
//! that class; any mismatch, or any entry outside these classes, makes it a
//! generic container.
//!
//! | Element class | Built as |
//! |---------------|----------|
//! | Double | `float64` row vector |
//! | Int32 | `int32` row vector |
//! | Int64 | `int64` row vector |
//! | Bool | logical row vector |
//! | String | list of text (never merged) |
//! | Binary | list of binary |
//! | anything else | generic container, then shape merge |

use std::fmt;

/// The BSON element type tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ElementType {
    Double = 0x01,
    String = 0x02,
    Document = 0x03,
    Array = 0x04,
    Binary = 0x05,
    Undefined = 0x06,
    ObjectId = 0x07,
    Bool = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    Regex = 0x0B,
    DbPointer = 0x0C,
    Code = 0x0D,
    Symbol = 0x0E,
    CodeWithScope = 0x0F,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
    Decimal128 = 0x13,
    MinKey = 0xFF,
    MaxKey = 0x7F,
}

impl ElementType {
    /// Maps a tag byte to its element type.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0x01 => ElementType::Double,
            0x02 => ElementType::String,
            0x03 => ElementType::Document,
            0x04 => ElementType::Array,
            0x05 => ElementType::Binary,
            0x06 => ElementType::Undefined,
            0x07 => ElementType::ObjectId,
            0x08 => ElementType::Bool,
            0x09 => ElementType::DateTime,
            0x0A => ElementType::Null,
            0x0B => ElementType::Regex,
            0x0C => ElementType::DbPointer,
            0x0D => ElementType::Code,
            0x0E => ElementType::Symbol,
            0x0F => ElementType::CodeWithScope,
            0x10 => ElementType::Int32,
            0x11 => ElementType::Timestamp,
            0x12 => ElementType::Int64,
            0x13 => ElementType::Decimal128,
            0xFF => ElementType::MinKey,
            0x7F => ElementType::MaxKey,
            _ => return None,
        })
    }

    /// Returns the tag byte.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Returns the array class this type contributes to a scan.
    #[must_use]
    pub const fn element_class(self) -> ElementClass {
        match self {
            ElementType::Double => ElementClass::Double,
            ElementType::Int32 => ElementClass::Int32,
            ElementType::Int64 => ElementClass::Int64,
            ElementType::Bool => ElementClass::Bool,
            ElementType::String => ElementClass::String,
            ElementType::Binary => ElementClass::Binary,
            _ => ElementClass::Generic,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::Double => "double",
            ElementType::String => "string",
            ElementType::Document => "document",
            ElementType::Array => "array",
            ElementType::Binary => "binary",
            ElementType::Undefined => "undefined",
            ElementType::ObjectId => "objectId",
            ElementType::Bool => "bool",
            ElementType::DateTime => "date",
            ElementType::Null => "null",
            ElementType::Regex => "regex",
            ElementType::DbPointer => "dbPointer",
            ElementType::Code => "javascript",
            ElementType::Symbol => "symbol",
            ElementType::CodeWithScope => "javascriptWithScope",
            ElementType::Int32 => "int",
            ElementType::Timestamp => "timestamp",
            ElementType::Int64 => "long",
            ElementType::Decimal128 => "decimal",
            ElementType::MinKey => "minKey",
            ElementType::MaxKey => "maxKey",
        };
        f.write_str(name)
    }
}

/// The class a document node's entries unify to during the scan pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementClass {
    Double,
    Int32,
    Int64,
    Bool,
    String,
    Binary,
    Generic,
}

impl ElementClass {
    /// Folds the class of the next sibling into the running class.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndbson::mapping::ElementClass;
    ///
    /// assert_eq!(ElementClass::Double.unify(ElementClass::Double), ElementClass::Double);
    /// assert_eq!(ElementClass::Double.unify(ElementClass::Int32), ElementClass::Generic);
    /// ```
    #[must_use]
    pub fn unify(self, next: ElementClass) -> ElementClass {
        if self == next {
            self
        } else {
            ElementClass::Generic
        }
    }

    /// Returns `true` for classes built as numeric or logical vectors.
    #[must_use]
    pub const fn is_vector(self) -> bool {
        matches!(
            self,
            ElementClass::Double | ElementClass::Int32 | ElementClass::Int64 | ElementClass::Bool
        )
    }
}
