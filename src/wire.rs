//! BSON binary reader and writer.
//!
//! This module turns [`Document`]s into bytes and back, bit-exact with the
//! BSON specification: little-endian length-prefixed documents, one type byte
//! and a NUL-terminated key per element, and a trailing zero byte.
//!
//! ```text
//! document := int32 e_list 0x00
//! e_list   := element e_list | ""
//! element  := type_byte cstring value
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use ndbson::wire::{read_document, write_document};
//! use ndbson::{Bson, Document};
//!
//! let mut doc = Document::new();
//! doc.insert("a", Bson::Int32(1));
//!
//! let bytes = write_document(&doc).unwrap();
//! assert_eq!(bytes, vec![0x0c, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0]);
//! assert_eq!(read_document(&bytes, 100).unwrap(), doc);
//! ```

use crate::document::{Bson, Document, ObjectId, Timestamp};
use crate::mapping::ElementType;
use crate::{Error, Result};

const MIN_DOCUMENT_LEN: usize = 5;

/// Parses one complete document and rejects trailing bytes.
pub fn read_document(input: &[u8], max_depth: usize) -> Result<Document> {
    let mut reader = Reader::new(input, max_depth);
    let doc = reader.read_document(0)?;
    if !reader.at_end() {
        return Err(Error::malformed(
            reader.position,
            "trailing bytes after the top-level document",
        ));
    }
    Ok(doc)
}

/// Serializes a document to a fresh byte vector.
pub fn write_document(doc: &Document) -> Result<Vec<u8>> {
    let mut writer = Writer::new();
    writer.write_document(doc)?;
    Ok(writer.into_inner())
}

/// The BSON reader.
///
/// Walks a byte slice with a cursor; every read is bounds-checked and reports
/// the byte offset on failure.
pub struct Reader<'a> {
    input: &'a [u8],
    position: usize,
    max_depth: usize,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a [u8], max_depth: usize) -> Self {
        Reader {
            input,
            position: 0,
            max_depth,
        }
    }

    /// Checks if we're at the end of input
    fn at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn take(&mut self, len: usize, expected: &str) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or_else(|| Error::unexpected_eof(self.position, expected))?;
        let bytes = &self.input[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self, expected: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, expected)?);
        Ok(out)
    }

    fn read_u8(&mut self, expected: &str) -> Result<u8> {
        Ok(self.read_array::<1>(expected)?[0])
    }

    fn read_i32(&mut self, expected: &str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array(expected)?))
    }

    fn read_i64(&mut self, expected: &str) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array(expected)?))
    }

    fn read_len(&mut self, expected: &str, min: usize) -> Result<usize> {
        let start = self.position;
        let len = self.read_i32(expected)?;
        usize::try_from(len)
            .ok()
            .filter(|len| *len >= min)
            .ok_or_else(|| Error::malformed(start, &format!("invalid {}: {}", expected, len)))
    }

    fn read_cstring(&mut self) -> Result<String> {
        let start = self.position;
        let rest = &self.input[start.min(self.input.len())..];
        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| Error::unexpected_eof(start, "NUL-terminated string"))?;
        let text = std::str::from_utf8(&rest[..nul])
            .map_err(|_| Error::malformed(start, "key is not valid UTF-8"))?
            .to_string();
        self.position = start + nul + 1;
        Ok(text)
    }

    fn read_string(&mut self) -> Result<String> {
        let start = self.position;
        let len = self.read_len("string length", 1)?;
        let bytes = self.take(len, "string bytes")?;
        let (body, terminator) = bytes.split_at(len - 1);
        if terminator != [0] {
            return Err(Error::malformed(start, "string is missing its terminator"));
        }
        std::str::from_utf8(body)
            .map(str::to_string)
            .map_err(|_| Error::malformed(start, "string is not valid UTF-8"))
    }

    fn read_document(&mut self, depth: usize) -> Result<Document> {
        if depth >= self.max_depth {
            return Err(Error::depth_limit(self.max_depth));
        }
        let start = self.position;
        let len = self.read_len("document length", MIN_DOCUMENT_LEN)?;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or_else(|| Error::unexpected_eof(start, "document body"))?;

        let mut doc = Document::new();
        loop {
            let tag_offset = self.position;
            if tag_offset >= end {
                return Err(Error::malformed(tag_offset, "document overruns its length"));
            }
            let tag = self.read_u8("element type")?;
            if tag == 0 {
                break;
            }
            let key = self.read_cstring()?;
            let ty = ElementType::from_tag(tag)
                .ok_or_else(|| Error::unknown_tag(tag, &key, tag_offset))?;
            let value = self.read_value(ty, depth)?;
            doc.insert(key, value);
        }

        if self.position != end {
            return Err(Error::malformed(
                start,
                &format!(
                    "declared length {} does not match {} bytes read",
                    len,
                    self.position - start
                ),
            ));
        }
        Ok(doc)
    }

    fn read_binary(&mut self) -> Result<Bson> {
        let start = self.position;
        let len = self.read_len("binary length", 0)?;
        let subtype = self.read_u8("binary subtype")?;
        let mut bytes = self.take(len, "binary bytes")?;
        if subtype == 0x02 {
            // Legacy subtype: payload repeats its own length.
            if bytes.len() < 4 {
                return Err(Error::malformed(start, "legacy binary is too short"));
            }
            let (inner, rest) = bytes.split_at(4);
            let inner_len = i32::from_le_bytes([inner[0], inner[1], inner[2], inner[3]]);
            if usize::try_from(inner_len).ok() != Some(rest.len()) {
                return Err(Error::malformed(start, "legacy binary length mismatch"));
            }
            bytes = rest;
        }
        Ok(Bson::Binary {
            subtype,
            bytes: bytes.to_vec(),
        })
    }

    fn read_value(&mut self, ty: ElementType, depth: usize) -> Result<Bson> {
        Ok(match ty {
            ElementType::Double => Bson::Double(f64::from_le_bytes(self.read_array("double")?)),
            ElementType::String => Bson::Str(self.read_string()?),
            ElementType::Document => Bson::SubDocument(self.read_document(depth + 1)?),
            ElementType::Array => Bson::SubArray(self.read_document(depth + 1)?),
            ElementType::Binary => self.read_binary()?,
            ElementType::Undefined => Bson::Undefined,
            ElementType::ObjectId => Bson::ObjectId(ObjectId::from_bytes(self.read_array("object id")?)),
            ElementType::Bool => {
                let offset = self.position;
                match self.read_u8("boolean")? {
                    0 => Bson::Bool(false),
                    1 => Bson::Bool(true),
                    other => {
                        return Err(Error::malformed(
                            offset,
                            &format!("boolean byte must be 0 or 1, got {}", other),
                        ))
                    }
                }
            }
            ElementType::DateTime => Bson::DateTime(self.read_i64("datetime")?),
            ElementType::Null => Bson::Null,
            ElementType::Regex => {
                let pattern = self.read_cstring()?;
                let options = self.read_cstring()?;
                Bson::Regex { pattern, options }
            }
            ElementType::DbPointer => {
                let namespace = self.read_string()?;
                let id = ObjectId::from_bytes(self.read_array("object id")?);
                Bson::DbPointer { namespace, id }
            }
            ElementType::Code => Bson::Code(self.read_string()?),
            ElementType::Symbol => Bson::Symbol(self.read_string()?),
            ElementType::CodeWithScope => {
                let start = self.position;
                let total = self.read_len("code with scope length", 14)?;
                let code = self.read_string()?;
                let scope = self.read_document(depth + 1)?;
                if self.position - start != total {
                    return Err(Error::malformed(start, "code with scope length mismatch"));
                }
                Bson::CodeWithScope { code, scope }
            }
            ElementType::Int32 => Bson::Int32(self.read_i32("int32")?),
            ElementType::Timestamp => {
                let raw = u64::from_le_bytes(self.read_array("timestamp")?);
                Bson::Timestamp(Timestamp {
                    increment: raw as u32,
                    time: (raw >> 32) as u32,
                })
            }
            ElementType::Int64 => Bson::Int64(self.read_i64("int64")?),
            ElementType::Decimal128 => Bson::Decimal128(self.read_array("decimal128")?),
            ElementType::MinKey => Bson::MinKey,
            ElementType::MaxKey => Bson::MaxKey,
        })
    }
}

/// The BSON writer.
///
/// Appends to an owned buffer; document lengths are back-patched once the
/// closing terminator is written.
pub struct Writer {
    output: Vec<u8>,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Writer {
            output: Vec::with_capacity(256),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.output
    }

    fn write_cstring(&mut self, s: &str) -> Result<()> {
        if s.as_bytes().contains(&0) {
            return Err(Error::encode(
                "$",
                format!(
                    "'{}' contains a NUL byte and cannot be written as a BSON key or pattern",
                    s.escape_debug()
                ),
            ));
        }
        self.output.extend_from_slice(s.as_bytes());
        self.output.push(0);
        Ok(())
    }

    fn write_len(&mut self, len: usize) -> Result<()> {
        let len = i32::try_from(len)
            .map_err(|_| Error::encode("$", format!("{} bytes exceed the BSON size limit", len)))?;
        self.output.extend_from_slice(&len.to_le_bytes());
        Ok(())
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_len(s.len() + 1)?;
        self.output.extend_from_slice(s.as_bytes());
        self.output.push(0);
        Ok(())
    }

    /// Appends one document, including its length prefix and terminator.
    pub fn write_document(&mut self, doc: &Document) -> Result<()> {
        let start = self.output.len();
        self.output.extend_from_slice(&[0; 4]);
        for (key, value) in doc {
            self.output.push(value.element_type().tag());
            self.write_cstring(key)?;
            self.write_value(value)?;
        }
        self.output.push(0);
        let len = i32::try_from(self.output.len() - start).map_err(|_| {
            Error::encode("$", "document exceeds the BSON size limit")
        })?;
        self.output[start..start + 4].copy_from_slice(&len.to_le_bytes());
        Ok(())
    }

    fn write_value(&mut self, value: &Bson) -> Result<()> {
        match value {
            Bson::Double(v) => self.output.extend_from_slice(&v.to_le_bytes()),
            Bson::Str(s) | Bson::Code(s) | Bson::Symbol(s) => self.write_string(s)?,
            Bson::SubDocument(doc) | Bson::SubArray(doc) => self.write_document(doc)?,
            Bson::Binary { subtype, bytes } => {
                if *subtype == 0x02 {
                    self.write_len(bytes.len() + 4)?;
                    self.output.push(*subtype);
                    self.write_len(bytes.len())?;
                } else {
                    self.write_len(bytes.len())?;
                    self.output.push(*subtype);
                }
                self.output.extend_from_slice(bytes);
            }
            Bson::ObjectId(oid) => self.output.extend_from_slice(&oid.bytes()),
            Bson::Bool(b) => self.output.push(u8::from(*b)),
            Bson::DateTime(v) | Bson::Int64(v) => self.output.extend_from_slice(&v.to_le_bytes()),
            Bson::Undefined | Bson::Null | Bson::MinKey | Bson::MaxKey => {}
            Bson::Regex { pattern, options } => {
                self.write_cstring(pattern)?;
                self.write_cstring(options)?;
            }
            Bson::DbPointer { namespace, id } => {
                self.write_string(namespace)?;
                self.output.extend_from_slice(&id.bytes());
            }
            Bson::CodeWithScope { code, scope } => {
                let start = self.output.len();
                self.output.extend_from_slice(&[0; 4]);
                self.write_string(code)?;
                self.write_document(scope)?;
                let len = i32::try_from(self.output.len() - start).map_err(|_| {
                    Error::encode("$", "code with scope exceeds the BSON size limit")
                })?;
                self.output[start..start + 4].copy_from_slice(&len.to_le_bytes());
            }
            Bson::Int32(v) => self.output.extend_from_slice(&v.to_le_bytes()),
            Bson::Timestamp(ts) => {
                let raw = (u64::from(ts.time) << 32) | u64::from(ts.increment);
                self.output.extend_from_slice(&raw.to_le_bytes());
            }
            Bson::Decimal128(bytes) => self.output.extend_from_slice(bytes),
        }
        Ok(())
    }
}
