//! Configuration options for the codec.
//!
//! This module provides types to customize encoding and decoding:
//!
//! - [`CodecOptions`]: Main configuration struct
//! - [`EncodeMode`]: Plain documents or query documents
//! - [`DateUnit`]: Unit stored in the BSON UTC-datetime field
//!
//! Options derive `serde` traits so a host can keep them in its own
//! configuration file.
//!
//! ## Examples
//!
//! ```rust
//! use ndbson::{to_vec_with_options, CodecOptions, DateUnit, NativeValue};
//!
//! let value = NativeValue::from(vec![1.0, 2.0, 3.0]);
//!
//! // Build query documents
//! let options = CodecOptions::query();
//! let bytes = to_vec_with_options(&value, &options).unwrap();
//!
//! // Read legacy data whose dates were stored in seconds
//! let options = CodecOptions::new().with_date_unit(DateUnit::Seconds);
//! # let _ = (bytes, options);
//! ```

use serde::{Deserialize, Serialize};

/// How containers are written by the encoder.
///
/// In [`EncodeMode::Query`], a container that looks like a flat list of
/// `key, value` pairs (even length, at least one non-empty text at an even
/// position) is written as named fields instead of a positional array, so
/// `{"$gt", 5, "$lt", 10}` becomes `{ $gt: 5, $lt: 10 }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeMode {
    #[default]
    Plain,
    Query,
}

/// Unit of the signed 64-bit count stored in a BSON UTC-datetime (0x09).
///
/// The BSON standard counts milliseconds. Some legacy stores wrote seconds
/// into the same field; [`DateUnit::Seconds`] reads and writes those.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateUnit {
    #[default]
    Millis,
    Seconds,
}

impl DateUnit {
    /// Number of stored units per second.
    #[must_use]
    pub const fn per_second(&self) -> f64 {
        match self {
            DateUnit::Millis => 1000.0,
            DateUnit::Seconds => 1.0,
        }
    }
}

/// Configuration options for encoding and decoding.
///
/// # Examples
///
/// ```rust
/// use ndbson::{CodecOptions, EncodeMode};
///
/// let options = CodecOptions::new()
///     .with_mode(EncodeMode::Query)
///     .with_max_depth(32)
///     .with_max_identifier_len(31);
/// assert_eq!(options.max_depth, 32);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    pub mode: EncodeMode,
    pub date_unit: DateUnit,
    pub max_depth: usize,
    pub max_identifier_len: usize,
    pub id_field: String,
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            mode: EncodeMode::Plain,
            date_unit: DateUnit::Millis,
            max_depth: 100,
            max_identifier_len: 63,
            id_field: "id_".to_string(),
        }
    }
}

impl CodecOptions {
    /// Creates default options (plain mode, millisecond dates, depth 100).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndbson::CodecOptions;
    ///
    /// let options = CodecOptions::new();
    /// assert_eq!(options.max_identifier_len, 63);
    /// assert_eq!(options.id_field, "id_");
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for encoding query documents.
    #[must_use]
    pub fn query() -> Self {
        CodecOptions {
            mode: EncodeMode::Query,
            ..Default::default()
        }
    }

    /// Sets the encoding mode.
    #[must_use]
    pub fn with_mode(mut self, mode: EncodeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the unit of the BSON datetime field.
    #[must_use]
    pub fn with_date_unit(mut self, unit: DateUnit) -> Self {
        self.date_unit = unit;
        self
    }

    /// Sets the maximum nesting depth accepted by the reader, encoder and decoder.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the maximum length of a sanitized field name.
    #[must_use]
    pub fn with_max_identifier_len(mut self, len: usize) -> Self {
        self.max_identifier_len = len;
        self
    }

    /// Sets the native field name that stands for the `_id` key.
    #[must_use]
    pub fn with_id_field(mut self, name: impl Into<String>) -> Self {
        self.id_field = name.into();
        self
    }

    /// Returns `true` when containers may be written as key/value pairs.
    #[must_use]
    pub fn is_query(&self) -> bool {
        self.mode == EncodeMode::Query
    }
}
