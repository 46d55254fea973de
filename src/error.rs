//! Error types for encoding and decoding.
//!
//! Every failure aborts the whole call: encoding and decoding are
//! whole-document operations, so there is no partial result to hand back.
//!
//! ## Error Categories
//!
//! - **Encode errors**: a native value that cannot be represented, a field name
//!   holding NUL or nesting past the depth limit, reported with the path of the
//!   offending value (`$.samples[2].gain`)
//! - **Wire errors**: malformed BSON bytes (bad lengths, truncation, unknown tags)
//! - **Decode errors**: well-formed BSON that cannot become a native value, such
//!   as field names that cannot be made unique
//! - **Limits**: input nesting deeper than
//!   [`CodecOptions::max_depth`](crate::CodecOptions), counted as a decode error
//!
//! ## Examples
//!
//! ```rust
//! use ndbson::{from_slice, Error};
//!
//! let result = from_slice(&[0x05, 0x00, 0x00]);
//! assert!(result.is_err());
//!
//! if let Err(err) = result {
//!     assert!(err.is_decode());
//!     eprintln!("decode failed: {}", err);
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur while encoding or decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// A native value could not be encoded
    #[error("Cannot encode value at {path}: {reason}")]
    Encode { path: String, reason: String },

    /// Structurally invalid BSON
    #[error("Malformed BSON at byte {offset}: {msg}")]
    Malformed { offset: usize, msg: String },

    /// Input ended in the middle of a value
    #[error("Unexpected end of input at byte {offset}: expected {expected}")]
    UnexpectedEof { offset: usize, expected: String },

    /// An element type byte outside the BSON tag set
    #[error("Unknown element type 0x{tag:02x} for key '{key}' at byte {offset}")]
    UnknownTag { tag: u8, key: String, offset: usize },

    /// Nesting exceeds the configured depth limit while reading or decoding
    #[error("Nesting depth exceeds the limit of {limit}")]
    DepthLimit { limit: usize },

    /// No collision-free field name fits the identifier budget
    #[error("Cannot derive a unique field name for key '{key}' within {limit} characters")]
    KeyCollision { key: String, limit: usize },

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates an encode error for the value at `path`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndbson::Error;
    ///
    /// let err = Error::encode("$.gain", "uint64 value exceeds the int64 range");
    /// assert!(err.to_string().contains("$.gain"));
    /// ```
    pub fn encode(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Encode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a malformed-input error at a byte offset.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndbson::Error;
    ///
    /// let err = Error::malformed(12, "string is missing its terminator");
    /// assert!(err.to_string().contains("byte 12"));
    /// ```
    pub fn malformed(offset: usize, msg: &str) -> Self {
        Error::Malformed {
            offset,
            msg: msg.to_string(),
        }
    }

    /// Creates an unexpected end-of-input error.
    pub fn unexpected_eof(offset: usize, expected: &str) -> Self {
        Error::UnexpectedEof {
            offset,
            expected: expected.to_string(),
        }
    }

    /// Creates an unknown-tag error.
    pub fn unknown_tag(tag: u8, key: &str, offset: usize) -> Self {
        Error::UnknownTag {
            tag,
            key: key.to_string(),
            offset,
        }
    }

    /// Creates a depth-limit error.
    pub fn depth_limit(limit: usize) -> Self {
        Error::DepthLimit { limit }
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for reader/writer failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Returns `true` for errors raised while turning native values into BSON.
    #[must_use]
    pub fn is_encode(&self) -> bool {
        matches!(self, Error::Encode { .. })
    }

    /// Returns `true` for errors raised while reading or interpreting BSON.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndbson::Error;
    ///
    /// assert!(Error::unexpected_eof(3, "document length").is_decode());
    /// assert!(!Error::encode("$", "unsupported").is_decode());
    /// ```
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Error::Malformed { .. }
                | Error::UnexpectedEof { .. }
                | Error::UnknownTag { .. }
                | Error::KeyCollision { .. }
                | Error::DepthLimit { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_error_message_carries_path() {
        let err = Error::encode("$.a[1]", "unsupported value");
        assert_eq!(
            err.to_string(),
            "Cannot encode value at $.a[1]: unsupported value"
        );
        assert!(err.is_encode());
    }

    #[test]
    fn test_unknown_tag_formats_hex() {
        let err = Error::unknown_tag(0x42, "field", 9);
        assert_eq!(
            err.to_string(),
            "Unknown element type 0x42 for key 'field' at byte 9"
        );
        assert!(err.is_decode());
    }

    #[test]
    fn test_depth_limit_is_decode_error() {
        let err = Error::depth_limit(4);
        assert!(!err.is_encode());
        assert!(err.is_decode());
        assert!(err.to_string().contains('4'));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(msg) if msg.contains("short read")));
    }
}
