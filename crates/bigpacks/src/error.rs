//! Error types for packing and unpacking.

use thiserror::Error;

/// Errors that can occur while packing or unpacking values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PackError {
    /// Integer does not fit in a signed 64-bit word pair.
    #[error("integer number too big: needs {bits} bits, max 64")]
    IntegerTooBig {
        /// Number of significant bits the value needs.
        bits: u32,
    },

    /// Content length exceeds the 28-bit length field.
    #[error("{kind} too long: {words} words (max 0x0FFFFFFF)")]
    TooLong {
        /// Kind of value being packed.
        kind: &'static str,
        /// Content length in 4-byte words.
        words: usize,
    },

    /// Declared length runs past the end of the buffer.
    #[error("truncated pack at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        /// Byte offset of the offending header.
        offset: usize,
        /// Bytes the header claims (header included).
        needed: usize,
        /// Bytes actually left.
        available: usize,
    },

    /// Numeric content length other than one or two words.
    #[error("invalid {kind} length: {words} words")]
    InvalidLength {
        /// Kind of value being unpacked.
        kind: &'static str,
        /// Declared content length in words.
        words: u32,
    },

    /// Header carries a type tag outside the known set.
    #[error("unknown type tag 0x{tag:X} at offset {offset}")]
    UnknownType {
        /// Byte offset of the header.
        offset: usize,
        /// Top nibble of the header word.
        tag: u8,
    },

    /// Map content ended after a key.
    #[error("map key without value at offset {offset}")]
    DanglingKey {
        /// Byte offset where the missing value should start.
        offset: usize,
    },
}

impl PackError {
    /// Whether this error was raised while encoding (as opposed to decoding).
    pub fn is_encoding(&self) -> bool {
        matches!(self, PackError::IntegerTooBig { .. } | PackError::TooLong { .. })
    }
}

/// Result type alias for pack operations.
pub type PackResult<T> = Result<T, PackError>;
