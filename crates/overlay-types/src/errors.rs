//! # Error Types
//!
//! Errors raised while decoding the shared value types.

use thiserror::Error;

/// Errors that can occur while parsing transaction evidence or identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Input ended before the structure was complete.
    #[error("Unexpected end of data: needed {needed} more bytes at offset {offset}")]
    UnexpectedEof { offset: usize, needed: usize },

    /// Bytes remained after a complete transaction was decoded.
    #[error("Trailing data: {remaining} bytes after transaction")]
    TrailingData { remaining: usize },

    /// A varint used a wider encoding than its value needs.
    #[error("Non-canonical varint at offset {offset}")]
    NonCanonicalVarint { offset: usize },

    /// A declared length does not fit in memory on this platform.
    #[error("Length overflow at offset {offset}")]
    LengthOverflow { offset: usize },

    /// Hex string could not be decoded.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// A 32-byte identifier had the wrong length.
    #[error("Invalid txid length: expected 32 bytes, got {0}")]
    InvalidTxIdLength(usize),

    /// Outpoint string was not `<txid>.<vout>`.
    #[error("Invalid outpoint: {0}")]
    InvalidOutpoint(String),
}
