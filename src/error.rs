//! Crate error type

use thiserror::Error;

/// Errors returned when reading or writing records
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying read or write failure
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The stream ended in the middle of a varint
    #[error("truncated varint")]
    TruncatedVarint,
    /// A varint did not fit in 64 bits
    #[error("varint overflow")]
    VarintOverflow,
    /// A record payload ended early or held an out-of-range value
    #[error("malformed record payload")]
    MalformedPayload,
    /// An unrecognized record tag
    #[error("unknown record tag {0:#04x}")]
    UnknownTag(u8),
}
