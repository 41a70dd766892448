use thiserror::Error;

/// Errors produced while encoding or decoding records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("failed to decode record: {0}")]
    Decode(String),

    #[error("failed to encode record: {0}")]
    Encode(String),

    #[error("invalid ledger timestamp: {seconds}s {nanos}ns")]
    InvalidTimestamp { seconds: i64, nanos: i32 },
}

/// Result alias for codec operations.
pub type TypeResult<T> = Result<T, TypeError>;
