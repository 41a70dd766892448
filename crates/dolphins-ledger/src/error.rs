use std::io;

/// Errors from ledger accessor operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Keys must be non-empty.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// A key read by the transaction was changed by another commit.
    #[error("read conflict on {key}: read version {read}, committed version {current}")]
    Conflict { key: String, read: u64, current: u64 },

    /// The history cursor was used after it was closed.
    #[error("history cursor is closed")]
    CursorClosed,

    #[error("ledger lock poisoned")]
    LockPoisoned,

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the journal file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure reported by an external ledger backend.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
