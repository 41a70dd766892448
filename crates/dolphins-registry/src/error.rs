use dolphins_ledger::LedgerError;
use dolphins_types::TypeError;
use thiserror::Error;

use crate::dispatch::Arity;

/// Errors returned by record manager operations.
///
/// Every error is terminal for the operation that raised it.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Wrong number of arguments for the operation.
    #[error("incorrect arguments for {operation}: expecting {expected} parameters, got {actual}")]
    Argument {
        operation: &'static str,
        expected: Arity,
        actual: usize,
    },

    #[error("diver not found: {0}")]
    NotFound(String),

    /// The record is not shaped the way the operation requires.
    #[error("invalid state for diver {id}: {reason}")]
    InvalidState { id: String, reason: String },

    #[error("failed to get diver {key}: {source}")]
    StoreRead {
        key: String,
        #[source]
        source: LedgerError,
    },

    #[error("failed to store diver {key}: {source}")]
    StoreWrite {
        key: String,
        #[source]
        source: LedgerError,
    },

    #[error("failed to read history for {key}: {source}")]
    HistoryRead {
        key: String,
        #[source]
        source: LedgerError,
    },

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A stored value could not be decoded, or a record could not be encoded.
    #[error("codec error for {key}: {source}")]
    Codec {
        key: String,
        #[source]
        source: TypeError,
    },

    #[error("diver already exists: {0}")]
    AlreadyExists(String),

    /// Strict level matching rejected an update aimed at a non-current level.
    #[error("level {requested:?} is not the current level of diver {id} (current: {current:?})")]
    LevelMismatch {
        id: String,
        current: String,
        requested: String,
    },
}

/// Result alias for record manager operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

impl RegistryError {
    /// `true` for errors caused by the request rather than the ledger.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::Argument { .. }
                | Self::NotFound(_)
                | Self::InvalidState { .. }
                | Self::UnsupportedOperation(_)
                | Self::AlreadyExists(_)
                | Self::LevelMismatch { .. }
        )
    }
}
