use dolphins_types::HistoryEntry;

use crate::error::LedgerResult;

/// Key-value state accessor.
///
/// Implementations must satisfy these invariants:
/// - `get_state` returns `Ok(None)` for keys that were never written or were
///   deleted.
/// - A successful `put_state` or `delete_state` is visible to later reads
///   through the same accessor.
/// - All backend errors are propagated, never silently ignored.
pub trait StateStore: Send + Sync {
    /// Read the current value stored under `key`.
    fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put_state(&self, key: &str, value: &[u8]) -> LedgerResult<()>;

    /// Remove `key`. The history index records a tombstone.
    fn delete_state(&self, key: &str) -> LedgerResult<()>;
}

/// Append-only, per-key history index.
pub trait HistoryReader: Send + Sync {
    /// Open a cursor over every committed version of `key`, oldest first.
    ///
    /// An unknown key yields an empty cursor, not an error.
    fn history_for_key(&self, key: &str) -> LedgerResult<Box<dyn HistoryCursor + '_>>;
}

/// Cursor over the history of a single key.
///
/// Callers must call [`close`](HistoryCursor::close) once they are done,
/// whether iteration finished or failed. Closing twice is a no-op.
pub trait HistoryCursor: Send {
    /// Next entry, `None` when exhausted.
    fn next_entry(&mut self) -> Option<LedgerResult<HistoryEntry>>;

    /// Release the cursor.
    fn close(&mut self) -> LedgerResult<()>;
}
