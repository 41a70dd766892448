use std::sync::atomic::{AtomicUsize, Ordering};

use dolphins_types::HistoryEntry;

use crate::error::{LedgerError, LedgerResult};
use crate::traits::HistoryCursor;

/// History cursor over a snapshot taken when the cursor was opened.
///
/// Each open cursor is counted against its ledger until it is closed or
/// dropped, so leaked cursors show up in [`InMemoryLedger::open_cursors`].
///
/// [`InMemoryLedger::open_cursors`]: crate::InMemoryLedger::open_cursors
pub struct MemoryHistoryCursor<'a> {
    entries: std::vec::IntoIter<HistoryEntry>,
    open_cursors: &'a AtomicUsize,
    closed: bool,
}

impl<'a> MemoryHistoryCursor<'a> {
    pub(crate) fn new(entries: Vec<HistoryEntry>, open_cursors: &'a AtomicUsize) -> Self {
        open_cursors.fetch_add(1, Ordering::SeqCst);
        Self {
            entries: entries.into_iter(),
            open_cursors,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_cursors.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl HistoryCursor for MemoryHistoryCursor<'_> {
    fn next_entry(&mut self) -> Option<LedgerResult<HistoryEntry>> {
        if self.closed {
            return Some(Err(LedgerError::CursorClosed));
        }
        self.entries.next().map(Ok)
    }

    fn close(&mut self) -> LedgerResult<()> {
        self.release();
        Ok(())
    }
}

impl Drop for MemoryHistoryCursor<'_> {
    fn drop(&mut self) {
        if !self.closed {
            tracing::debug!("history cursor dropped without close");
        }
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dolphins_types::LedgerTimestamp;

    fn entries() -> Vec<HistoryEntry> {
        vec![
            HistoryEntry::write("tx1", b"{}".to_vec(), LedgerTimestamp::new(1, 0)),
            HistoryEntry::tombstone("tx2", LedgerTimestamp::new(2, 0)),
        ]
    }

    #[test]
    fn yields_entries_in_order_then_none() {
        let counter = AtomicUsize::new(0);
        let mut cursor = MemoryHistoryCursor::new(entries(), &counter);
        assert_eq!(cursor.next_entry().unwrap().unwrap().tx_id, "tx1");
        assert_eq!(cursor.next_entry().unwrap().unwrap().tx_id, "tx2");
        assert!(cursor.next_entry().is_none());
    }

    #[test]
    fn close_releases_once() {
        let counter = AtomicUsize::new(0);
        let mut cursor = MemoryHistoryCursor::new(entries(), &counter);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        cursor.close().unwrap();
        cursor.close().unwrap();
        assert!(cursor.is_closed());
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        drop(cursor);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn closed_cursor_reports_error() {
        let counter = AtomicUsize::new(0);
        let mut cursor = MemoryHistoryCursor::new(entries(), &counter);
        cursor.close().unwrap();
        assert!(matches!(
            cursor.next_entry(),
            Some(Err(LedgerError::CursorClosed))
        ));
    }

    #[test]
    fn drop_releases_unclosed_cursor() {
        let counter = AtomicUsize::new(0);
        {
            let _cursor = MemoryHistoryCursor::new(entries(), &counter);
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
