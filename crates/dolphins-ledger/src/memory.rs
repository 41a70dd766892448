use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use dolphins_types::HistoryEntry;
use tracing::info;

use crate::cursor::MemoryHistoryCursor;
use crate::error::{LedgerError, LedgerResult};
use crate::journal::{Journal, JournalConfig, JournalRecord};
use crate::traits::{HistoryCursor, HistoryReader};
use crate::transaction::LedgerTransaction;

/// In-memory ledger for tests, local tooling, and the HTTP gateway.
///
/// State is a versioned key-value map plus a per-key history index. All
/// mutation goes through [`LedgerTransaction`]s opened with [`begin`].
/// When opened with [`open_journaled`], every commit is appended to a
/// [`Journal`] before it is applied, and the journal is replayed on open.
///
/// [`begin`]: InMemoryLedger::begin
/// [`open_journaled`]: InMemoryLedger::open_journaled
pub struct InMemoryLedger {
    inner: RwLock<LedgerState>,
    journal: Option<Journal>,
    open_cursors: AtomicUsize,
}

#[derive(Default)]
struct LedgerState {
    keys: HashMap<String, KeyState>,
    committed: u64,
}

#[derive(Default)]
struct KeyState {
    value: Option<Vec<u8>>,
    version: u64,
    history: Vec<HistoryEntry>,
}

impl LedgerState {
    fn version(&self, key: &str) -> u64 {
        self.keys.get(key).map(|k| k.version).unwrap_or(0)
    }

    fn apply(&mut self, record: &JournalRecord) {
        for write in &record.writes {
            let key_state = self.keys.entry(write.key.clone()).or_default();
            key_state.version += 1;
            key_state.value = write.value.clone();
            key_state.history.push(match &write.value {
                Some(value) => HistoryEntry::write(record.tx_id.clone(), value.clone(), record.timestamp),
                None => HistoryEntry::tombstone(record.tx_id.clone(), record.timestamp),
            });
        }
        self.committed += 1;
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerState::default()),
            journal: None,
            open_cursors: AtomicUsize::new(0),
        }
    }

    /// Open a ledger backed by the journal at `path`, replaying what it holds.
    pub fn open_journaled(path: &Path, config: JournalConfig) -> LedgerResult<Self> {
        let journal = Journal::open(path, config)?;
        let recovery = journal.recover()?;

        let mut state = LedgerState::default();
        for record in &recovery.records {
            state.apply(record);
        }
        info!(
            path = %path.display(),
            transactions = recovery.records.len(),
            discarded_bytes = recovery.discarded,
            "ledger recovered from journal"
        );

        Ok(Self {
            inner: RwLock::new(state),
            journal: Some(journal),
            open_cursors: AtomicUsize::new(0),
        })
    }

    /// Start a transaction against the current committed state.
    pub fn begin(&self) -> LedgerTransaction<'_> {
        LedgerTransaction::new(self)
    }

    pub fn journal_path(&self) -> Option<&Path> {
        self.journal.as_ref().map(Journal::path)
    }

    /// Number of history cursors handed out and not yet released.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Number of committed transactions that wrote at least one key.
    pub fn transaction_count(&self) -> LedgerResult<u64> {
        Ok(self.read_state()?.committed)
    }

    /// Keys that currently hold a value, sorted.
    pub fn keys(&self) -> LedgerResult<Vec<String>> {
        let state = self.read_state()?;
        let mut keys: Vec<String> = state
            .keys
            .iter()
            .filter(|(_, k)| k.value.is_some())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Committed value of `key`, outside any transaction.
    pub fn current(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.read_versioned(key)?.0)
    }

    /// Committed history of `key`, oldest first.
    pub fn history(&self, key: &str) -> LedgerResult<Vec<HistoryEntry>> {
        let state = self.read_state()?;
        Ok(state
            .keys
            .get(key)
            .map(|k| k.history.clone())
            .unwrap_or_default())
    }

    pub(crate) fn read_versioned(&self, key: &str) -> LedgerResult<(Option<Vec<u8>>, u64)> {
        let state = self.read_state()?;
        Ok(state
            .keys
            .get(key)
            .map(|k| (k.value.clone(), k.version))
            .unwrap_or((None, 0)))
    }

    /// Validate the read set, journal the record, then apply it.
    pub(crate) fn commit(
        &self,
        record: &JournalRecord,
        reads: &BTreeMap<String, u64>,
    ) -> LedgerResult<()> {
        let mut state = self.write_state()?;

        for (key, read) in reads {
            let current = state.version(key);
            if current != *read {
                return Err(LedgerError::Conflict {
                    key: key.clone(),
                    read: *read,
                    current,
                });
            }
        }

        if let Some(journal) = &self.journal {
            journal.append(record)?;
        }
        state.apply(record);
        Ok(())
    }

    fn read_state(&self) -> LedgerResult<RwLockReadGuard<'_, LedgerState>> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write_state(&self) -> LedgerResult<RwLockWriteGuard<'_, LedgerState>> {
        self.inner.write().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryReader for InMemoryLedger {
    fn history_for_key(&self, key: &str) -> LedgerResult<Box<dyn HistoryCursor + '_>> {
        let entries = self.history(key)?;
        Ok(Box::new(MemoryHistoryCursor::new(entries, &self.open_cursors)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::SyncMode;
    use crate::traits::StateStore;

    fn put(ledger: &InMemoryLedger, key: &str, value: &str) {
        let tx = ledger.begin();
        tx.put_state(key, value.as_bytes()).unwrap();
        tx.commit().unwrap();
    }

    fn drain(ledger: &InMemoryLedger, key: &str) -> Vec<HistoryEntry> {
        let mut cursor = ledger.history_for_key(key).unwrap();
        let mut entries = Vec::new();
        while let Some(entry) = cursor.next_entry() {
            entries.push(entry.unwrap());
        }
        cursor.close().unwrap();
        entries
    }

    #[test]
    fn committed_writes_are_visible() {
        let ledger = InMemoryLedger::new();
        put(&ledger, "d1", "one");
        assert_eq!(ledger.current("d1").unwrap(), Some(b"one".to_vec()));
        assert_eq!(ledger.transaction_count().unwrap(), 1);
        assert_eq!(ledger.keys().unwrap(), vec!["d1".to_string()]);
    }

    #[test]
    fn uncommitted_transaction_leaves_no_trace() {
        let ledger = InMemoryLedger::new();
        {
            let tx = ledger.begin();
            tx.put_state("d1", b"draft").unwrap();
        }
        assert_eq!(ledger.current("d1").unwrap(), None);
        assert!(ledger.history("d1").unwrap().is_empty());
        assert_eq!(ledger.transaction_count().unwrap(), 0);
    }

    #[test]
    fn history_is_oldest_first_with_tombstones() {
        let ledger = InMemoryLedger::new();
        put(&ledger, "d1", "v1");
        put(&ledger, "d1", "v2");
        let tx = ledger.begin();
        tx.delete_state("d1").unwrap();
        let deleted = tx.commit().unwrap();

        let entries = drain(&ledger, "d1");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].value.as_deref(), Some(&b"v1"[..]));
        assert_eq!(entries[1].value.as_deref(), Some(&b"v2"[..]));
        assert!(entries[2].is_delete);
        assert!(entries[2].value.is_none());
        assert_eq!(entries[2].tx_id, deleted.tx_id);

        assert_eq!(ledger.current("d1").unwrap(), None);
        assert!(ledger.keys().unwrap().is_empty());
        assert_eq!(ledger.open_cursors(), 0);
    }

    #[test]
    fn unknown_key_has_empty_history() {
        let ledger = InMemoryLedger::new();
        assert!(drain(&ledger, "nobody").is_empty());
    }

    #[test]
    fn concurrent_writers_conflict() {
        let ledger = InMemoryLedger::new();
        put(&ledger, "d1", "base");

        let first = ledger.begin();
        let second = ledger.begin();
        first.get_state("d1").unwrap();
        second.get_state("d1").unwrap();
        first.put_state("d1", b"first").unwrap();
        second.put_state("d1", b"second").unwrap();

        first.commit().unwrap();
        let error = second.commit().unwrap_err();
        assert!(matches!(
            error,
            LedgerError::Conflict { ref key, read: 1, current: 2 } if key == "d1"
        ));
        assert_eq!(ledger.current("d1").unwrap(), Some(b"first".to_vec()));
    }

    #[test]
    fn blind_writes_do_not_conflict() {
        let ledger = InMemoryLedger::new();
        let first = ledger.begin();
        let second = ledger.begin();
        first.put_state("d1", b"a").unwrap();
        second.put_state("d1", b"b").unwrap();
        first.commit().unwrap();
        second.commit().unwrap();
        assert_eq!(ledger.current("d1").unwrap(), Some(b"b".to_vec()));
        assert_eq!(ledger.history("d1").unwrap().len(), 2);
    }

    #[test]
    fn journal_replay_restores_state_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.journal");
        let config = JournalConfig { sync_mode: SyncMode::EveryWrite };

        {
            let ledger = InMemoryLedger::open_journaled(&path, config.clone()).unwrap();
            put(&ledger, "d1", "v1");
            put(&ledger, "d2", "w1");
            put(&ledger, "d1", "v2");
            assert_eq!(ledger.journal_path(), Some(path.as_path()));
        }

        let ledger = InMemoryLedger::open_journaled(&path, config).unwrap();
        assert_eq!(ledger.transaction_count().unwrap(), 3);
        assert_eq!(ledger.current("d1").unwrap(), Some(b"v2".to_vec()));
        assert_eq!(ledger.current("d2").unwrap(), Some(b"w1".to_vec()));
        assert_eq!(ledger.history("d1").unwrap().len(), 2);
    }

    #[test]
    fn failed_commit_is_not_journaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conflict.journal");

        {
            let ledger = InMemoryLedger::open_journaled(&path, JournalConfig::default()).unwrap();
            put(&ledger, "d1", "base");
            let stale = ledger.begin();
            stale.get_state("d1").unwrap();
            put(&ledger, "d1", "newer");
            stale.put_state("d1", b"stale").unwrap();
            assert!(stale.commit().is_err());
        }

        let ledger = InMemoryLedger::open_journaled(&path, JournalConfig::default()).unwrap();
        assert_eq!(ledger.transaction_count().unwrap(), 2);
        assert_eq!(ledger.current("d1").unwrap(), Some(b"newer".to_vec()));
    }

    #[test]
    fn commits_after_a_torn_tail_survive_the_next_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crash.journal");

        {
            let ledger = InMemoryLedger::open_journaled(&path, JournalConfig::default()).unwrap();
            put(&ledger, "d1", "a");
            put(&ledger, "d2", "b");
        }
        let len = std::fs::metadata(&path).unwrap().len();
        std::fs::OpenOptions::new().write(true).open(&path).unwrap().set_len(len - 3).unwrap();

        {
            let ledger = InMemoryLedger::open_journaled(&path, JournalConfig::default()).unwrap();
            assert!(ledger.current("d1").unwrap().is_some());
            assert!(ledger.current("d2").unwrap().is_none());
            put(&ledger, "d3", "c");
            put(&ledger, "d4", "d");
        }

        let ledger = InMemoryLedger::open_journaled(&path, JournalConfig::default()).unwrap();
        assert_eq!(ledger.keys().unwrap(), vec!["d1", "d3", "d4"]);
        assert_eq!(ledger.transaction_count().unwrap(), 3);
        assert_eq!(ledger.current("d4").unwrap(), Some(b"d".to_vec()));
    }
}
