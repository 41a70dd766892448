use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use dolphins_types::LedgerTimestamp;
use tracing::debug;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::journal::{JournalRecord, KeyWrite};
use crate::memory::InMemoryLedger;
use crate::traits::{HistoryCursor, HistoryReader, StateStore};

/// Outcome of a successful commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReceipt {
    pub tx_id: String,
    pub timestamp: LedgerTimestamp,
    pub keys_written: usize,
}

/// A unit of work against an [`InMemoryLedger`].
///
/// Writes are buffered and visible to this transaction's own reads. The
/// version of every key read from committed state is remembered; `commit`
/// fails with [`LedgerError::Conflict`] if any of them moved in the meantime.
/// Dropping the transaction discards it.
pub struct LedgerTransaction<'a> {
    ledger: &'a InMemoryLedger,
    tx_id: String,
    timestamp: LedgerTimestamp,
    state: Mutex<TxState>,
}

#[derive(Default)]
struct TxState {
    reads: BTreeMap<String, u64>,
    writes: BTreeMap<String, Option<Vec<u8>>>,
}

impl<'a> LedgerTransaction<'a> {
    pub(crate) fn new(ledger: &'a InMemoryLedger) -> Self {
        Self {
            ledger,
            tx_id: Uuid::now_v7().simple().to_string(),
            timestamp: LedgerTimestamp::now(),
            state: Mutex::new(TxState::default()),
        }
    }

    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    pub fn timestamp(&self) -> LedgerTimestamp {
        self.timestamp
    }

    /// Number of keys this transaction would write.
    pub fn pending_writes(&self) -> LedgerResult<usize> {
        Ok(self.lock()?.writes.len())
    }

    /// Apply the buffered writes to the ledger.
    ///
    /// A transaction without writes commits trivially and records nothing.
    pub fn commit(self) -> LedgerResult<CommitReceipt> {
        let Self {
            ledger,
            tx_id,
            timestamp,
            state,
        } = self;
        let state = state.into_inner().map_err(|_| LedgerError::LockPoisoned)?;

        let writes: Vec<KeyWrite> = state
            .writes
            .into_iter()
            .map(|(key, value)| KeyWrite { key, value })
            .collect();
        let keys_written = writes.len();

        if keys_written > 0 {
            let record = JournalRecord {
                tx_id: tx_id.clone(),
                timestamp,
                writes,
            };
            ledger.commit(&record, &state.reads)?;
            debug!(tx_id = %tx_id, keys_written, "transaction committed");
        }

        Ok(CommitReceipt {
            tx_id,
            timestamp,
            keys_written,
        })
    }

    /// Discard the transaction.
    pub fn rollback(self) {
        debug!(tx_id = %self.tx_id, "transaction rolled back");
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, TxState>> {
        self.state.lock().map_err(|_| LedgerError::LockPoisoned)
    }
}

fn validate_key(key: &str) -> LedgerResult<()> {
    if key.is_empty() {
        return Err(LedgerError::InvalidKey(key.to_string()));
    }
    Ok(())
}

impl StateStore for LedgerTransaction<'_> {
    fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        let mut state = self.lock()?;
        if let Some(pending) = state.writes.get(key) {
            return Ok(pending.clone());
        }

        let (value, version) = self.ledger.read_versioned(key)?;
        state.reads.entry(key.to_string()).or_insert(version);
        Ok(value)
    }

    fn put_state(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        validate_key(key)?;
        self.lock()?.writes.insert(key.to_string(), Some(value.to_vec()));
        Ok(())
    }

    fn delete_state(&self, key: &str) -> LedgerResult<()> {
        validate_key(key)?;
        self.lock()?.writes.insert(key.to_string(), None);
        Ok(())
    }
}

impl HistoryReader for LedgerTransaction<'_> {
    fn history_for_key(&self, key: &str) -> LedgerResult<Box<dyn HistoryCursor + '_>> {
        self.ledger.history_for_key(key)
    }
}
