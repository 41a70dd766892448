use dolphins_ledger::{HistoryCursor, HistoryReader, LedgerError, StateStore};
use dolphins_types::{encode_history, Diver, HistoryEntry, HistoryRecord, Level, TypeError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{LevelMatch, RegistryConfig};
use crate::error::{RegistryError, RegistryResult};

/// Descriptive fields supplied when a diver is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiverProfile {
    pub id: String,
    pub name: String,
    #[serde(rename = "bdate")]
    pub birth_date: String,
    pub gender: String,
    #[serde(rename = "btype")]
    pub diver_type: String,
}

impl DiverProfile {
    pub fn into_record(self) -> Diver {
        Diver::new(self.id, self.name, self.birth_date, self.gender, self.diver_type)
    }
}

/// Operations over diver records.
///
/// The manager holds no state besides its configuration. Each mutation reads
/// the whole record, transforms it in memory, and writes the whole record
/// back under the same key. Serializing concurrent writers to one key is the
/// ledger's job.
#[derive(Clone, Debug, Default)]
pub struct RecordManager {
    config: RegistryConfig,
}

impl RecordManager {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Store a new diver with no levels and return its encoding.
    ///
    /// Replaces any record already stored under the id unless
    /// `allow_overwrite` is off.
    pub fn create_diver<S>(&self, store: &S, profile: DiverProfile) -> RegistryResult<String>
    where
        S: StateStore + ?Sized,
    {
        let id = profile.id.clone();
        if !self.config.allow_overwrite && read(store, &id)?.is_some() {
            return Err(RegistryError::AlreadyExists(id));
        }

        let diver = profile.into_record();
        let encoded = write(store, &id, &diver)?;
        debug!(id = %id, "diver created");
        Ok(encoded)
    }

    /// Append a level in `Incourse` status with no courses.
    pub fn add_level<S>(
        &self,
        store: &S,
        id: &str,
        level_name: &str,
        organization: &str,
        institution_id: &str,
    ) -> RegistryResult<String>
    where
        S: StateStore + ?Sized,
    {
        let mut diver = load(store, id)?;
        diver.push_level(Level::new(level_name, organization, institution_id));
        let encoded = write(store, id, &diver)?;
        debug!(id, level = level_name, levels = diver.levels.len(), "level added");
        Ok(encoded)
    }

    /// Append `course_id` to the current level if it is named `level_name`.
    pub fn add_course<S>(
        &self,
        store: &S,
        id: &str,
        level_name: &str,
        course_id: &str,
    ) -> RegistryResult<String>
    where
        S: StateStore + ?Sized,
    {
        self.update_current_level(store, id, level_name, |level| {
            level.courses.push(course_id.to_string());
        })
    }

    /// Set the status of the current level if it is named `level_name`.
    pub fn add_test_result<S>(
        &self,
        store: &S,
        id: &str,
        level_name: &str,
        status: &str,
    ) -> RegistryResult<String>
    where
        S: StateStore + ?Sized,
    {
        self.update_current_level(store, id, level_name, |level| {
            level.status = status.to_string();
        })
    }

    /// Return the record exactly as stored.
    pub fn get_level<S>(&self, store: &S, id: &str) -> RegistryResult<String>
    where
        S: StateStore + ?Sized,
    {
        let bytes = read(store, id)?.ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        String::from_utf8(bytes).map_err(|e| codec(id, TypeError::Decode(e.to_string())))
    }

    /// Every past version of the record as a JSON array, oldest first.
    pub fn get_history<H>(&self, history: &H, id: &str) -> RegistryResult<String>
    where
        H: HistoryReader + ?Sized,
    {
        let records = self.history_records(history, id)?;
        encode_history(&records).map_err(|source| codec(id, source))
    }

    /// Drain the history cursor for `id` into rendered records.
    ///
    /// The cursor is released on every path. Any cursor failure discards the
    /// entries gathered so far.
    pub fn history_records<H>(&self, history: &H, id: &str) -> RegistryResult<Vec<HistoryRecord>>
    where
        H: HistoryReader + ?Sized,
    {
        let cursor = history
            .history_for_key(id)
            .map_err(|source| history_error(id, source))?;
        let mut cursor = CursorGuard::new(cursor, id);

        let mut records = Vec::new();
        while let Some(entry) = cursor.next_entry() {
            let entry: HistoryEntry = entry.map_err(|source| history_error(id, source))?;
            records.push(HistoryRecord::from_entry(&entry).map_err(|source| codec(id, source))?);
        }
        cursor.close()?;

        debug!(id, entries = records.len(), "history replayed");
        Ok(records)
    }

    fn update_current_level<S, F>(
        &self,
        store: &S,
        id: &str,
        level_name: &str,
        apply: F,
    ) -> RegistryResult<String>
    where
        S: StateStore + ?Sized,
        F: FnOnce(&mut Level),
    {
        let mut diver = load(store, id)?;
        let level = diver
            .last_level_mut()
            .ok_or_else(|| RegistryError::InvalidState {
                id: id.to_string(),
                reason: "diver has no levels".into(),
            })?;

        if level.level_name == level_name {
            apply(level);
        } else {
            match self.config.level_match {
                LevelMatch::Lenient => {
                    debug!(id, current = %level.level_name, requested = level_name, "level name mismatch; record rewritten unchanged");
                }
                LevelMatch::Strict => {
                    return Err(RegistryError::LevelMismatch {
                        id: id.to_string(),
                        current: level.level_name.clone(),
                        requested: level_name.to_string(),
                    });
                }
            }
        }

        write(store, id, &diver)
    }
}

/// Releases a history cursor when dropped unless it was closed explicitly.
struct CursorGuard<'a> {
    cursor: Box<dyn HistoryCursor + 'a>,
    key: &'a str,
    closed: bool,
}

impl<'a> CursorGuard<'a> {
    fn new(cursor: Box<dyn HistoryCursor + 'a>, key: &'a str) -> Self {
        Self {
            cursor,
            key,
            closed: false,
        }
    }

    fn next_entry(&mut self) -> Option<Result<HistoryEntry, LedgerError>> {
        self.cursor.next_entry()
    }

    fn close(&mut self) -> RegistryResult<()> {
        self.closed = true;
        self.cursor
            .close()
            .map_err(|source| history_error(self.key, source))
    }
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.cursor.close() {
                warn!(key = self.key, error = %e, "failed to release history cursor");
            }
        }
    }
}

fn read<S: StateStore + ?Sized>(store: &S, key: &str) -> RegistryResult<Option<Vec<u8>>> {
    store.get_state(key).map_err(|source| RegistryError::StoreRead {
        key: key.to_string(),
        source,
    })
}

fn load<S: StateStore + ?Sized>(store: &S, id: &str) -> RegistryResult<Diver> {
    let bytes = read(store, id)?.ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
    Diver::decode(&bytes).map_err(|source| codec(id, source))
}

fn write<S: StateStore + ?Sized>(store: &S, key: &str, diver: &Diver) -> RegistryResult<String> {
    let encoded = diver.to_json().map_err(|source| codec(key, source))?;
    store
        .put_state(key, encoded.as_bytes())
        .map_err(|source| RegistryError::StoreWrite {
            key: key.to_string(),
            source,
        })?;
    Ok(encoded)
}

fn codec(key: &str, source: TypeError) -> RegistryError {
    RegistryError::Codec {
        key: key.to_string(),
        source,
    }
}

fn history_error(key: &str, source: LedgerError) -> RegistryError {
    RegistryError::HistoryRead {
        key: key.to_string(),
        source,
    }
}
