use std::sync::Arc;

use dolphins_ledger::InMemoryLedger;
use dolphins_registry::{Invocation, RecordManager};

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared handler state: one ledger and one record manager.
#[derive(Clone)]
pub struct AppState {
    ledger: Arc<InMemoryLedger>,
    manager: Arc<RecordManager>,
}

impl AppState {
    pub fn new(ledger: InMemoryLedger, manager: RecordManager) -> Self {
        Self {
            ledger: Arc::new(ledger),
            manager: Arc::new(manager),
        }
    }

    /// Build the ledger described by `config`, replaying its journal if any.
    pub fn from_config(config: &ServerConfig) -> ServerResult<Self> {
        let ledger = match &config.journal_path {
            Some(path) => InMemoryLedger::open_journaled(path, config.journal.clone())?,
            None => InMemoryLedger::new(),
        };
        Ok(Self::new(ledger, RecordManager::new(config.registry.clone())))
    }

    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }

    pub fn manager(&self) -> &RecordManager {
        &self.manager
    }

    /// Run one invocation in its own transaction, committing only on success.
    pub fn execute(&self, invocation: &Invocation) -> ServerResult<String> {
        let tx = self.ledger.begin();
        let payload = self.manager.invoke_with(&tx, invocation)?;
        let receipt = tx.commit()?;
        tracing::debug!(function = %invocation.function, tx_id = %receipt.tx_id, keys_written = receipt.keys_written, "invocation executed");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dolphins_registry::RegistryError;

    use crate::error::ServerError;

    #[test]
    fn failed_invocation_commits_nothing() {
        let state = AppState::new(InMemoryLedger::new(), RecordManager::default());
        let error = state
            .execute(&Invocation::new("addLevel", ["d1", "OW", "PADI", "I"]))
            .unwrap_err();
        assert!(matches!(error, ServerError::Registry(RegistryError::NotFound(_))));
        assert_eq!(state.ledger().transaction_count().unwrap(), 0);
    }

    #[test]
    fn journaled_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            journal_path: Some(dir.path().join("ledger.journal")),
            ..ServerConfig::default()
        };

        let state = AppState::from_config(&config).unwrap();
        state
            .execute(&Invocation::new("addDiver", ["d1", "Ann", "2000-01-01", "F", "Open Water"]))
            .unwrap();
        drop(state);

        let state = AppState::from_config(&config).unwrap();
        let record = state.execute(&Invocation::new("getLevel", ["d1"])).unwrap();
        assert!(record.starts_with(r#"{"id":"d1""#));
    }
}
