//! Ledger accessors for the Dolphins diver ledger.
//!
//! The record manager never owns its storage. It reads and writes through the
//! narrow [`StateStore`] and [`HistoryReader`] traits defined here, which any
//! ledger platform can implement. This crate also ships a reference backend:
//!
//! - [`InMemoryLedger`]: versioned key-value state with a per-key history index
//! - [`LedgerTransaction`]: buffered writes, read-your-writes, optimistic
//!   conflict detection on commit
//! - [`Journal`]: CRC-framed append-only file that makes the in-memory ledger
//!   durable across restarts
//!
//! # Design Rules
//!
//! 1. Every committed write (or delete) appends exactly one history entry.
//! 2. History is oldest-first and only ever shows committed transactions.
//! 3. A transaction dropped without `commit` leaves no trace.
//! 4. A commit fails if any key it read has changed since it was read.
//! 5. History cursors are released on `close` and, as a backstop, on drop.

pub mod cursor;
pub mod error;
pub mod journal;
pub mod memory;
pub mod traits;
pub mod transaction;

pub use cursor::MemoryHistoryCursor;
pub use error::{LedgerError, LedgerResult};
pub use journal::{Journal, JournalConfig, JournalRecord, KeyWrite, Recovery, SyncMode};
pub use memory::InMemoryLedger;
pub use traits::{HistoryCursor, HistoryReader, StateStore};
pub use transaction::{CommitReceipt, LedgerTransaction};
