//! Record model for the Dolphins diver ledger.
//!
//! This crate provides the data types stored under each diver key and the
//! codec that turns them into the ledger's byte representation. Every other
//! Dolphins crate depends on `dolphins-types`.
//!
//! # Key Types
//!
//! - [`Diver`]: Root record, one per ledger key
//! - [`Level`]: One certification attempt owned by a diver
//! - [`LedgerTimestamp`]: Wall-clock `{seconds, nanos}` supplied by the ledger
//! - [`HistoryEntry`]: One past version (or tombstone) of a ledger key
//! - [`HistoryRecord`]: Rendered form of a history entry for callers

pub mod error;
pub mod history;
pub mod record;

pub use error::{TypeError, TypeResult};
pub use history::{encode_history, HistoryEntry, HistoryRecord, LedgerTimestamp};
pub use record::{Diver, Level, INITIAL_LEVEL_STATUS};
