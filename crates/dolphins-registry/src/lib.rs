//! Record manager for the Dolphins diver ledger.
//!
//! A stateless set of operations over diver records, each keyed by diver id
//! and stored whole in an injected [`StateStore`]. History lookups replay an
//! injected [`HistoryReader`].
//!
//! # Operations
//!
//! | name               | arguments                                 |
//! |--------------------|-------------------------------------------|
//! | `addDiver`         | id, name, birth date, gender, diver type  |
//! | `addLevel`         | id, level name, organization, institution |
//! | `addCourse`        | id, level name, course id                 |
//! | `addTestResult`    | id, level name, status                    |
//! | `getLevel`         | id                                        |
//! | `getHistoryForKey` | id (extra arguments ignored)              |
//!
//! Course and status updates only ever touch the most recent level. When its
//! name does not match, the default [`LevelMatch::Lenient`] mode rewrites the
//! record unchanged; [`LevelMatch::Strict`] fails instead.
//!
//! [`StateStore`]: dolphins_ledger::StateStore
//! [`HistoryReader`]: dolphins_ledger::HistoryReader

pub mod config;
pub mod dispatch;
pub mod error;
pub mod manager;

pub use config::{LevelMatch, RegistryConfig};
pub use dispatch::{Arity, Invocation, Operation};
pub use error::{RegistryError, RegistryResult};
pub use manager::{DiverProfile, RecordManager};
