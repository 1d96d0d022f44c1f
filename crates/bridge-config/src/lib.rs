//! Config store adapter (C1, §4.1) — a thin read/write interface over a
//! single persisted record.

mod error;
mod model;
mod store;

pub use error::ConfigError;
pub use model::{ConfigPatch, ConfigRecord, ConfigSnapshot, Timing};
pub use store::{ConfigStore, SqliteConfigStore};
