//! Database repositories for the data access layer
//!
//! `file_record` holds the store trait and the Postgres repository, `memory` the
//! in-process store, `setup` pool creation and migrations.

pub mod file_record;
pub mod memory;
pub mod setup;

pub use file_record::{FileRecordRepository, FileRecordRow, FileRecordStore};
pub use memory::MemoryFileRecordStore;
pub use setup::setup_database;
