//! Chatvault DB Library
//!
//! Metadata store for conversation attachments: the [`FileRecordStore`] trait,
//! its Postgres implementation and an in-memory implementation.

pub mod db;

pub use db::{setup_database, FileRecordRepository, FileRecordRow, FileRecordStore, MemoryFileRecordStore};
