//! Data models for conversation file attachments.

mod file;

pub use file::*;
