mod error;
mod service;

pub use error::LifecycleError;
pub use service::{FileLifecycleManager, LifecycleSettings};
