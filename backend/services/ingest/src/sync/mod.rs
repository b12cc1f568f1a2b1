pub mod engine;
pub mod error;
pub mod mapping;
pub mod models;

pub use engine::ReconciliationEngine;
pub use error::{ClientSyncError, SyncError};
