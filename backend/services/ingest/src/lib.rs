//! Partner client synchronization: OAuth2 token handling, client fetching,
//! and reconciliation of partner clients into local customers.

pub mod catalog;
pub mod clock;
pub mod partner;
pub mod response;
pub mod service;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::ExternalCatalog;
pub use service::SyncService;
