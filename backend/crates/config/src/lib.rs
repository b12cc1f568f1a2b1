pub mod env;
pub mod partner;
pub mod tracing_init;

pub use env::AppConfig;
pub use partner::{OrganizationEntry, PartnerConfig};
pub use tracing_init::init_tracing;
