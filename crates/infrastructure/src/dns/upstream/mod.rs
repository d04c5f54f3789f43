pub mod bootstrap;
pub mod group;
pub mod manager;

pub use bootstrap::BootstrapResolver;
pub use group::{UpstreamGroup, GROUP_TIMEOUT};
pub use manager::UpstreamManager;
