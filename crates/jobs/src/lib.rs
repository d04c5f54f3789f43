pub mod cache_sweep;
pub mod category_refresh;
pub mod geodb_refresh;
pub mod runner;
mod schedule;

pub use cache_sweep::CacheSweepJob;
pub use category_refresh::CategoryRefreshJob;
pub use geodb_refresh::GeoDbRefreshJob;
pub use runner::JobRunner;
