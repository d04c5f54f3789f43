pub mod chain;
pub mod classify;
pub mod ports;
pub mod router;

pub use classify::DomainClassifier;
pub use router::QueryRouter;
