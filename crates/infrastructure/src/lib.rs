pub mod dns;
pub mod fetch;
