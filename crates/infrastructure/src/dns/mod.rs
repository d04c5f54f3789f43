pub mod cache;
pub mod category;
pub mod codec;
pub mod geoip;
pub mod outbound;
pub mod transport;
pub mod upstream;
