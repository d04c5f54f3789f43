pub mod memory;
pub mod redis;

pub use memory::MemoryRecordCache;
pub use redis::RedisRecordCache;
