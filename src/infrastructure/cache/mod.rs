mod memory_store;
mod redis_store;
mod service;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
pub use service::{CacheError, CacheResult, RedirectCache, VisitBuffer, VisitDelta};
