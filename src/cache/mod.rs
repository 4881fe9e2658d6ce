//! Scandeals cache layer
//!
//! A key-value cache in front of the deal store:
//!
//! - **Default listing**: first page of the unfiltered newest-first listing,
//!   stored under `sale:list:latest:<pageSize>`.
//! - **Deal detail**: one summary per deal under `sale:id:<id>`.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//! list_ttl_seconds = 600
//! # ... see config.rs for all options
//! ```

mod backend;
mod codec;
mod config;
mod keys;
mod lock;
mod memory;
mod redis;
mod trigger;

pub use backend::{CacheBackend, CacheError};
pub use codec::{decode, encode};
pub use config::{CacheBackendKind, CacheConfig};
pub use keys::{CacheKey, LIST_KEY_PATTERN};
pub use memory::MemoryCache;
pub use redis::RedisCache;
pub use trigger::CacheTrigger;
