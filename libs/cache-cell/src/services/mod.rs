pub mod cache;
pub mod keys;

pub use cache::{BoundedTtlCache, DEFAULT_MAX_SIZE};
pub use keys::{cache_key, prefixed_key, KEY_DELIMITER};
