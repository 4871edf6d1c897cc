pub mod connection;
pub mod retry;

pub use connection::ConnectionManager;
pub use retry::{retry_with_backoff, Retryable};
