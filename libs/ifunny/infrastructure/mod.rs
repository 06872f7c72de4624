//! Infrastructure Layer
//!
//! Token persistence and process-level setup.

pub mod cache;
pub mod logging;

pub use cache::{token_key, CacheError, TokenCache, LOGIN_TOKEN_KEY};
pub use logging::{init_tracing, init_tracing_with_level};
